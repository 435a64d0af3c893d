use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

use super::buffer::SharedSampleBuffer;
use super::parser::parse_line;
use super::source::LineSource;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::session::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Connected,
    Disconnected,
}

/// Counters kept by the acquisition loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub lines: u64,
    pub samples: u64,
    pub parse_errors: u64,
    pub ignored: u64,
    pub idle_polls: u64,
}

/// What the acquisition thread hands back when it exits
///
/// The source is returned rather than dropped so the session can close it
/// after the thread has been joined.
pub struct AcquisitionReport {
    pub source: Box<dyn LineSource>,
    pub stats: AcquisitionStats,
}

/// Pulls lines from a device into the shared sample buffer
pub struct AcquisitionLoop {
    source: Box<dyn LineSource>,
    buffer: SharedSampleBuffer,
    state: ConnectionState,
    sink: Arc<dyn DiagnosticSink>,
    poll_interval: Duration,
    echo: Option<Sender<String>>,
    stats: AcquisitionStats,
}

impl AcquisitionLoop {
    pub fn new(
        source: Box<dyn LineSource>,
        buffer: SharedSampleBuffer,
        state: ConnectionState,
        sink: Arc<dyn DiagnosticSink>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            buffer,
            state,
            sink,
            poll_interval,
            echo: None,
            stats: AcquisitionStats::default(),
        }
    }

    /// Forward every received line, verbatim, to `tx`
    pub fn with_echo(mut self, tx: Sender<String>) -> Self {
        self.echo = Some(tx);
        self
    }

    /// Run one poll/read/parse iteration
    pub fn step(&mut self) -> AcquisitionState {
        if !self.state.is_connected() {
            return AcquisitionState::Disconnected;
        }

        match self.source.has_input() {
            Ok(true) => {}
            Ok(false) => {
                self.stats.idle_polls += 1;
                thread::sleep(self.poll_interval);
                return AcquisitionState::Connected;
            }
            Err(e) => return self.fail(e),
        }

        let line = match self.source.read_line() {
            Ok(line) => line,
            Err(e) => return self.fail(e),
        };

        self.handle_line(line);
        AcquisitionState::Connected
    }

    /// Loop until disconnected, by request or by a read failure
    pub fn run(mut self) -> AcquisitionReport {
        log::debug!("Acquisition started on {}", self.source.describe());

        while self.step() == AcquisitionState::Connected {}

        log::debug!(
            "Acquisition stopped: {} lines, {} samples, {} parse errors",
            self.stats.lines,
            self.stats.samples,
            self.stats.parse_errors
        );

        AcquisitionReport {
            source: self.source,
            stats: self.stats,
        }
    }

    /// Run on a dedicated thread
    pub fn spawn(self) -> std::io::Result<JoinHandle<AcquisitionReport>> {
        thread::Builder::new()
            .name("ppg-acquisition".into())
            .spawn(move || self.run())
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.stats
    }

    fn handle_line(&mut self, line: String) {
        self.stats.lines += 1;
        log::trace!("{}", line);

        match parse_line(&line) {
            Ok(Some(sample)) => {
                self.buffer.append(sample);
                self.stats.samples += 1;
            }
            Ok(None) => self.stats.ignored += 1,
            Err(error) => {
                self.stats.parse_errors += 1;
                self.sink.report(Diagnostic::Parse {
                    line: line.clone(),
                    error,
                });
            }
        }

        let receiver_gone = match &self.echo {
            Some(tx) => tx.send(line).is_err(),
            None => false,
        };
        if receiver_gone {
            self.echo = None;
        }
    }

    fn fail(&mut self, error: std::io::Error) -> AcquisitionState {
        self.sink.report(Diagnostic::Io {
            message: format!("{}: {}", self.source.describe(), error),
        });
        self.state.disconnect();
        AcquisitionState::Disconnected
    }
}
