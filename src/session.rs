//! Connect/disconnect lifecycle.
//!
//! A [`Session`] owns the acquisition thread and the shared sample buffer.
//! The render side only needs the session's [`ConnectionState`] and
//! [`SharedSampleBuffer`], both cheap to clone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::acquisition::{
    AcquisitionLoop, AcquisitionReport, AcquisitionStats, LineSource, SerialSource,
    SharedSampleBuffer,
};
use crate::config::PpgConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{PpgError, Result};

/// Connected/disconnected flag observed by both loops
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    connected: Arc<AtomicBool>,
}

impl ConnectionState {
    /// A new, disconnected state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

pub struct Session {
    state: ConnectionState,
    buffer: SharedSampleBuffer,
    acquisition: Option<JoinHandle<AcquisitionReport>>,
    device: String,
    stats: Option<AcquisitionStats>,
}

impl Session {
    /// Start acquiring from an already-open device
    ///
    /// If the acquisition thread cannot be started the source is dropped,
    /// closing the device, before the error is returned.
    pub fn start(
        source: Box<dyn LineSource>,
        config: &PpgConfig,
        sink: Arc<dyn DiagnosticSink>,
        echo: Option<Sender<String>>,
    ) -> Result<Self> {
        let device = source.describe();
        let state = ConnectionState::new();
        let buffer = SharedSampleBuffer::new(config.buffer.capacity);

        let mut acquisition = AcquisitionLoop::new(
            source,
            buffer.clone(),
            state.clone(),
            Arc::clone(&sink),
            config.serial.poll_interval(),
        );
        if let Some(tx) = echo {
            acquisition = acquisition.with_echo(tx);
        }

        state.connect();
        let handle = match acquisition.spawn() {
            Ok(handle) => handle,
            Err(e) => {
                state.disconnect();
                let message = format!("cannot start acquisition thread: {}", e);
                sink.report(Diagnostic::Setup {
                    message: message.clone(),
                });
                return Err(PpgError::SerialDevice(message));
            }
        };

        log::info!("Session started on {}", device);

        Ok(Self {
            state,
            buffer,
            acquisition: Some(handle),
            device,
            stats: None,
        })
    }

    /// Open a serial port and start acquiring from it
    pub fn open_serial(
        port: &str,
        config: &PpgConfig,
        sink: Arc<dyn DiagnosticSink>,
        echo: Option<Sender<String>>,
    ) -> Result<Self> {
        let source = SerialSource::open(port, &config.serial).inspect_err(|e| {
            sink.report(Diagnostic::Setup {
                message: e.to_string(),
            })
        })?;
        Self::start(Box::new(source), config, sink, echo)
    }

    pub fn state(&self) -> ConnectionState {
        self.state.clone()
    }

    pub fn buffer(&self) -> &SharedSampleBuffer {
        &self.buffer
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Whether the acquisition thread has exited on its own
    pub fn acquisition_finished(&self) -> bool {
        self.acquisition.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Stop acquiring, join the acquisition thread and close the device
    ///
    /// Idempotent; later calls return the stats from the first.
    pub fn stop(&mut self) -> Option<AcquisitionStats> {
        self.state.disconnect();

        if let Some(handle) = self.acquisition.take() {
            match handle.join() {
                Ok(report) => {
                    drop(report.source);
                    log::info!(
                        "Session on {} closed after {} samples",
                        self.device,
                        report.stats.samples
                    );
                    self.stats = Some(report.stats);
                }
                Err(_) => log::error!("Acquisition thread for {} panicked", self.device),
            }
        }

        self.stats
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::ScriptedSource;
    use crate::diagnostics::RecordingSink;
    use std::io;
    use std::time::{Duration, Instant};

    fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn test_connection_state_shared_between_clones() {
        let state = ConnectionState::new();
        let other = state.clone();
        assert!(!other.is_connected());
        state.connect();
        assert!(other.is_connected());
        other.disconnect();
        assert!(!state.is_connected());
    }

    #[test]
    fn test_stop_joins_and_closes_source() {
        let mut source = ScriptedSource::from_lines(["PPG_RAW,1,2,3", "PPG_RAW,2,3,4"]);
        let closed = source.close_flag();
        let sink = RecordingSink::new();

        let mut session =
            Session::start(Box::new(source), &PpgConfig::default(), sink.clone(), None).unwrap();
        assert!(session.is_connected());
        assert_eq!(session.device(), "scripted");

        assert!(wait_until(|| session.buffer().len() == 2));

        let stats = session.stop().unwrap();
        assert_eq!(stats.samples, 2);
        assert!(!session.is_connected());
        assert!(closed.load(Ordering::SeqCst));
        assert!(session.acquisition_finished());

        // Second stop is a no-op
        assert_eq!(session.stop(), Some(stats));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_read_failure_ends_session() {
        let source = ScriptedSource::new()
            .line("PPG_RAW,1,2,3")
            .fail(io::ErrorKind::TimedOut, "stalled");
        let sink = RecordingSink::new();

        let session =
            Session::start(Box::new(source), &PpgConfig::default(), sink.clone(), None).unwrap();

        assert!(wait_until(|| !session.is_connected()));
        assert!(wait_until(|| session.acquisition_finished()));
        assert_eq!(session.buffer().len(), 1);
        assert_eq!(
            sink.count_matching(|d| matches!(d, Diagnostic::Io { .. })),
            1
        );
    }

    #[test]
    fn test_drop_closes_source() {
        let mut source = ScriptedSource::new();
        let closed = source.close_flag();
        let session =
            Session::start(Box::new(source), &PpgConfig::default(), RecordingSink::new(), None)
                .unwrap();
        drop(session);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_open_missing_serial_port_reports_setup_error() {
        let sink = RecordingSink::new();
        let result = Session::open_serial(
            "/dev/ppgscope-does-not-exist",
            &PpgConfig::default(),
            sink.clone(),
            None,
        );
        assert!(matches!(result, Err(PpgError::SerialDevice(_))));
        assert_eq!(
            sink.count_matching(|d| matches!(d, Diagnostic::Setup { .. })),
            1
        );
    }
}
