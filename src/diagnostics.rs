//! Diagnostic reporting shared by the acquisition, filtering and render stages.
//!
//! Components never print. They hand a [`Diagnostic`] to an injected
//! [`DiagnosticSink`]; binaries use [`LogSink`] and tests use
//! [`RecordingSink`] to assert on what was reported.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::ParseError;

/// Which optical channel a diagnostic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Infrared,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Red => write!(f, "red"),
            Channel::Infrared => write!(f, "infrared"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A marked line was malformed and discarded
    Parse { line: String, error: ParseError },
    /// Smoothing failed; raw data was shown instead
    Filter { channel: Channel, message: String },
    /// Device I/O failed; acquisition stopped
    Io { message: String },
    /// Session could not be established
    Setup { message: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Parse { line, error } => write!(f, "parse error ({}): {:?}", error, line),
            Diagnostic::Filter { channel, message } => {
                write!(f, "filter error on {} channel: {}", channel, message)
            }
            Diagnostic::Io { message } => write!(f, "read error: {}", message),
            Diagnostic::Setup { message } => write!(f, "setup error: {}", message),
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::Parse { .. } | Diagnostic::Filter { .. } => log::warn!("{}", diagnostic),
            Diagnostic::Io { .. } | Diagnostic::Setup { .. } => log::error!("{}", diagnostic),
        }
    }
}

/// Keeps every diagnostic in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn count_matching<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Diagnostic) -> bool,
    {
        self.diagnostics().iter().filter(|d| predicate(d)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics().is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        if let Ok(mut records) = self.records.lock() {
            records.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.report(Diagnostic::Io {
            message: "first".into(),
        });
        sink.report(Diagnostic::Setup {
            message: "second".into(),
        });

        let records = sink.diagnostics();
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[0], Diagnostic::Io { message } if message == "first"));
        assert_eq!(
            sink.count_matching(|d| matches!(d, Diagnostic::Setup { .. })),
            1
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::Filter {
            channel: Channel::Infrared,
            message: "boom".into(),
        };
        assert_eq!(d.to_string(), "filter error on infrared channel: boom");
    }
}
