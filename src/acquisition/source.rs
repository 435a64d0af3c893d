use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A device that produces text lines
///
/// Implemented by the serial port adapter, the scripted test source and the
/// simulated device. Dropping a source closes the underlying connection.
pub trait LineSource: Send {
    /// Non-blocking check for pending input
    fn has_input(&mut self) -> io::Result<bool>;

    /// Read one line, without its terminator
    ///
    /// May block up to the device read timeout. A timeout with no data
    /// yields an empty string rather than an error.
    fn read_line(&mut self) -> io::Result<String>;

    /// Human readable device name for status output
    fn describe(&self) -> String;
}

#[derive(Debug)]
enum Step {
    Line(String),
    Idle,
    Fail(io::ErrorKind, String),
}

/// Replays a fixed script of lines, idle polls and failures
///
/// Once the script is exhausted the source reports no input forever.
///
/// ```
/// use ppgscope::acquisition::{LineSource, ScriptedSource};
///
/// let mut source = ScriptedSource::new().line("PPG_RAW,1,2,3").idle();
/// assert!(source.has_input().unwrap());
/// assert_eq!(source.read_line().unwrap(), "PPG_RAW,1,2,3");
/// assert!(!source.has_input().unwrap());
/// ```
#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    closed: Option<Arc<AtomicBool>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lines.into_iter().fold(Self::new(), |s, l| s.line(l))
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.steps.push_back(Step::Line(line.into()));
        self
    }

    /// One poll that reports no pending input
    pub fn idle(mut self) -> Self {
        self.steps.push_back(Step::Idle);
        self
    }

    /// One poll that fails with an I/O error
    pub fn fail(mut self, kind: io::ErrorKind, message: impl Into<String>) -> Self {
        self.steps.push_back(Step::Fail(kind, message.into()));
        self
    }

    /// Flag set to `true` when the source is dropped
    pub fn close_flag(&mut self) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        self.closed = Some(Arc::clone(&flag));
        flag
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl LineSource for ScriptedSource {
    fn has_input(&mut self) -> io::Result<bool> {
        match self.steps.front() {
            Some(Step::Line(_)) => Ok(true),
            Some(Step::Idle) => {
                self.steps.pop_front();
                Ok(false)
            }
            Some(Step::Fail(..)) => match self.steps.pop_front() {
                Some(Step::Fail(kind, message)) => Err(io::Error::new(kind, message)),
                _ => Ok(false),
            },
            None => Ok(false),
        }
    }

    fn read_line(&mut self) -> io::Result<String> {
        match self.steps.pop_front() {
            Some(Step::Line(line)) => Ok(line),
            Some(Step::Fail(kind, message)) => Err(io::Error::new(kind, message)),
            Some(Step::Idle) | None => Ok(String::new()),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        if let Some(flag) = &self.closed {
            flag.store(true, Ordering::SeqCst);
        }
    }
}
