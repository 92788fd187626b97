//! Progress reporting
//!
//! Long-running steps report each decision as a human-readable line through a
//! [`ProgressSink`] supplied by the caller. The binary uses [`LogSink`],
//! [`MemorySink`] keeps lines for later display, and any `FnMut(&str)` closure
//! works too.

use log::{info, warn};

/// Destination for progress lines
pub trait ProgressSink {
    /// Reports a normal progress line
    fn info(&mut self, message: &str);

    /// Reports a recoverable problem
    ///
    /// Defaults to [`ProgressSink::info`].
    fn warn(&mut self, message: &str) {
        self.info(message);
    }
}

/// Forwards progress lines to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn info(&mut self, message: &str) {
        info!("{}", message);
    }

    fn warn(&mut self, message: &str) {
        warn!("{}", message);
    }
}

/// Keeps every progress line in memory
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemorySink {
    pub lines: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if any recorded line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }
}

impl ProgressSink for MemorySink {
    fn info(&mut self, message: &str) {
        self.lines.push(message.to_string());
    }
}

impl<F> ProgressSink for F
where
    F: FnMut(&str),
{
    fn info(&mut self, message: &str) {
        self(message);
    }
}
