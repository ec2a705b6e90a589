//! Reporting of the logger's own failures
//!
//! A destination that fails to write cannot be used to report that failure,
//! so workers send it to a [`DiagnosticSink`] instead.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Receiver for internal error messages.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Writes `[LOGGER ERROR] message` to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&self, message: &str) {
        eprintln!("[LOGGER ERROR] {}", message);
    }
}

/// Forwards messages to a sink, suppressing consecutive duplicates.
pub struct ErrorReporter {
    sink: Arc<dyn DiagnosticSink>,
    last: Mutex<Option<String>>,
}

impl ErrorReporter {
    /// Reporter forwarding to `sink`.
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink,
            last: Mutex::new(None),
        }
    }

    /// Report `message` unless it repeats the previous report.
    ///
    /// Returns whether the sink was called.
    pub fn report(&self, message: &str) -> bool {
        let mut last = self.last.lock();
        if last.as_deref() == Some(message) {
            return false;
        }
        *last = Some(message.to_string());
        drop(last);
        self.sink.report(message);
        true
    }

    /// Forget the last message, e.g. after a successful write.
    pub fn clear(&self) {
        self.last.lock().take();
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(Arc::new(StderrSink))
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("last", &*self.last.lock())
            .finish()
    }
}
