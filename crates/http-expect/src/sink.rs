//! Failure sinks: where assertion output and fatal errors are reported.
//!
//! The engine never depends on a specific test framework. Anything that can
//! log, record an error, and abort the current test can act as a sink.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, info};

/// Capability used to report assertion results and fatal failures.
pub trait FailureSink: Send + Sync {
    fn log(&self, message: &str);
    fn error(&self, message: &str);
    /// Abort the current test. Never returns.
    fn fail_now(&self) -> !;
}

/// Sink that records every call. `fail_now` panics with
/// `"FailNow was called"` so fatal paths can be observed with
/// [`std::panic::catch_unwind`].
#[derive(Debug, Default)]
pub struct RecordingSink {
    logs: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    fail_now_count: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    pub fn log_count(&self) -> usize {
        self.logs.lock().len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn fail_now_count(&self) -> usize {
        self.fail_now_count.load(Ordering::SeqCst)
    }

    /// Record an error without aborting. Used by the server when it answers
    /// a failed request itself.
    pub(crate) fn record_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }
}

impl FailureSink for RecordingSink {
    fn log(&self, message: &str) {
        self.logs.lock().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.record_error(message);
    }

    fn fail_now(&self) -> ! {
        self.fail_now_count.fetch_add(1, Ordering::SeqCst);
        panic!("FailNow was called");
    }
}

/// Sink that writes to `tracing`; `fail_now` panics. Used by the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn log(&self, message: &str) {
        info!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }

    fn fail_now(&self) -> ! {
        panic!("test aborted by failure sink");
    }
}
