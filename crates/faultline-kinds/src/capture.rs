//! Backtrace capture for records built from the bundled kinds.

use faultline_core::{ErrorKind, ErrorRecord, StackCapture};

/// Captures the calling thread's backtrace below the record's headline.
///
/// ```text
/// UserError: Please check your input.
///    0: backtrace::backtrace::trace
///    ...
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceCapture;

impl StackCapture for BacktraceCapture {
    fn label(&self) -> &'static str {
        "backtrace"
    }

    fn capture(&self, record: &ErrorRecord, _kind: &ErrorKind) -> Option<String> {
        let trace = backtrace::Backtrace::new();
        Some(format!("{}\n{:?}", record.headline(), trace))
    }
}
