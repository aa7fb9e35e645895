//! The `StackCapture` hook, invoked when a kind constructs a record.

use crate::kind::ErrorKind;
use crate::types::ErrorRecord;

/// Captures a platform trace for a freshly constructed record.
///
/// Registries hand their hook to every kind they declare, and
/// [`ErrorKind::instantiate`] stores the returned text in
/// [`ErrorRecord::stack`]. The stack renderer uses that text as the record's
/// headline, so implementations should start it with `name: message`.
///
/// Implementations must be `Send + Sync`; kinds are shared across threads.
pub trait StackCapture: Send + Sync {
    /// Short identifier used in logs (e.g. `"backtrace"`).
    fn label(&self) -> &'static str;

    /// Produce a trace for `record`, or `None` to leave it without one.
    ///
    /// `record` is fully populated except for `stack`.
    fn capture(&self, record: &ErrorRecord, kind: &ErrorKind) -> Option<String>;
}

/// A hook that records the headline only. Useful in tests and for builds
/// that want `stack` populated without walking frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlineCapture;

impl StackCapture for HeadlineCapture {
    fn label(&self) -> &'static str {
        "headline"
    }

    fn capture(&self, record: &ErrorRecord, _kind: &ErrorKind) -> Option<String> {
        Some(record.headline())
    }
}
