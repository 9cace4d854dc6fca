//! Log sink trait definition

use crate::LoopEvent;

/// Destination for labeled loop events.
///
/// The loop calls [`emit`](LogSink::emit) from its hot path, once per event,
/// on the thread that runs the loop. Implementations should return quickly
/// and must not call back into the driver.
///
/// # Thread Safety
///
/// Sinks are `Send + Sync` so a single sink can be shared between several
/// drivers running on different threads.
pub trait LogSink: Send + Sync {
    /// Record one event under the given section label
    fn emit(&self, label: &str, event: &LoopEvent);

    /// Check if the sink wants events at all
    ///
    /// Returning `false` lets the logger skip formatting work.
    fn is_enabled(&self) -> bool {
        true
    }
}

impl<S: LogSink + ?Sized> LogSink for std::sync::Arc<S> {
    fn emit(&self, label: &str, event: &LoopEvent) {
        (**self).emit(label, event);
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
}
