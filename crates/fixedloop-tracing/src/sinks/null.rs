use crate::{LogSink, LoopEvent};

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn emit(&self, _label: &str, _event: &LoopEvent) {}

    fn is_enabled(&self) -> bool {
        false
    }
}
