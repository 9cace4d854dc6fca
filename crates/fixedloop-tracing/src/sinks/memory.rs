use std::sync::Arc;

use parking_lot::Mutex;

use crate::{LogLevel, LogSink, LoopEvent};

/// One event as captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedEvent {
    /// Section label the event was emitted under
    pub label: String,
    /// The event itself
    pub event: LoopEvent,
}

impl CapturedEvent {
    /// Render as `[label] Event(...)`
    pub fn line(&self) -> String {
        format!("[{}] {}", self.label, self.event)
    }
}

/// Sink that keeps every event in memory.
///
/// Clones share the same buffer, so a test can hand one clone to the
/// driver's logger and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    captured: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured events
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.captured.lock().clone()
    }

    /// Captured events rendered as labeled lines
    pub fn lines(&self) -> Vec<String> {
        self.captured.lock().iter().map(CapturedEvent::line).collect()
    }

    /// Number of captured events with the given [`LoopEvent::event_type`]
    pub fn count(&self, event_type: &str) -> usize {
        self.captured
            .lock()
            .iter()
            .filter(|c| c.event.event_type() == event_type)
            .count()
    }

    /// Number of captured events at or above `level`
    pub fn count_at_least(&self, level: LogLevel) -> usize {
        self.captured
            .lock()
            .iter()
            .filter(|c| c.event.level() >= level)
            .count()
    }

    /// Total number of captured events
    pub fn len(&self) -> usize {
        self.captured.lock().len()
    }

    /// Check if nothing has been captured
    pub fn is_empty(&self) -> bool {
        self.captured.lock().is_empty()
    }

    /// Drop everything captured so far
    pub fn clear(&self) {
        self.captured.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, label: &str, event: &LoopEvent) {
        self.captured.lock().push(CapturedEvent {
            label: label.to_owned(),
            event: *event,
        });
    }
}
