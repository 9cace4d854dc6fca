//! Logger counters

use crate::{LogLevel, LoopEvent};

/// Counters kept by a [`LoopLogger`](crate::LoopLogger).
///
/// All counters are monotonically increasing and saturate instead of
/// wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogMetrics {
    /// Events handed to the sink
    pub events_emitted: u64,

    /// Events dropped because logging was disabled
    pub events_suppressed: u64,

    /// Warn-level events seen, emitted or not
    pub warnings: u64,
}

impl LogMetrics {
    /// Create new metrics with zero values
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event that reached the sink
    #[inline]
    pub fn record_emitted(&mut self, event: &LoopEvent) {
        self.events_emitted = self.events_emitted.saturating_add(1);
        self.count_warning(event);
    }

    /// Record an event that was dropped
    #[inline]
    pub fn record_suppressed(&mut self, event: &LoopEvent) {
        self.events_suppressed = self.events_suppressed.saturating_add(1);
        self.count_warning(event);
    }

    fn count_warning(&mut self, event: &LoopEvent) {
        if event.level() == LogLevel::Warn {
            self.warnings = self.warnings.saturating_add(1);
        }
    }

    /// Total events seen
    pub fn total(&self) -> u64 {
        self.events_emitted.saturating_add(self.events_suppressed)
    }

    /// Reset all counters to zero
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
