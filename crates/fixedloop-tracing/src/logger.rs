//! Labeled logger owned by a loop driver

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_SECTION, LogMetrics, LogSink, LoopEvent, TracingError, TracingSink};

/// Whether a [`LoopLogger`] forwards events at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMode {
    /// Forward events to the sink
    #[default]
    Enabled,
    /// Drop events (they are still counted)
    Disabled,
}

impl FromStr for LogMode {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" | "enable" | "on" => Ok(LogMode::Enabled),
            "disabled" | "disable" | "off" => Ok(LogMode::Disabled),
            other => Err(TracingError::UnknownLogMode(other.to_owned())),
        }
    }
}

/// Logger injected into a loop driver.
///
/// Stamps every event with a section label, honours the [`LogMode`] switch
/// and keeps [`LogMetrics`]. The sink is shared (`Arc`) so several loggers
/// can write to one destination.
///
/// # Example
///
/// ```
/// use fixedloop_tracing::{LogMode, LoopEvent, LoopLogger, MemorySink};
///
/// let sink = MemorySink::new();
/// let mut logger = LoopLogger::with_sink("audio", sink.clone());
/// logger.set_mode(LogMode::Disabled);
///
/// logger.emit(LoopEvent::RunAborted { iteration: 4 });
///
/// assert!(sink.is_empty());
/// assert_eq!(logger.metrics().events_suppressed, 1);
/// ```
#[derive(Clone)]
pub struct LoopLogger {
    section: String,
    sink: Arc<dyn LogSink>,
    mode: LogMode,
    metrics: LogMetrics,
}

impl LoopLogger {
    /// Create a logger that writes to `tracing` under the given section
    ///
    /// # Errors
    ///
    /// Returns [`TracingError::InvalidConfiguration`] if `section` is blank.
    pub fn new(section: impl Into<String>) -> Result<Self, TracingError> {
        let section = section.into();
        if section.trim().is_empty() {
            return Err(TracingError::invalid_config("section label must not be empty"));
        }
        Ok(Self::from_parts(section, Arc::new(TracingSink::new())))
    }

    /// Create a logger with a custom sink
    ///
    /// A blank `section` falls back to [`DEFAULT_SECTION`].
    pub fn with_sink(section: impl Into<String>, sink: impl LogSink + 'static) -> Self {
        Self::with_shared_sink(section, Arc::new(sink))
    }

    /// Create a logger around an already shared sink
    pub fn with_shared_sink(section: impl Into<String>, sink: Arc<dyn LogSink>) -> Self {
        let section = section.into();
        let section = if section.trim().is_empty() {
            DEFAULT_SECTION.to_owned()
        } else {
            section
        };
        Self::from_parts(section, sink)
    }

    fn from_parts(section: String, sink: Arc<dyn LogSink>) -> Self {
        Self {
            section,
            sink,
            mode: LogMode::Enabled,
            metrics: LogMetrics::new(),
        }
    }

    /// Section label attached to every event
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Current mode
    pub fn mode(&self) -> LogMode {
        self.mode
    }

    /// Switch forwarding on or off
    pub fn set_mode(&mut self, mode: LogMode) {
        self.mode = mode;
    }

    /// Check if events would currently reach the sink
    pub fn is_enabled(&self) -> bool {
        self.mode == LogMode::Enabled && self.sink.is_enabled()
    }

    /// Emit an event under this logger's section
    #[inline]
    pub fn emit(&mut self, event: LoopEvent) {
        if self.is_enabled() {
            self.sink.emit(&self.section, &event);
            self.metrics.record_emitted(&event);
        } else {
            self.metrics.record_suppressed(&event);
        }
    }

    /// Counters accumulated since construction
    pub fn metrics(&self) -> LogMetrics {
        self.metrics
    }
}

impl Default for LoopLogger {
    fn default() -> Self {
        Self::from_parts(DEFAULT_SECTION.to_owned(), Arc::new(TracingSink::new()))
    }
}

impl core::fmt::Debug for LoopLogger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoopLogger")
            .field("section", &self.section)
            .field("mode", &self.mode)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySink, NullSink};

    #[test]
    fn test_new_rejects_blank_section() {
        assert!(LoopLogger::new("   ").is_err());
        assert!(LoopLogger::new("physics").is_ok());
    }

    #[test]
    fn test_with_sink_blank_section_falls_back() {
        let logger = LoopLogger::with_sink("", NullSink);
        assert_eq!(logger.section(), DEFAULT_SECTION);
    }

    #[test]
    fn test_null_sink_suppresses() {
        let mut logger = LoopLogger::with_sink("x", NullSink);
        assert!(!logger.is_enabled());

        logger.emit(LoopEvent::RunAborted { iteration: 0 });
        assert_eq!(logger.metrics().events_suppressed, 1);
        assert_eq!(logger.metrics().events_emitted, 0);
    }

    #[test]
    fn test_mode_toggle() {
        let sink = MemorySink::new();
        let mut logger = LoopLogger::with_sink("x", sink.clone());

        logger.set_mode(LogMode::Disabled);
        logger.emit(LoopEvent::RunAborted { iteration: 0 });
        logger.set_mode(LogMode::Enabled);
        logger.emit(LoopEvent::RunAborted { iteration: 1 });

        assert_eq!(sink.len(), 1);
        assert_eq!(logger.metrics().total(), 2);
        assert_eq!(logger.metrics().warnings, 2);
    }

    #[test]
    fn test_log_mode_from_str() {
        assert_eq!("Enabled".parse::<LogMode>(), Ok(LogMode::Enabled));
        assert_eq!(" off ".parse::<LogMode>(), Ok(LogMode::Disabled));
        assert!(matches!(
            "loud".parse::<LogMode>(),
            Err(TracingError::UnknownLogMode(_))
        ));
    }

    #[test]
    fn test_default_logger() {
        let logger = LoopLogger::default();
        assert_eq!(logger.section(), DEFAULT_SECTION);
        assert_eq!(logger.mode(), LogMode::Enabled);
    }
}
