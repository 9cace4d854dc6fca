//! Error types for the scheduler crate.

/// Configuration errors raised at the driver's boundary.
///
/// The loop itself has no runtime error path: overruns are reported through
/// statistics and logging, and callback errors are returned to the caller
/// untouched by [`try_start`](crate::FixedFrequencyLoop::try_start).
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum LoopError {
    /// Target rate is non-positive, non-finite, or so small that its period overflows
    #[error("Invalid target rate {0} Hz: must be finite, positive and have a representable period")]
    InvalidTargetRate(f64),

    /// History must hold between 1 and [`MAX_HISTORY_CAPACITY`](crate::MAX_HISTORY_CAPACITY) entries
    #[error("Invalid history capacity {0}: must be between 1 and {max}", max = crate::MAX_HISTORY_CAPACITY)]
    InvalidHistoryCapacity(usize),

    /// Rolling-average window must hold between 1 and [`MAX_FREQUENCY_WINDOW`](crate::MAX_FREQUENCY_WINDOW) samples
    #[error("Invalid averaging window {0}: must be between 1 and {max}", max = crate::MAX_FREQUENCY_WINDOW)]
    InvalidAverageWindow(usize),
}

impl LoopError {
    /// Check if this error came from a rate setting
    pub fn is_rate_error(&self) -> bool {
        matches!(self, LoopError::InvalidTargetRate(_))
    }
}

/// Result alias for driver configuration
pub type LoopResult<T = ()> = Result<T, LoopError>;
