//! Loop configuration surface.

use std::time::Duration;

use fixedloop_tracing::LogMode;
use serde::{Deserialize, Serialize};

use crate::error::{LoopError, LoopResult};

/// Whether the driver paces itself at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Wait for the next scheduled instant after every iteration
    #[default]
    FixedFrequency,
    /// Start the next iteration immediately
    AsFastAsPossible,
}

/// How the driver waits for the next scheduled instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStrategy {
    /// Block the thread until the deadline
    #[default]
    Sleep,
    /// Poll the clock, yielding between polls, until the deadline
    BusyWait,
    /// Sleep until `spin_window_us` before the deadline, then busy-wait
    Hybrid {
        /// Length of the busy-wait tail in microseconds
        spin_window_us: u64,
    },
}

impl WaitStrategy {
    /// Hybrid strategy with an 80µs spin tail
    pub const fn hybrid() -> Self {
        WaitStrategy::Hybrid {
            spin_window_us: DEFAULT_SPIN_WINDOW_US,
        }
    }
}

/// Busy-wait tail used by [`WaitStrategy::hybrid`].
pub const DEFAULT_SPIN_WINDOW_US: u64 = 80;

/// Driver configuration.
///
/// Every field has a default, so partial documents deserialize:
///
/// ```
/// use fixedloop_scheduler::{LoopConfig, WaitStrategy};
///
/// let config: LoopConfig =
///     serde_json::from_str(r#"{ "target_rate_hz": 240.0, "wait_strategy": "busy_wait" }"#)?;
/// assert_eq!(config.wait_strategy, WaitStrategy::BusyWait);
/// assert_eq!(config.history_capacity, 1000);
/// config.validate()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Requested iterations per second
    pub target_rate_hz: f64,

    /// Paced or unthrottled
    pub operation_mode: OperationMode,

    /// Wait primitive used when paced
    pub wait_strategy: WaitStrategy,

    /// Disables pacing even in [`OperationMode::FixedFrequency`] when false
    pub rate_limiter_enabled: bool,

    /// Number of iterations kept for the rolling aggregate
    pub history_capacity: usize,

    /// Number of samples in the smoothed-frequency average
    pub frequency_window: usize,

    /// Whether the driver's logger forwards events
    pub log_mode: LogMode,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_rate_hz: crate::DEFAULT_TARGET_RATE_HZ,
            operation_mode: OperationMode::default(),
            wait_strategy: WaitStrategy::default(),
            rate_limiter_enabled: true,
            history_capacity: crate::DEFAULT_HISTORY_CAPACITY,
            frequency_window: crate::DEFAULT_FREQUENCY_WINDOW,
            log_mode: LogMode::default(),
        }
    }
}

impl LoopConfig {
    /// Default configuration with the given rate
    pub fn with_rate(target_rate_hz: f64) -> Self {
        Self {
            target_rate_hz,
            ..Self::default()
        }
    }

    /// Check every field
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found, rate first. Capacity and window
    /// are bounded above because their storage is allocated up front.
    pub fn validate(&self) -> LoopResult {
        period_for_rate(self.target_rate_hz)?;
        if !(1..=crate::MAX_HISTORY_CAPACITY).contains(&self.history_capacity) {
            return Err(LoopError::InvalidHistoryCapacity(self.history_capacity));
        }
        if !(1..=crate::MAX_FREQUENCY_WINDOW).contains(&self.frequency_window) {
            return Err(LoopError::InvalidAverageWindow(self.frequency_window));
        }
        Ok(())
    }

    /// Whether this configuration waits between iterations
    pub fn is_rate_limited(&self) -> bool {
        self.operation_mode == OperationMode::FixedFrequency && self.rate_limiter_enabled
    }
}

/// A validated target rate together with its period.
///
/// Holding one proves the rate is finite, positive and has a representable
/// period, so the driver can read the period every iteration without a
/// fallible conversion in the loop body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRate {
    hz: f64,
    period: Duration,
}

impl TargetRate {
    /// Validate a rate
    ///
    /// # Errors
    ///
    /// See [`period_for_rate`].
    pub fn new(hz: f64) -> LoopResult<Self> {
        let period = period_for_rate(hz)?;
        Ok(Self { hz, period })
    }

    /// Iterations per second
    #[inline]
    pub fn hz(self) -> f64 {
        self.hz
    }

    /// Time between iteration starts
    #[inline]
    pub fn period(self) -> Duration {
        self.period
    }

    /// Period in seconds, without the nanosecond truncation of [`period`](Self::period)
    #[inline]
    pub fn period_secs(self) -> f64 {
        self.hz.recip()
    }
}

/// Convert a rate into its period.
///
/// This is the only place a rate becomes a period, so NaN, infinite and
/// negative periods can never reach the scheduler.
///
/// # Errors
///
/// Returns [`LoopError::InvalidTargetRate`] if the rate is not finite, not
/// strictly positive, or its period does not fit in a [`Duration`].
pub fn period_for_rate(target_rate_hz: f64) -> LoopResult<Duration> {
    if !target_rate_hz.is_finite() || target_rate_hz <= 0.0 {
        return Err(LoopError::InvalidTargetRate(target_rate_hz));
    }
    Duration::try_from_secs_f64(target_rate_hz.recip())
        .map_err(|_overflow| LoopError::InvalidTargetRate(target_rate_hz))
}
