//! Loop event definitions

use core::fmt;

/// Severity attached to each [`LoopEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Per-iteration chatter
    Trace,
    /// Internal state transitions
    Debug,
    /// Run lifecycle
    Info,
    /// Something the caller should look at
    Warn,
}

impl LogLevel {
    /// Lowercase name, as used in rendered lines
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the driver discarded its scheduling anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetReason {
    /// A new run is beginning
    RunStart,
    /// `set_target_rate` was called
    TargetRateChanged,
    /// `set_operation_mode` was called
    OperationModeChanged,
    /// `set_wait_strategy` was called
    WaitStrategyChanged,
    /// The rate limiter was switched on or off
    RateLimiterToggled,
    /// Explicit `reset()` by the caller
    Manual,
}

impl ResetReason {
    /// Snake-case name, stable across releases
    pub const fn as_str(self) -> &'static str {
        match self {
            ResetReason::RunStart => "run_start",
            ResetReason::TargetRateChanged => "target_rate_changed",
            ResetReason::OperationModeChanged => "operation_mode_changed",
            ResetReason::WaitStrategyChanged => "wait_strategy_changed",
            ResetReason::RateLimiterToggled => "rate_limiter_toggled",
            ResetReason::Manual => "manual",
        }
    }
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic events emitted by the loop driver.
///
/// All variants are `Copy` so emitting one from the loop body never
/// allocates before it reaches a sink. Times are in seconds, relative to
/// the start of the current run unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopEvent {
    /// `start` was entered
    RunStarted {
        /// Requested iterations per second
        target_rate_hz: f64,
        /// Whether the driver will pace itself
        rate_limited: bool,
    },

    /// Run state (start instant, last-iteration instant, period counter) was reset
    RunStateReset {
        /// What triggered the reset
        reason: ResetReason,
    },

    /// One pass of the loop body finished, before waiting
    IterationCompleted {
        /// Zero-based iteration index over the driver's lifetime
        iteration: u64,
        /// Wall time since the previous iteration started
        measured_period_s: f64,
        /// Relative time the driver intends to wake at
        sleeping_until_s: f64,
    },

    /// The next wake time was already in the past when the driver got to wait
    Overrun {
        /// Zero-based iteration index over the driver's lifetime
        iteration: u64,
        /// How far behind schedule the driver was
        late_by_s: f64,
    },

    /// The termination predicate stopped the run
    RunFinished {
        /// Iterations executed by this run
        iterations: u64,
        /// Wall time spent inside `start`
        elapsed_s: f64,
    },

    /// The callback returned an error and the run was abandoned
    RunAborted {
        /// Iteration during which the callback failed
        iteration: u64,
    },
}

impl LoopEvent {
    /// Returns the event type as a string for logging
    #[inline]
    pub const fn event_type(&self) -> &'static str {
        match self {
            LoopEvent::RunStarted { .. } => "run_started",
            LoopEvent::RunStateReset { .. } => "run_state_reset",
            LoopEvent::IterationCompleted { .. } => "iteration_completed",
            LoopEvent::Overrun { .. } => "overrun",
            LoopEvent::RunFinished { .. } => "run_finished",
            LoopEvent::RunAborted { .. } => "run_aborted",
        }
    }

    /// Severity used for filtering and for the `tracing` level
    #[inline]
    pub const fn level(&self) -> LogLevel {
        match self {
            LoopEvent::IterationCompleted { .. } => LogLevel::Trace,
            LoopEvent::RunStateReset { .. } => LogLevel::Debug,
            LoopEvent::RunStarted { .. } | LoopEvent::RunFinished { .. } => LogLevel::Info,
            LoopEvent::Overrun { .. } | LoopEvent::RunAborted { .. } => LogLevel::Warn,
        }
    }

    /// Iteration index, for events tied to a single iteration
    #[inline]
    pub const fn iteration(&self) -> Option<u64> {
        match self {
            LoopEvent::IterationCompleted { iteration, .. }
            | LoopEvent::Overrun { iteration, .. }
            | LoopEvent::RunAborted { iteration } => Some(*iteration),
            LoopEvent::RunStarted { .. }
            | LoopEvent::RunStateReset { .. }
            | LoopEvent::RunFinished { .. } => None,
        }
    }
}

impl fmt::Display for LoopEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopEvent::RunStarted {
                target_rate_hz,
                rate_limited,
            } => write!(
                f,
                "RunStarted(rate={target_rate_hz:.3}Hz, rate_limited={rate_limited})"
            ),
            LoopEvent::RunStateReset { reason } => write!(f, "RunStateReset(reason={reason})"),
            LoopEvent::IterationCompleted {
                iteration,
                measured_period_s,
                sleeping_until_s,
            } => write!(
                f,
                "IterationCompleted(iteration={iteration}, period={measured_period_s:.6}s, sleeping_until={sleeping_until_s:.6}s)"
            ),
            LoopEvent::Overrun {
                iteration,
                late_by_s,
            } => write!(f, "Overrun(iteration={iteration}, late_by={late_by_s:.6}s)"),
            LoopEvent::RunFinished {
                iterations,
                elapsed_s,
            } => write!(
                f,
                "RunFinished(iterations={iterations}, elapsed={elapsed_s:.6}s)"
            ),
            LoopEvent::RunAborted { iteration } => write!(f, "RunAborted(iteration={iteration})"),
        }
    }
}
