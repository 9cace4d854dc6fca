//! Drift-free fixed-frequency execution with rolling iteration statistics.
//!
//! A [`FixedFrequencyLoop`] calls a user callback repeatedly on the calling
//! thread at a target rate. It includes:
//!
//! - **Absolute scheduling**: wake times are `loop_start + period * n`, so
//!   late iterations never accumulate into drift
//! - **Wait strategies**: sleep, busy-wait, or sleep followed by a short spin
//! - **Operation modes**: paced at the target rate, or as fast as possible
//! - **Iteration statistics**: a bounded FIFO history with a field-wise mean
//!   and a smoothed frequency estimate
//! - **Injectable clock**: [`ManualClock`] makes runs deterministic in tests
//!
//! Diagnostics go through [`fixedloop_tracing::LoopLogger`].
//!
//! # Example
//!
//! ```
//! use fixedloop_scheduler::{FixedFrequencyLoop, ManualClock};
//! use std::cell::Cell;
//!
//! let clock = ManualClock::new();
//! let mut driver = FixedFrequencyLoop::builder()
//!     .target_rate_hz(100.0)
//!     .clock(clock.clone())
//!     .build()?;
//!
//! let ticks = Cell::new(0);
//! driver.start(|_dt| ticks.set(ticks.get() + 1), || ticks.get() == 10);
//!
//! assert_eq!(driver.iteration_count(), 10);
//! assert!(clock.elapsed().as_millis() >= 99);
//! # Ok::<(), fixedloop_scheduler::LoopError>(())
//! ```

#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod average;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod stats;
pub mod wait;

pub mod prelude;

pub use average::MovingAverage;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    DEFAULT_SPIN_WINDOW_US, LoopConfig, OperationMode, TargetRate, WaitStrategy, period_for_rate,
};
pub use driver::{FixedFrequencyLoop, LoopBuilder, run_at_rate};
pub use error::{LoopError, LoopResult};
pub use stats::{IterationStats, IterationStatsTracker};
pub use wait::wait_until;

pub use fixedloop_tracing::{LogMode, LoopLogger};

/// Rate used when none is configured
pub const DEFAULT_TARGET_RATE_HZ: f64 = 60.0;

/// Iteration records kept by default
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Samples in the smoothed-frequency window by default
pub const DEFAULT_FREQUENCY_WINDOW: usize = 100;

/// Largest accepted history capacity; storage is allocated up front
pub const MAX_HISTORY_CAPACITY: usize = 1 << 20;

/// Largest accepted smoothed-frequency window
pub const MAX_FREQUENCY_WINDOW: usize = 1 << 16;
