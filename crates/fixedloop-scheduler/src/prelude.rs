//! Prelude module for common driver types.
//!
//! This module provides a convenient way to import the most commonly used
//! types from the scheduler crate.

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{LoopConfig, OperationMode, WaitStrategy};
pub use crate::driver::{FixedFrequencyLoop, LoopBuilder, run_at_rate};
pub use crate::error::{LoopError, LoopResult};
pub use crate::stats::{IterationStats, IterationStatsTracker};
pub use crate::{DEFAULT_HISTORY_CAPACITY, DEFAULT_TARGET_RATE_HZ, MAX_HISTORY_CAPACITY};
pub use fixedloop_tracing::{LogMode, LoopLogger};
