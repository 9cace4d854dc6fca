//! Prelude for fixedloop-tracing
//!
//! ```
//! use fixedloop_tracing::prelude::*;
//!
//! let logger = LoopLogger::with_sink("render", NullSink);
//! assert_eq!(logger.mode(), LogMode::Enabled);
//! ```

pub use crate::{
    LogLevel, LogMetrics, LogMode, LogSink, LoopEvent, LoopLogger, MemorySink, NullSink,
    ResetReason, TracingError, TracingSink,
};
