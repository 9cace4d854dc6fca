//! Labeled, switchable log façade for the fixedloop execution driver.
//!
//! The driver never talks to a logging backend directly. It owns a
//! [`LoopLogger`], which stamps every [`LoopEvent`] with a section label and
//! forwards it to a [`LogSink`]:
//!
//! - [`TracingSink`]: structured `tracing` events (target `fixedloop`)
//! - [`MemorySink`]: captured lines, for tests and introspection
//! - [`NullSink`]: discards everything
//!
//! Logging is diagnostic only. Nothing emitted here feeds back into the
//! loop's control flow.
//!
//! # Example
//!
//! ```
//! use fixedloop_tracing::{LoopEvent, LoopLogger, MemorySink};
//!
//! let sink = MemorySink::new();
//! let mut logger = LoopLogger::with_sink("physics", sink.clone());
//!
//! logger.emit(LoopEvent::RunStarted {
//!     target_rate_hz: 120.0,
//!     rate_limited: true,
//! });
//!
//! assert_eq!(sink.lines(), vec!["[physics] RunStarted(rate=120.000Hz, rate_limited=true)"]);
//! ```

#![deny(clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod events;
pub mod logger;
pub mod metrics;
pub mod prelude;
pub mod sink;
pub mod sinks;

pub use error::TracingError;
pub use events::{LogLevel, LoopEvent, ResetReason};
pub use logger::{LogMode, LoopLogger};
pub use metrics::LogMetrics;
pub use sink::LogSink;
pub use sinks::{CapturedEvent, MemorySink, NullSink, TracingSink};

/// Section label used when the caller does not name one.
pub const DEFAULT_SECTION: &str = "fixed_frequency_loop";
