//! Tracing error types

use core::fmt;

/// Errors raised while configuring the log façade.
///
/// Emission itself never fails: sinks swallow their own problems so that a
/// broken log backend cannot stall the loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TracingError {
    /// Invalid configuration
    #[error("Invalid logging configuration: {0}")]
    InvalidConfiguration(String),

    /// Unknown log mode name
    #[error("Unknown log mode '{0}' (expected 'enabled' or 'disabled')")]
    UnknownLogMode(String),
}

impl TracingError {
    /// Create a configuration error with context
    pub fn invalid_config(context: impl fmt::Display) -> Self {
        TracingError::InvalidConfiguration(context.to_string())
    }
}
