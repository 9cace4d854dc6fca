use crate::{LogSink, LoopEvent};

/// Sink that forwards events to the `tracing` ecosystem.
///
/// Events are emitted under the `fixedloop` target with the section label
/// as a `section` field, so subscribers can filter with
/// `RUST_LOG=fixedloop=debug`. Per-iteration events use the trace level and
/// cost nothing unless a subscriber enables it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create a new tracing sink
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn emit(&self, label: &str, event: &LoopEvent) {
        match *event {
            LoopEvent::RunStarted {
                target_rate_hz,
                rate_limited,
            } => {
                tracing::info!(
                    target: "fixedloop",
                    section = %label,
                    target_rate_hz = target_rate_hz,
                    rate_limited = rate_limited,
                    "Loop run started"
                );
            }
            LoopEvent::RunStateReset { reason } => {
                tracing::debug!(
                    target: "fixedloop",
                    section = %label,
                    reason = %reason,
                    "Loop run state reset"
                );
            }
            LoopEvent::IterationCompleted {
                iteration,
                measured_period_s,
                sleeping_until_s,
            } => {
                tracing::trace!(
                    target: "fixedloop",
                    section = %label,
                    iteration = iteration,
                    measured_period_s = measured_period_s,
                    sleeping_until_s = sleeping_until_s,
                    "Loop iteration completed"
                );
            }
            LoopEvent::Overrun {
                iteration,
                late_by_s,
            } => {
                tracing::warn!(
                    target: "fixedloop",
                    section = %label,
                    iteration = iteration,
                    late_by_s = late_by_s,
                    "Loop iteration overran its period"
                );
            }
            LoopEvent::RunFinished {
                iterations,
                elapsed_s,
            } => {
                tracing::info!(
                    target: "fixedloop",
                    section = %label,
                    iterations = iterations,
                    elapsed_s = elapsed_s,
                    "Loop run finished"
                );
            }
            LoopEvent::RunAborted { iteration } => {
                tracing::warn!(
                    target: "fixedloop",
                    section = %label,
                    iteration = iteration,
                    "Loop run aborted by callback error"
                );
            }
        }
    }
}
