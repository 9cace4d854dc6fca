//! Snapshot tests for fixedloop-tracing event formats

use fixedloop_tracing::{LoopEvent, ResetReason};

#[test]
fn test_run_started_snapshot() {
    let event = LoopEvent::RunStarted {
        target_rate_hz: 60.0,
        rate_limited: true,
    };
    insta::assert_snapshot!(event.to_string(), @"RunStarted(rate=60.000Hz, rate_limited=true)");
}

#[test]
fn test_run_state_reset_snapshot() {
    let event = LoopEvent::RunStateReset {
        reason: ResetReason::TargetRateChanged,
    };
    insta::assert_snapshot!(event.to_string(), @"RunStateReset(reason=target_rate_changed)");
}

#[test]
fn test_iteration_completed_snapshot() {
    let event = LoopEvent::IterationCompleted {
        iteration: 42,
        measured_period_s: 0.0125,
        sleeping_until_s: 0.5,
    };
    insta::assert_snapshot!(
        event.to_string(),
        @"IterationCompleted(iteration=42, period=0.012500s, sleeping_until=0.500000s)"
    );
}

#[test]
fn test_overrun_snapshot() {
    let event = LoopEvent::Overrun {
        iteration: 7,
        late_by_s: 0.002,
    };
    insta::assert_snapshot!(event.to_string(), @"Overrun(iteration=7, late_by=0.002000s)");
}

#[test]
fn test_run_finished_snapshot() {
    let event = LoopEvent::RunFinished {
        iterations: 50,
        elapsed_s: 1.25,
    };
    insta::assert_snapshot!(event.to_string(), @"RunFinished(iterations=50, elapsed=1.250000s)");
}

#[test]
fn test_run_aborted_snapshot() {
    let event = LoopEvent::RunAborted { iteration: 3 };
    insta::assert_snapshot!(event.to_string(), @"RunAborted(iteration=3)");
}
