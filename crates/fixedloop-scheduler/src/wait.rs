//! Wait strategy implementations.

use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::config::WaitStrategy;

/// Wait on `clock` until `deadline` using `strategy`.
///
/// Returns immediately when the deadline has already passed; no strategy
/// ever waits a negative duration.
pub fn wait_until<C: Clock + ?Sized>(clock: &C, strategy: WaitStrategy, deadline: Instant) {
    match strategy {
        WaitStrategy::Sleep => {
            if deadline > clock.now() {
                clock.sleep_until(deadline);
            }
        }
        WaitStrategy::BusyWait => spin_until(clock, deadline),
        WaitStrategy::Hybrid { spin_window_us } => {
            let spin_window = Duration::from_micros(spin_window_us);
            if let Some(wake) = deadline.checked_sub(spin_window)
                && wake > clock.now()
            {
                clock.sleep_until(wake);
            }
            spin_until(clock, deadline);
        }
    }
}

fn spin_until<C: Clock + ?Sized>(clock: &C, deadline: Instant) {
    while clock.now() < deadline {
        clock.yield_now();
    }
}
