//! Fixed-frequency loop driver.
//!
//! Wake times are anchored to the run's start instant plus an integer number
//! of periods (`loop_start + period * periods_elapsed`), never to the
//! previous wake. An iteration that runs late therefore shortens the next
//! wait instead of pushing every later iteration back, and the long-run rate
//! stays locked to the target.

use std::convert::Infallible;
use std::time::{Duration, Instant};

use fixedloop_tracing::{LogMode, LoopEvent, LoopLogger, ResetReason};

use crate::clock::{Clock, SystemClock};
use crate::config::{LoopConfig, OperationMode, TargetRate, WaitStrategy};
use crate::error::LoopResult;
use crate::stats::{IterationStats, IterationStatsTracker};
use crate::wait::wait_until;

/// Scheduling anchor for one run.
///
/// Reset whenever pacing parameters change, so a new schedule never inherits
/// a period count computed under the old one. The anchor is taken at the
/// first iteration after a reset, not at the reset itself, so idle time
/// before that iteration never turns into a backlog of past wake times.
#[derive(Debug, Clone, Copy)]
struct RunState {
    /// Fixed origin for wake-time computation
    loop_start: Instant,
    /// Start of the previous iteration; only used to measure the period
    last_iteration_start: Instant,
    /// Iterations completed since the last reset
    periods_elapsed: u64,
    /// Whether `loop_start` has been taken for this run
    anchored: bool,
}

impl RunState {
    fn pending(now: Instant) -> Self {
        Self {
            loop_start: now,
            last_iteration_start: now,
            periods_elapsed: 0,
            anchored: false,
        }
    }

    fn anchor(&mut self, now: Instant) {
        self.loop_start = now;
        self.last_iteration_start = now;
        self.anchored = true;
    }
}

/// Runs a callback at a fixed rate on the calling thread.
///
/// Each iteration measures the time since the previous one, hands it to the
/// callback, records an [`IterationStats`], then (when paced) waits for the
/// next drift-free wake time using the configured [`WaitStrategy`].
///
/// The driver never spawns threads and never runs the callback twice to
/// catch up: if an iteration overruns, the next wake time is already in the
/// past and the loop continues immediately. Run it on a dedicated thread if
/// other work must proceed while it sleeps.
///
/// # Example
///
/// ```no_run
/// use fixedloop_scheduler::FixedFrequencyLoop;
/// use std::time::{Duration, Instant};
///
/// let mut driver = FixedFrequencyLoop::new(120.0)?;
/// let deadline = Instant::now() + Duration::from_secs(2);
///
/// driver.start(
///     |dt| {
///         // advance the simulation by the measured dt, not 1/120
///         let _ = dt;
///     },
///     || Instant::now() >= deadline,
/// );
///
/// println!("{:.1} Hz", driver.get_average_loop_stats().measured_frequency_hz());
/// # Ok::<(), fixedloop_scheduler::LoopError>(())
/// ```
#[derive(Debug)]
pub struct FixedFrequencyLoop<C: Clock = SystemClock> {
    config: LoopConfig,
    rate: TargetRate,
    run: RunState,
    iteration_count: u64,
    overrun_count: u64,
    tracker: IterationStatsTracker,
    logger: LoopLogger,
    clock: C,
}

impl FixedFrequencyLoop<SystemClock> {
    /// Create a paced, sleeping driver at `target_rate_hz`
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidTargetRate`](crate::LoopError::InvalidTargetRate)
    /// for a non-finite or non-positive rate.
    pub fn new(target_rate_hz: f64) -> LoopResult<Self> {
        LoopBuilder::new().target_rate_hz(target_rate_hz).build()
    }

    /// Create a driver from a full configuration
    ///
    /// # Errors
    ///
    /// Returns the first invalid field reported by [`LoopConfig::validate`].
    pub fn from_config(config: LoopConfig) -> LoopResult<Self> {
        LoopBuilder::new().config(config).build()
    }

    /// Start building a driver with injected collaborators
    pub fn builder() -> LoopBuilder<SystemClock> {
        LoopBuilder::new()
    }
}

impl<C: Clock> FixedFrequencyLoop<C> {
    /// Run until `should_stop` returns true.
    ///
    /// `should_stop` is polled once before every iteration; `callback`
    /// receives the measured seconds since the previous iteration started.
    /// Run state is reset on entry.
    pub fn start<F, P>(&mut self, mut callback: F, should_stop: P)
    where
        F: FnMut(f64),
        P: FnMut() -> bool,
    {
        let result: Result<(), Infallible> = self.try_start(
            |dt| {
                callback(dt);
                Ok(())
            },
            should_stop,
            None,
        );
        let Ok(()) = result;
    }

    /// Like [`start`](Self::start), delivering the rolling aggregate to
    /// `stats_sink` after every iteration.
    pub fn start_with_stats<F, P, S>(&mut self, mut callback: F, should_stop: P, mut stats_sink: S)
    where
        F: FnMut(f64),
        P: FnMut() -> bool,
        S: FnMut(IterationStats),
    {
        let result: Result<(), Infallible> = self.try_start(
            |dt| {
                callback(dt);
                Ok(())
            },
            should_stop,
            Some(&mut stats_sink as &mut dyn FnMut(IterationStats)),
        );
        let Ok(()) = result;
    }

    /// Run with a fallible callback.
    ///
    /// The first error ends the run and is returned unchanged. The failing
    /// iteration's statistics are discarded and no wait is performed.
    ///
    /// # Errors
    ///
    /// Returns whatever `callback` returned.
    pub fn try_start<E, F, P>(
        &mut self,
        mut callback: F,
        mut should_stop: P,
        mut stats_sink: Option<&mut (dyn FnMut(IterationStats) + '_)>,
    ) -> Result<(), E>
    where
        F: FnMut(f64) -> Result<(), E>,
        P: FnMut() -> bool,
    {
        self.reset_with(ResetReason::RunStart);
        self.logger.emit(LoopEvent::RunStarted {
            target_rate_hz: self.rate.hz(),
            rate_limited: self.config.is_rate_limited(),
        });

        let first_iteration = self.iteration_count;

        while !should_stop() {
            self.try_iterate(&mut callback, stats_sink.as_deref_mut())?;
        }

        self.logger.emit(LoopEvent::RunFinished {
            iterations: self.iteration_count.saturating_sub(first_iteration),
            elapsed_s: self
                .clock
                .now()
                .saturating_duration_since(self.run.loop_start)
                .as_secs_f64(),
        });
        Ok(())
    }

    /// Execute exactly one iteration.
    ///
    /// Lets callers drive the loop themselves and change the rate or mode
    /// between iterations. Unlike [`start`](Self::start) this does not reset
    /// run state first.
    pub fn iterate<F>(
        &mut self,
        mut callback: F,
        stats_sink: Option<&mut (dyn FnMut(IterationStats) + '_)>,
    ) where
        F: FnMut(f64),
    {
        let result: Result<(), Infallible> = self.try_iterate(
            |dt| {
                callback(dt);
                Ok(())
            },
            stats_sink,
        );
        let Ok(()) = result;
    }

    /// Execute exactly one iteration with a fallible callback.
    ///
    /// # Errors
    ///
    /// Returns whatever `callback` returned; the iteration is then abandoned
    /// before its statistics are recorded.
    pub fn try_iterate<E, F>(
        &mut self,
        mut callback: F,
        stats_sink: Option<&mut (dyn FnMut(IterationStats) + '_)>,
    ) -> Result<(), E>
    where
        F: FnMut(f64) -> Result<(), E>,
    {
        // Re-read every pass so a rate set between iterations takes effect.
        let rate = self.rate;

        let now = self.clock.now();
        if !self.run.anchored {
            self.run.anchor(now);
        }
        let measured_period = now.saturating_duration_since(self.run.last_iteration_start);
        self.run.last_iteration_start = now;

        if let Err(e) = callback(measured_period.as_secs_f64()) {
            self.logger.emit(LoopEvent::RunAborted {
                iteration: self.iteration_count,
            });
            return Err(e);
        }

        let next_wake = self
            .config
            .is_rate_limited()
            .then(|| self.scheduled_wake(rate, self.run.periods_elapsed.saturating_add(1)));

        let stats = IterationStats::from_timing(
            self.run.loop_start,
            now,
            measured_period,
            rate.period(),
            next_wake,
        );
        if self.run.periods_elapsed == 0 {
            self.tracker.record_unsmoothed(stats);
        } else {
            self.tracker.record(stats);
        }
        self.logger.emit(LoopEvent::IterationCompleted {
            iteration: self.iteration_count,
            measured_period_s: stats.measured_period(),
            sleeping_until_s: stats.sleeping_until(),
        });

        if let Some(sink) = stats_sink {
            sink(self.tracker.average());
        }

        self.run.periods_elapsed = self.run.periods_elapsed.saturating_add(1);

        if let Some(wake) = next_wake {
            self.wait_for(wake);
        }

        self.iteration_count = self.iteration_count.saturating_add(1);
        Ok(())
    }

    /// `loop_start + period * periods`, saturating at the anchor on overflow
    #[expect(
        clippy::cast_precision_loss,
        reason = "period counts stay far below 2^52"
    )]
    fn scheduled_wake(&self, rate: TargetRate, periods: u64) -> Instant {
        let offset_s = rate.period_secs() * periods as f64;
        Duration::try_from_secs_f64(offset_s)
            .ok()
            .and_then(|offset| self.run.loop_start.checked_add(offset))
            .unwrap_or(self.run.loop_start)
    }

    fn wait_for(&mut self, wake: Instant) {
        let now = self.clock.now();
        if wake < now {
            self.overrun_count = self.overrun_count.saturating_add(1);
            self.logger.emit(LoopEvent::Overrun {
                iteration: self.iteration_count,
                late_by_s: now.saturating_duration_since(wake).as_secs_f64(),
            });
            return;
        }
        wait_until(&self.clock, self.config.wait_strategy, wake);
    }

    /// Discard the scheduling anchor and period counter.
    ///
    /// The next iteration becomes the new anchor: wake times are scheduled
    /// from its start. The iteration counter and statistics history are kept.
    pub fn reset(&mut self) {
        self.reset_with(ResetReason::Manual);
    }

    fn reset_with(&mut self, reason: ResetReason) {
        self.run = RunState::pending(self.clock.now());
        self.logger.emit(LoopEvent::RunStateReset { reason });
    }

    /// Change the target rate and reset run state
    ///
    /// The reset happens even if `target_rate_hz` equals the current rate.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidTargetRate`](crate::LoopError::InvalidTargetRate)
    /// and leaves the driver untouched if the rate is invalid.
    pub fn set_target_rate(&mut self, target_rate_hz: f64) -> LoopResult {
        self.rate = TargetRate::new(target_rate_hz)?;
        self.config.target_rate_hz = target_rate_hz;
        self.reset_with(ResetReason::TargetRateChanged);
        Ok(())
    }

    /// Change the operation mode and reset run state
    pub fn set_operation_mode(&mut self, operation_mode: OperationMode) {
        self.config.operation_mode = operation_mode;
        self.reset_with(ResetReason::OperationModeChanged);
    }

    /// Change the wait strategy and reset run state
    pub fn set_wait_strategy(&mut self, wait_strategy: WaitStrategy) {
        self.config.wait_strategy = wait_strategy;
        self.reset_with(ResetReason::WaitStrategyChanged);
    }

    /// Enable or disable pacing and reset run state
    pub fn set_rate_limiter_enabled(&mut self, enabled: bool) {
        self.config.rate_limiter_enabled = enabled;
        self.reset_with(ResetReason::RateLimiterToggled);
    }

    /// Switch diagnostic logging on or off. Does not touch run state.
    pub fn set_log_mode(&mut self, log_mode: LogMode) {
        self.config.log_mode = log_mode;
        self.logger.set_mode(log_mode);
    }

    /// Requested iterations per second
    #[inline]
    pub fn target_rate_hz(&self) -> f64 {
        self.rate.hz()
    }

    /// Requested time between iteration starts
    #[inline]
    pub fn period(&self) -> Duration {
        self.rate.period()
    }

    /// Current operation mode
    #[inline]
    pub fn operation_mode(&self) -> OperationMode {
        self.config.operation_mode
    }

    /// Current wait strategy
    #[inline]
    pub fn wait_strategy(&self) -> WaitStrategy {
        self.config.wait_strategy
    }

    /// Whether iterations are currently followed by a wait
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        self.config.is_rate_limited()
    }

    /// Iterations executed over the driver's lifetime
    #[inline]
    pub fn iteration_count(&self) -> u64 {
        self.iteration_count
    }

    /// Iterations completed since the last run-state reset
    #[inline]
    pub fn periods_elapsed(&self) -> u64 {
        self.run.periods_elapsed
    }

    /// Paced iterations that found their wake time already past
    #[inline]
    pub fn overrun_count(&self) -> u64 {
        self.overrun_count
    }

    /// Mean of the recorded history; all zero when nothing is recorded yet
    pub fn get_average_loop_stats(&self) -> IterationStats {
        self.tracker.average()
    }

    /// Smoothed instantaneous frequency
    pub fn average_frequency_hz(&self) -> f64 {
        self.tracker.average_frequency_hz()
    }

    /// The statistics tracker
    pub fn stats(&self) -> &IterationStatsTracker {
        &self.tracker
    }

    /// Drop all recorded statistics
    pub fn clear_stats(&mut self) {
        self.tracker.clear();
    }

    /// Current configuration
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// The injected logger
    pub fn logger(&self) -> &LoopLogger {
        &self.logger
    }

    /// The injected clock
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// Call `func` at `target_rate_hz` until `should_stop` returns true.
///
/// Shorthand for a sleeping [`FixedFrequencyLoop`] when the callback does not
/// need the measured period. Blocks the calling thread.
///
/// # Errors
///
/// Returns [`LoopError::InvalidTargetRate`](crate::LoopError::InvalidTargetRate)
/// before calling `func` if the rate is invalid.
pub fn run_at_rate<F, P>(target_rate_hz: f64, mut func: F, should_stop: P) -> LoopResult
where
    F: FnMut(),
    P: FnMut() -> bool,
{
    let mut driver = FixedFrequencyLoop::new(target_rate_hz)?;
    driver.start(|_dt| func(), should_stop);
    Ok(())
}

/// Builder for [`FixedFrequencyLoop`].
///
/// The clock and logger are injected here; everything else comes from a
/// [`LoopConfig`]. The config's `log_mode` is applied to the logger.
///
/// ```
/// use fixedloop_scheduler::{FixedFrequencyLoop, ManualClock, OperationMode};
/// use fixedloop_tracing::{LoopLogger, MemorySink};
///
/// let sink = MemorySink::new();
/// let driver = FixedFrequencyLoop::builder()
///     .target_rate_hz(30.0)
///     .operation_mode(OperationMode::AsFastAsPossible)
///     .history_capacity(64)
///     .logger(LoopLogger::with_sink("sim", sink.clone()))
///     .clock(ManualClock::new())
///     .build()?;
///
/// assert!(!driver.is_rate_limited());
/// assert_eq!(driver.stats().capacity(), 64);
/// # Ok::<(), fixedloop_scheduler::LoopError>(())
/// ```
#[derive(Debug)]
pub struct LoopBuilder<C: Clock = SystemClock> {
    config: LoopConfig,
    logger: Option<LoopLogger>,
    clock: C,
}

impl LoopBuilder<SystemClock> {
    /// Builder with default configuration and the system clock
    pub fn new() -> Self {
        Self {
            config: LoopConfig::default(),
            logger: None,
            clock: SystemClock,
        }
    }
}

impl Default for LoopBuilder<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LoopBuilder<C> {
    /// Replace the whole configuration
    pub fn config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the target rate
    pub fn target_rate_hz(mut self, target_rate_hz: f64) -> Self {
        self.config.target_rate_hz = target_rate_hz;
        self
    }

    /// Set the operation mode
    pub fn operation_mode(mut self, operation_mode: OperationMode) -> Self {
        self.config.operation_mode = operation_mode;
        self
    }

    /// Set the wait strategy
    pub fn wait_strategy(mut self, wait_strategy: WaitStrategy) -> Self {
        self.config.wait_strategy = wait_strategy;
        self
    }

    /// Enable or disable pacing
    pub fn rate_limiter_enabled(mut self, enabled: bool) -> Self {
        self.config.rate_limiter_enabled = enabled;
        self
    }

    /// Set the statistics history capacity
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// Set the smoothed-frequency window
    pub fn frequency_window(mut self, window: usize) -> Self {
        self.config.frequency_window = window;
        self
    }

    /// Set the log mode
    pub fn log_mode(mut self, log_mode: LogMode) -> Self {
        self.config.log_mode = log_mode;
        self
    }

    /// Inject a logger (default: `tracing` under the default section)
    pub fn logger(mut self, logger: LoopLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Inject a clock
    pub fn clock<C2: Clock>(self, clock: C2) -> LoopBuilder<C2> {
        LoopBuilder {
            config: self.config,
            logger: self.logger,
            clock,
        }
    }

    /// Validate and build
    ///
    /// # Errors
    ///
    /// Returns the first invalid field reported by [`LoopConfig::validate`].
    pub fn build(self) -> LoopResult<FixedFrequencyLoop<C>> {
        self.config.validate()?;
        let rate = TargetRate::new(self.config.target_rate_hz)?;
        let tracker =
            IterationStatsTracker::new(self.config.history_capacity, self.config.frequency_window)?;

        let mut logger = self.logger.unwrap_or_default();
        logger.set_mode(self.config.log_mode);

        let run = RunState::pending(self.clock.now());
        Ok(FixedFrequencyLoop {
            config: self.config,
            rate,
            run,
            iteration_count: 0,
            overrun_count: 0,
            tracker,
            logger,
            clock: self.clock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::LoopError;
    use fixedloop_tracing::MemorySink;

    const TOLERANCE: Duration = Duration::from_micros(1);

    fn paced(hz: f64, clock: &ManualClock) -> LoopResult<FixedFrequencyLoop<ManualClock>> {
        FixedFrequencyLoop::builder()
            .target_rate_hz(hz)
            .logger(LoopLogger::with_sink("test", MemorySink::new()))
            .clock(clock.clone())
            .build()
    }

    fn stop_after(n: u64) -> impl FnMut() -> bool {
        let mut remaining = n;
        move || {
            if remaining == 0 {
                return true;
            }
            remaining -= 1;
            false
        }
    }

    fn assert_near(actual: Duration, expected: Duration) {
        assert!(actual.abs_diff(expected) <= TOLERANCE, "expected {expected:?}, got {actual:?}");
    }

    #[test]
    fn test_wake_times_do_not_drift() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(100.0, &clock)?;
        let costs_ms = [1_u64, 9, 4, 7, 2];
        let mut index = 0;

        driver.start(
            |_dt| {
                let cost = costs_ms.get(index).copied().unwrap_or(0);
                clock.advance(Duration::from_millis(cost));
                index += 1;
            },
            stop_after(5),
        );

        assert_near(clock.elapsed(), Duration::from_millis(50));
        assert_eq!(driver.iteration_count(), 5);
        assert_eq!(driver.periods_elapsed(), 5);
        assert_eq!(driver.overrun_count(), 0);
        assert_eq!(clock.sleep_count(), 5);
        Ok(())
    }

    #[test]
    fn test_overrun_continues_without_waiting() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(100.0, &clock)?;
        let mut first = true;

        driver.start(
            |_dt| {
                if first {
                    clock.advance(Duration::from_millis(25));
                    first = false;
                }
            },
            stop_after(4),
        );

        // Wakes at 10 and 20 ms were already past; 30 and 40 ms were slept to.
        assert_eq!(driver.overrun_count(), 2);
        assert_eq!(clock.sleep_count(), 2);
        assert_near(clock.elapsed(), Duration::from_millis(40));
        Ok(())
    }

    #[test]
    fn test_measured_period_is_passed_to_callback() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(50.0, &clock)?;
        let mut seen = Vec::new();

        driver.start(|dt| seen.push(dt), stop_after(3));

        assert_eq!(seen.len(), 3);
        assert!(seen.first().is_some_and(|dt| dt.abs() < 1e-6));
        for dt in seen.iter().skip(1) {
            assert!((dt - 0.02).abs() < 1e-6, "dt = {dt}");
        }
        Ok(())
    }

    #[test]
    fn test_as_fast_as_possible_never_waits() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(10.0, &clock)?;
        driver.set_operation_mode(OperationMode::AsFastAsPossible);

        driver.start(|_dt| {}, stop_after(50));

        assert_eq!(driver.iteration_count(), 50);
        assert_eq!(clock.sleep_count(), 0);
        assert_eq!(clock.yield_count(), 0);
        assert_eq!(clock.elapsed(), Duration::ZERO);
        let latest = driver.stats().latest().copied().unwrap_or_default();
        assert!((latest.sleeping_until() - latest.time_at_start_of_iteration()).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_disabled_rate_limiter_never_waits() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(10.0, &clock)?;
        driver.set_rate_limiter_enabled(false);
        assert!(!driver.is_rate_limited());

        driver.start(|_dt| {}, stop_after(20));

        assert_eq!(driver.iteration_count(), 20);
        assert_eq!(clock.elapsed(), Duration::ZERO);
        Ok(())
    }

    #[test]
    fn test_busy_wait_spins_instead_of_sleeping() -> LoopResult {
        let clock = ManualClock::with_yield_step(Duration::from_micros(100));
        let mut driver = paced(100.0, &clock)?;
        driver.set_wait_strategy(WaitStrategy::BusyWait);

        driver.start(|_dt| {}, stop_after(1));

        assert_eq!(clock.sleep_count(), 0);
        assert!(clock.yield_count() >= 99);
        assert!(clock.elapsed() >= Duration::from_millis(10));
        Ok(())
    }

    #[test]
    fn test_hybrid_sleeps_then_spins() -> LoopResult {
        let clock = ManualClock::with_yield_step(Duration::from_micros(10));
        let mut driver = paced(100.0, &clock)?;
        driver.set_wait_strategy(WaitStrategy::Hybrid { spin_window_us: 200 });

        driver.start(|_dt| {}, stop_after(1));

        assert_eq!(clock.sleep_count(), 1);
        assert!((19..=21).contains(&clock.yield_count()));
        Ok(())
    }

    #[test]
    fn test_setters_reset_even_when_unchanged() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(100.0, &clock)?;
        driver.iterate(|_dt| {}, None);
        driver.iterate(|_dt| {}, None);
        assert_eq!(driver.periods_elapsed(), 2);

        driver.set_target_rate(100.0)?;
        assert_eq!(driver.periods_elapsed(), 0);

        driver.iterate(|_dt| {}, None);
        driver.set_operation_mode(OperationMode::FixedFrequency);
        assert_eq!(driver.periods_elapsed(), 0);

        driver.iterate(|_dt| {}, None);
        driver.set_wait_strategy(WaitStrategy::Sleep);
        assert_eq!(driver.periods_elapsed(), 0);

        driver.iterate(|_dt| {}, None);
        driver.set_rate_limiter_enabled(true);
        assert_eq!(driver.periods_elapsed(), 0);

        driver.iterate(|_dt| {}, None);
        driver.reset();
        assert_eq!(driver.periods_elapsed(), 0);

        assert_eq!(driver.iteration_count(), 6);
        assert_eq!(driver.stats().len(), 6);
        Ok(())
    }

    #[test]
    fn test_rate_change_reanchors_schedule() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(100.0, &clock)?;
        driver.iterate(|_dt| {}, None);
        driver.iterate(|_dt| {}, None);
        assert_near(clock.elapsed(), Duration::from_millis(20));

        driver.set_target_rate(50.0)?;
        assert_eq!(driver.period(), Duration::from_millis(20));
        driver.iterate(|_dt| {}, None);

        assert_near(clock.elapsed(), Duration::from_millis(40));
        let latest = driver.stats().latest().copied().unwrap_or_default();
        assert!((latest.requested_period() - 0.02).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_invalid_rate_leaves_driver_untouched() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(100.0, &clock)?;
        driver.iterate(|_dt| {}, None);

        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = driver.set_target_rate(bad);
            assert!(matches!(err, Err(LoopError::InvalidTargetRate(_))));
        }

        assert_eq!(driver.period(), Duration::from_millis(10));
        assert_eq!(driver.periods_elapsed(), 1);
        Ok(())
    }

    #[test]
    fn test_try_start_propagates_error_without_recording() -> LoopResult {
        let clock = ManualClock::new();
        let sink = MemorySink::new();
        let mut driver = FixedFrequencyLoop::builder()
            .target_rate_hz(100.0)
            .logger(LoopLogger::with_sink("test", sink.clone()))
            .clock(clock.clone())
            .build()?;
        let mut calls = 0_u32;

        let result = driver.try_start(
            |_dt| {
                calls += 1;
                if calls == 3 { Err("sensor offline") } else { Ok(()) }
            },
            || false,
            None,
        );

        assert_eq!(result, Err("sensor offline"));
        assert_eq!(driver.iteration_count(), 2);
        assert_eq!(driver.stats().len(), 2);
        assert_eq!(sink.count("run_aborted"), 1);
        assert_eq!(sink.count("run_finished"), 0);
        Ok(())
    }

    #[test]
    fn test_stats_sink_sees_running_average() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(100.0, &clock)?;
        let mut delivered = Vec::new();

        driver.start_with_stats(|_dt| {}, stop_after(4), |avg| delivered.push(avg));

        assert_eq!(delivered.len(), 4);
        let last = delivered.last().copied().unwrap_or_default();
        let expected = driver.get_average_loop_stats();
        assert!((last.measured_period() - expected.measured_period()).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_events_reach_logger() -> LoopResult {
        let clock = ManualClock::new();
        let sink = MemorySink::new();
        let mut driver = FixedFrequencyLoop::builder()
            .target_rate_hz(100.0)
            .logger(LoopLogger::with_sink("physics", sink.clone()))
            .clock(clock.clone())
            .build()?;

        driver.start(|_dt| {}, stop_after(3));

        assert_eq!(sink.count("run_state_reset"), 1);
        assert_eq!(sink.count("run_started"), 1);
        assert_eq!(sink.count("iteration_completed"), 3);
        assert_eq!(sink.count("run_finished"), 1);
        assert!(sink.lines().iter().all(|line| line.starts_with("[physics] ")));
        assert_eq!(driver.logger().metrics().events_emitted, 6);
        Ok(())
    }

    #[test]
    fn test_log_mode_disabled_silences_logger() -> LoopResult {
        let clock = ManualClock::new();
        let sink = MemorySink::new();
        let mut driver = FixedFrequencyLoop::builder()
            .log_mode(LogMode::Disabled)
            .logger(LoopLogger::with_sink("quiet", sink.clone()))
            .clock(clock.clone())
            .build()?;

        driver.start(|_dt| {}, stop_after(2));
        assert!(sink.is_empty());

        driver.set_log_mode(LogMode::Enabled);
        driver.reset();
        assert_eq!(sink.count("run_state_reset"), 1);
        Ok(())
    }

    #[test]
    fn test_builder_validates() {
        let clock = ManualClock::new();
        let err = FixedFrequencyLoop::builder()
            .history_capacity(0)
            .clock(clock.clone())
            .build();
        assert!(matches!(err, Err(LoopError::InvalidHistoryCapacity(0))));

        let err = FixedFrequencyLoop::builder().frequency_window(0).build();
        assert!(matches!(err, Err(LoopError::InvalidAverageWindow(0))));

        assert!(matches!(
            FixedFrequencyLoop::new(-1.0),
            Err(LoopError::InvalidTargetRate(_))
        ));
    }

    #[test]
    fn test_try_start_reborrows_stats_sink_every_iteration() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(100.0, &clock)?;
        let mut delivered = 0_u32;
        let mut sink = |_avg: IterationStats| delivered += 1;

        let result: Result<(), Infallible> =
            driver.try_start(|_dt| Ok(()), stop_after(5), Some(&mut sink));

        assert_eq!(result, Ok(()));
        assert_eq!(delivered, 5);
        assert_eq!(driver.stats().len(), 5);
        Ok(())
    }

    #[test]
    fn test_idle_time_before_first_iteration_is_not_a_backlog() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(100.0, &clock)?;
        clock.advance(Duration::from_secs(1));

        for _ in 0..5 {
            driver.iterate(|_dt| {}, None);
        }

        assert_eq!(clock.sleep_count(), 5);
        assert_eq!(driver.overrun_count(), 0);
        assert_near(clock.elapsed(), Duration::from_millis(1050));
        let first = driver.stats().history().next().copied().unwrap_or_default();
        assert!(first.measured_period().abs() < 1e-12);
        assert!(first.time_at_start_of_iteration().abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_idle_time_after_setter_is_not_a_backlog() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(100.0, &clock)?;
        driver.iterate(|_dt| {}, None);

        driver.set_target_rate(100.0)?;
        clock.advance(Duration::from_millis(500));
        let sleeps_before = clock.sleep_count();
        for _ in 0..5 {
            driver.iterate(|_dt| {}, None);
        }

        assert_eq!(driver.overrun_count(), 0);
        assert_eq!(clock.sleep_count() - sleeps_before, 5);
        Ok(())
    }

    #[test]
    fn test_smoothed_frequency_ignores_run_anchor() -> LoopResult {
        let clock = ManualClock::new();
        let mut driver = paced(100.0, &clock)?;
        clock.advance(Duration::from_micros(3));

        driver.start(|_dt| clock.advance(Duration::from_micros(3)), stop_after(20));

        assert_eq!(driver.stats().len(), 20);
        let smoothed = driver.average_frequency_hz();
        assert!((smoothed - 100.0).abs() < 1e-3, "smoothed {smoothed}");
        Ok(())
    }

    #[test]
    fn test_run_at_rate_rejects_bad_rate() {
        let mut called = false;
        let result = run_at_rate(0.0, || called = true, || false);
        assert!(matches!(result, Err(LoopError::InvalidTargetRate(_))));
        assert!(!called);
    }

    #[test]
    fn test_run_at_rate_stops() -> LoopResult {
        let mut remaining = 3_u32;
        let mut calls = 0_u32;
        run_at_rate(
            1000.0,
            || calls += 1,
            move || {
                let done = remaining == 0;
                remaining = remaining.saturating_sub(1);
                done
            },
        )?;
        assert_eq!(calls, 3);
        Ok(())
    }

    #[test]
    fn test_defaults() -> LoopResult {
        let driver = FixedFrequencyLoop::from_config(LoopConfig::default())?;
        assert!((driver.target_rate_hz() - crate::DEFAULT_TARGET_RATE_HZ).abs() < f64::EPSILON);
        assert_eq!(driver.operation_mode(), OperationMode::FixedFrequency);
        assert_eq!(driver.wait_strategy(), WaitStrategy::Sleep);
        assert!(driver.is_rate_limited());
        assert_eq!(driver.stats().capacity(), crate::DEFAULT_HISTORY_CAPACITY);
        assert!(driver.get_average_loop_stats().is_empty());
        Ok(())
    }
}
