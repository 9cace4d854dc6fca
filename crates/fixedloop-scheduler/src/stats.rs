//! Per-iteration statistics and the bounded history they are aggregated over.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::average::MovingAverage;
use crate::error::{LoopError, LoopResult};

/// Timing record for one loop iteration.
///
/// All times are in seconds. Absolute times (`time_at_start_of_iteration`,
/// `sleeping_until`) are relative to the start of the run.
///
/// The frequency and the period delta are derived from the periods when the
/// record is built, so `measured_frequency_hz == 1 / measured_period` always
/// holds for per-iteration records. The all-zero [`Default`] value means
/// "no data yet", not "0 Hz".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IterationStats {
    time_at_start_of_iteration: f64,
    measured_period: f64,
    measured_frequency_hz: f64,
    requested_period: f64,
    measured_period_delta_wrt_requested_period: f64,
    sleeping_until: f64,
}

impl IterationStats {
    /// Build a record, deriving frequency and delta
    pub fn new(
        time_at_start_of_iteration: f64,
        measured_period: f64,
        requested_period: f64,
        sleeping_until: f64,
    ) -> Self {
        Self {
            time_at_start_of_iteration,
            measured_period,
            measured_frequency_hz: measured_period.recip(),
            requested_period,
            measured_period_delta_wrt_requested_period: measured_period - requested_period,
            sleeping_until,
        }
    }

    /// Build a record from the driver's instants.
    ///
    /// `next_wake` is `None` when the driver is not pacing; the record then
    /// reports that it intends to continue at the iteration's own start.
    pub fn from_timing(
        loop_start: Instant,
        iteration_start: Instant,
        measured_period: Duration,
        requested_period: Duration,
        next_wake: Option<Instant>,
    ) -> Self {
        let time_at_start = iteration_start
            .saturating_duration_since(loop_start)
            .as_secs_f64();
        let sleeping_until = next_wake.map_or(time_at_start, |wake| {
            wake.saturating_duration_since(loop_start).as_secs_f64()
        });

        Self::new(
            time_at_start,
            measured_period.as_secs_f64(),
            requested_period.as_secs_f64(),
            sleeping_until,
        )
    }

    /// Start of this iteration, seconds since the run started
    #[inline]
    pub fn time_at_start_of_iteration(&self) -> f64 {
        self.time_at_start_of_iteration
    }

    /// Wall time since the previous iteration started
    #[inline]
    pub fn measured_period(&self) -> f64 {
        self.measured_period
    }

    /// `1 / measured_period`
    #[inline]
    pub fn measured_frequency_hz(&self) -> f64 {
        self.measured_frequency_hz
    }

    /// `1 / target_rate_hz` at the time of this iteration
    #[inline]
    pub fn requested_period(&self) -> f64 {
        self.requested_period
    }

    /// Signed jitter: measured minus requested period
    #[inline]
    pub fn measured_period_delta_wrt_requested_period(&self) -> f64 {
        self.measured_period_delta_wrt_requested_period
    }

    /// Time the driver intends to wake at, seconds since the run started
    #[inline]
    pub fn sleeping_until(&self) -> f64 {
        self.sleeping_until
    }

    /// Check if this is the all-zero "no data" record
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Bounded history of [`IterationStats`] with on-demand aggregation.
///
/// Once `capacity` records are held, each new record evicts the oldest, so
/// [`average`](Self::average) is a sliding-window mean over the most recent
/// iterations. A separate [`MovingAverage`] smooths instantaneous frequency
/// for display.
#[derive(Debug, Clone)]
pub struct IterationStatsTracker {
    history: VecDeque<IterationStats>,
    capacity: usize,
    frequency: MovingAverage,
}

impl IterationStatsTracker {
    /// Create a tracker holding up to `capacity` records
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` or `frequency_window` is zero or above
    /// its maximum ([`MAX_HISTORY_CAPACITY`](crate::MAX_HISTORY_CAPACITY),
    /// [`MAX_FREQUENCY_WINDOW`](crate::MAX_FREQUENCY_WINDOW)).
    pub fn new(capacity: usize, frequency_window: usize) -> LoopResult<Self> {
        if !(1..=crate::MAX_HISTORY_CAPACITY).contains(&capacity) {
            return Err(LoopError::InvalidHistoryCapacity(capacity));
        }
        Ok(Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            frequency: MovingAverage::new(frequency_window)?,
        })
    }

    /// Tracker with the crate's default capacity and window
    pub fn with_defaults() -> Self {
        Self {
            history: VecDeque::with_capacity(crate::DEFAULT_HISTORY_CAPACITY),
            capacity: crate::DEFAULT_HISTORY_CAPACITY,
            frequency: Self::default_frequency_average(),
        }
    }

    fn default_frequency_average() -> MovingAverage {
        let window =
            NonZeroUsize::new(crate::DEFAULT_FREQUENCY_WINDOW).unwrap_or(NonZeroUsize::MIN);
        MovingAverage::with_window(window)
    }

    /// Push a record, evicting the oldest when at capacity
    pub fn record(&mut self, stats: IterationStats) {
        self.push(stats);
        self.frequency.add_sample(stats.measured_frequency_hz());
    }

    /// Push a record without feeding the smoothed frequency.
    ///
    /// Used for the first iteration of a run, whose period is measured
    /// against the run anchor rather than a previous iteration. Its
    /// near-zero period would otherwise dominate the smoothed value.
    pub fn record_unsmoothed(&mut self, stats: IterationStats) {
        self.push(stats);
    }

    fn push(&mut self, stats: IterationStats) {
        if self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(stats);
    }

    /// Mean of every field across the history.
    ///
    /// The aggregate's frequency is `1 / mean(measured_period)` rather than
    /// the mean of per-iteration frequencies, which tiny periods would skew.
    /// An empty history yields the all-zero record.
    pub fn average(&self) -> IterationStats {
        if self.history.is_empty() {
            return IterationStats::default();
        }

        let mut sum = IterationStats::default();
        for s in &self.history {
            sum.time_at_start_of_iteration += s.time_at_start_of_iteration;
            sum.measured_period += s.measured_period;
            sum.requested_period += s.requested_period;
            sum.measured_period_delta_wrt_requested_period +=
                s.measured_period_delta_wrt_requested_period;
            sum.sleeping_until += s.sleeping_until;
        }

        let n = self.history.len() as f64;
        let mean_period = sum.measured_period / n;
        IterationStats {
            time_at_start_of_iteration: sum.time_at_start_of_iteration / n,
            measured_period: mean_period,
            measured_frequency_hz: mean_period.recip(),
            requested_period: sum.requested_period / n,
            measured_period_delta_wrt_requested_period: sum
                .measured_period_delta_wrt_requested_period
                / n,
            sleeping_until: sum.sleeping_until / n,
        }
    }

    /// Smoothed instantaneous frequency over the recent window
    pub fn average_frequency_hz(&self) -> f64 {
        self.frequency.average()
    }

    /// Most recent record
    pub fn latest(&self) -> Option<&IterationStats> {
        self.history.back()
    }

    /// Records from oldest to newest
    pub fn history(&self) -> impl ExactSizeIterator<Item = &IterationStats> + '_ {
        self.history.iter()
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Check if no records are held
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Maximum number of records held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every record and the smoothed frequency
    pub fn clear(&mut self) {
        self.history.clear();
        self.frequency.reset();
    }
}

impl Default for IterationStatsTracker {
    fn default() -> Self {
        Self::with_defaults()
    }
}
