//! Rolling average over a fixed window of samples.

use std::num::NonZeroUsize;

use crate::error::{LoopError, LoopResult};

/// Simple moving average over the last `window` samples.
///
/// Backed by a ring buffer allocated once at construction; adding a sample
/// never allocates. Non-finite samples (such as the infinite frequency of a
/// zero-length period) are ignored rather than poisoning the average.
///
/// ```
/// use fixedloop_scheduler::MovingAverage;
///
/// let mut fps = MovingAverage::new(3)?;
/// for sample in [10.0, 20.0, 30.0, 40.0] {
///     fps.add_sample(sample);
/// }
/// assert_eq!(fps.average(), 30.0);
/// # Ok::<(), fixedloop_scheduler::LoopError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MovingAverage {
    samples: Vec<f64>,
    window: usize,
    next_index: usize,
}

impl MovingAverage {
    /// Create an empty average over `window` samples
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidAverageWindow`] if `window` is zero or
    /// above [`MAX_FREQUENCY_WINDOW`](crate::MAX_FREQUENCY_WINDOW).
    pub fn new(window: usize) -> LoopResult<Self> {
        NonZeroUsize::new(window)
            .filter(|w| w.get() <= crate::MAX_FREQUENCY_WINDOW)
            .map(Self::with_window)
            .ok_or(LoopError::InvalidAverageWindow(window))
    }

    /// Callers guarantee `window <= MAX_FREQUENCY_WINDOW`.
    pub(crate) fn with_window(window: NonZeroUsize) -> Self {
        let window = window.get();
        Self {
            samples: Vec::with_capacity(window),
            window,
            next_index: 0,
        }
    }

    /// Add a sample, evicting the oldest one when the window is full
    pub fn add_sample(&mut self, sample: f64) {
        if !sample.is_finite() {
            return;
        }

        if self.samples.len() < self.window {
            self.samples.push(sample);
        } else if let Some(slot) = self.samples.get_mut(self.next_index) {
            *slot = sample;
        }
        self.next_index = (self.next_index + 1) % self.window;
    }

    /// Mean of the samples currently in the window, or 0.0 if there are none
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if no samples have been added
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Check if the window is saturated
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.window
    }

    /// Maximum number of samples averaged
    pub fn window(&self) -> usize {
        self.window
    }

    /// Drop all samples
    pub fn reset(&mut self) {
        self.samples.clear();
        self.next_index = 0;
    }
}
