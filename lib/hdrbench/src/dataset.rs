//! Named value sequences and their summary statistics.

use crate::stats;

/// Fractions extracted per window when building a [`SignalEnvelope`]: median, minimum, maximum.
const ENVELOPE_FRACTIONS: [f64; 3] = [0.5, 0.0, 1.0];

/// A named sequence of samples.
///
/// Summary statistics are computed once at construction, and the declared value range is widened to cover the data,
/// so `lower_bound <= min <= max <= upper_bound` holds for every non-empty dataset. A dataset is never modified after
/// construction.
#[derive(Clone, Debug)]
pub struct Dataset {
    name: String,
    values: Vec<f64>,
    min: f64,
    max: f64,
    mean: f64,
    std_dev: f64,
    lower_bound: f64,
    upper_bound: f64,
}

impl Dataset {
    /// Creates a new `Dataset` from the given values and declared value range.
    ///
    /// If any value falls outside of `[lower_bound, upper_bound]`, the range is widened to include it. For an empty
    /// dataset, `min` is positive infinity and `max` is negative infinity.
    pub fn new<N>(name: N, values: Vec<f64>, lower_bound: f64, upper_bound: f64) -> Self
    where
        N: Into<String>,
    {
        let (mut lower_bound, mut upper_bound) = if lower_bound <= upper_bound {
            (lower_bound, upper_bound)
        } else {
            (upper_bound, lower_bound)
        };

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in &values {
            min = min.min(v);
            max = max.max(v);
        }

        if !values.is_empty() {
            lower_bound = lower_bound.min(min);
            upper_bound = upper_bound.max(max);
        }

        let mean = stats::mean(&values);
        let std_dev = stats::std_dev(&values, mean);

        Self {
            name: name.into(),
            values,
            min,
            max,
            mean,
            std_dev,
            lower_bound,
            upper_bound,
        }
    }

    /// Returns the name of this dataset.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all samples, in generation order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the samples in `[start, stop)`, or `None` if the range does not fit within this dataset.
    pub fn slice(&self, start: usize, stop: usize) -> Option<&[f64]> {
        if start <= stop {
            self.values.get(start..stop)
        } else {
            None
        }
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the dataset holds no samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the smallest sample.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Returns the largest sample.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Returns the mean of all samples.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Returns the sample standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Returns the lower bound of the declared value range.
    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    /// Returns the upper bound of the declared value range.
    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    /// Returns the sample at `idx` multiplied by `scale` and rounded to an integer.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    pub fn value_as_int(&self, idx: usize, scale: f64) -> i64 {
        stats::round_half_away(self.values[idx] * scale)
    }

    /// Returns the smallest sample multiplied by `scale` and rounded to an integer.
    pub fn min_as_int(&self, scale: f64) -> i64 {
        stats::round_half_away(self.min * scale)
    }

    /// Returns the largest sample multiplied by `scale` and rounded to an integer.
    pub fn max_as_int(&self, scale: f64) -> i64 {
        stats::round_half_away(self.max * scale)
    }

    /// Returns the mean multiplied by `scale` and rounded to an integer.
    pub fn mean_as_int(&self, scale: f64) -> i64 {
        stats::round_half_away(self.mean * scale)
    }

    /// Returns the memory used by the samples, in bytes.
    pub fn used_memory(&self) -> usize {
        std::mem::size_of_val(self.values.as_slice())
    }

    /// Returns the per-window median, minimum, and maximum of this dataset.
    ///
    /// # Panics
    ///
    /// Panics if `window_size` is zero.
    pub fn envelope(&self, window_size: usize) -> SignalEnvelope {
        let flattened = stats::downsample(&self.values, window_size, &ENVELOPE_FRACTIONS);

        let windows = flattened.len() / ENVELOPE_FRACTIONS.len();
        let mut envelope = SignalEnvelope {
            name: self.name.clone(),
            median: Vec::with_capacity(windows),
            min: Vec::with_capacity(windows),
            max: Vec::with_capacity(windows),
        };
        for window in flattened.chunks_exact(ENVELOPE_FRACTIONS.len()) {
            envelope.median.push(window[0]);
            envelope.min.push(window[1]);
            envelope.max.push(window[2]);
        }

        envelope
    }
}

/// Downsampled shape of a dataset, one entry per window.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalEnvelope {
    /// Name of the dataset.
    pub name: String,

    /// Median of each window.
    pub median: Vec<f64>,

    /// Minimum of each window.
    pub min: Vec<f64>,

    /// Maximum of each window.
    pub max: Vec<f64>,
}
