use snafu::ensure;

use super::{ingest_parallel, slice_all, EmptyHistogram, Histogram, HistogramError, QuantileOutOfBounds};
use crate::{dataset::Dataset, stats};

/// A histogram that keeps every sample.
///
/// Quantiles are exact by construction: samples are sorted on the first query after a mutation, and every query is
/// served from the sorted buffer until the next mutation. This is the reference the approximate variants are measured
/// against.
#[derive(Clone, Debug, Default)]
pub struct ExactHistogram {
    samples: Vec<f64>,
    sorted: bool,
}

impl ExactHistogram {
    /// Creates an empty `ExactHistogram`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the rank of the sample that answers the given quantile.
    ///
    /// # Errors
    ///
    /// If the histogram is empty, or the quantile is not within `[0, 1]`, an error is returned.
    pub fn rank_at_quantile(&mut self, quantile: f64) -> Result<usize, HistogramError> {
        ensure!((0.0..=1.0).contains(&quantile), QuantileOutOfBounds { quantile });

        let sorted = self.sorted_samples();
        stats::quantile(sorted, quantile)
            .map(|(_, rank)| rank)
            .ok_or(HistogramError::EmptyHistogram)
    }

    fn sorted_samples(&mut self) -> &[f64] {
        if !self.sorted {
            stats::sort(&mut self.samples);
            self.sorted = true;
        }
        &self.samples
    }
}

impl Histogram for ExactHistogram {
    fn name(&self) -> &'static str {
        "Exact"
    }

    fn significant_figures(&self) -> Option<u8> {
        None
    }

    fn used_memory(&self) -> usize {
        std::mem::size_of_val(self.samples.as_slice())
    }

    fn reset(&mut self) {
        self.samples.clear();
        self.sorted = true;
    }

    fn record_range(&mut self, datasets: &[Dataset], start: usize, stop: usize) -> Result<(), HistogramError> {
        let slices = slice_all(datasets, start, stop)?;
        let batches = ingest_parallel(&slices, |_, values| Ok(values.to_vec()))?;

        for batch in batches {
            self.samples.extend_from_slice(&batch);
        }
        self.sorted = self.samples.is_empty();

        Ok(())
    }

    fn quantiles(&mut self, quantiles: &[f64]) -> Result<Vec<f64>, HistogramError> {
        if let Some(&quantile) = quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return QuantileOutOfBounds { quantile }.fail();
        }
        ensure!(!self.samples.is_empty(), EmptyHistogram);

        let sorted = self.sorted_samples();
        stats::quantiles(sorted, quantiles).ok_or(HistogramError::EmptyHistogram)
    }
}
