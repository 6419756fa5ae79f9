//! Histogram variants under comparison.
//!
//! Every variant implements [`Histogram`], which covers the full lifecycle the benchmark driver needs: recording
//! batches of samples from many datasets at once, answering quantile queries, reporting a memory footprint, and being
//! reset for reuse between iterations.
//!
//! Recording is fork-join: each dataset's slice is aggregated into its own scratch aggregator on a worker thread, and
//! the scratch aggregators are only merged into the running aggregate, in dataset order, once every worker has
//! succeeded. A failing batch leaves the running aggregate untouched.

use std::{num::NonZeroUsize, thread};

use snafu::Snafu;
use tracing::trace;

use crate::dataset::Dataset;

mod exact;
pub use self::exact::ExactHistogram;

mod fixed;
pub use self::fixed::FixedPrecisionHistogram;

mod log_linear;
pub use self::log_linear::LogLinearBucketed;

/// Histogram error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum HistogramError {
    /// The histogram could not be constructed with the given parameters.
    #[snafu(display("Invalid histogram configuration: {}", reason))]
    InvalidConfiguration {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// The requested sample range does not fit within a dataset.
    #[snafu(display(
        "Range [{}, {}) is out of bounds for dataset '{}' with {} samples.",
        start,
        stop,
        dataset,
        len
    ))]
    RangeOutOfBounds {
        /// Name of the offending dataset.
        dataset: String,

        /// Start of the requested range.
        start: usize,

        /// End of the requested range (exclusive).
        stop: usize,

        /// Number of samples in the dataset.
        len: usize,
    },

    /// A value cannot be represented by the histogram.
    #[snafu(display("Value {} from dataset '{}' cannot be represented.", value, dataset))]
    ValueOutOfRange {
        /// Name of the dataset holding the value.
        dataset: String,

        /// The value, after scaling.
        value: i64,
    },

    /// The underlying histogram rejected a value.
    #[snafu(display("Failed to record value {} from dataset '{}': {}", value, dataset, reason))]
    Record {
        /// Name of the dataset holding the value.
        dataset: String,

        /// The value, after scaling.
        value: u64,

        /// Error reported by the underlying histogram.
        reason: String,
    },

    /// Widening the trackable range would have dropped previously recorded samples.
    #[snafu(display("Dropped {} samples while widening the trackable range.", dropped))]
    LossyMerge {
        /// Number of samples lost.
        dropped: u64,
    },

    /// A scratch aggregator could not be merged into the running aggregate.
    #[snafu(display("Failed to merge histograms: {}", reason))]
    Merge {
        /// Error reported by the underlying histogram.
        reason: String,
    },

    /// Quantiles were requested from a histogram holding no samples.
    #[snafu(display("Cannot compute quantiles of an empty histogram."))]
    EmptyHistogram,

    /// A requested quantile was not within `[0, 1]`.
    #[snafu(display("Quantile {} is outside of [0, 1].", quantile))]
    QuantileOutOfBounds {
        /// The requested quantile.
        quantile: f64,
    },

    /// A recording worker panicked.
    #[snafu(display("Recording worker panicked."))]
    WorkerPanicked,

    /// The log-linear encoding rejected a value.
    #[snafu(display("Failed to record value into log-linear histogram: {}", source))]
    Sketch {
        /// Error source.
        source: llhist::SketchError,
    },
}

/// A mergeable aggregator of samples that can estimate quantiles.
pub trait Histogram: Send {
    /// Returns the display name of this histogram variant.
    fn name(&self) -> &'static str;

    /// Returns the precision of this histogram, in significant decimal figures, if it is an approximation.
    fn significant_figures(&self) -> Option<u8>;

    /// Returns an estimate of the memory currently used by this histogram, in bytes.
    fn used_memory(&self) -> usize;

    /// Removes all recorded samples.
    ///
    /// Afterwards, the histogram behaves as if it had just been constructed with the same configuration.
    fn reset(&mut self);

    /// Records the samples in `[start, stop)` of every dataset.
    ///
    /// # Errors
    ///
    /// If the range does not fit within every dataset, or any sample cannot be recorded, an error is returned and no
    /// sample from this call is recorded.
    fn record_range(&mut self, datasets: &[Dataset], start: usize, stop: usize) -> Result<(), HistogramError>;

    /// Returns an estimate of the value at each of the given quantiles, in the order requested.
    ///
    /// # Errors
    ///
    /// If the histogram is empty, or any quantile is not within `[0, 1]`, an error is returned.
    fn quantiles(&mut self, quantiles: &[f64]) -> Result<Vec<f64>, HistogramError>;

    /// Returns an estimate of the value at the given quantile.
    ///
    /// # Errors
    ///
    /// If the histogram is empty, or the quantile is not within `[0, 1]`, an error is returned.
    fn value_at_quantile(&mut self, quantile: f64) -> Result<f64, HistogramError> {
        self.quantiles(&[quantile]).map(|estimates| estimates[0])
    }
}

/// Returns the samples in `[start, stop)` of every dataset, in dataset order.
pub(crate) fn slice_all<'a>(
    datasets: &'a [Dataset], start: usize, stop: usize,
) -> Result<Vec<(&'a str, &'a [f64])>, HistogramError> {
    datasets
        .iter()
        .map(|ds| match ds.slice(start, stop) {
            Some(values) => Ok((ds.name(), values)),
            None => RangeOutOfBounds {
                dataset: ds.name(),
                start,
                stop,
                len: ds.len(),
            }
            .fail(),
        })
        .collect()
}

/// Aggregates every slice into its own scratch aggregator, in parallel.
///
/// Slices are split into contiguous chunks across at most as many workers as there is available parallelism. The
/// scratch aggregators are returned in the same order as `slices`. If any slice fails to aggregate, the first failure
/// in slice order is returned instead.
pub(crate) fn ingest_parallel<A, F>(slices: &[(&str, &[f64])], ingest: F) -> Result<Vec<A>, HistogramError>
where
    A: Send,
    F: Fn(&str, &[f64]) -> Result<A, HistogramError> + Sync,
{
    if slices.is_empty() {
        return Ok(Vec::new());
    }

    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(slices.len());
    let chunk_size = slices.len().div_ceil(workers);
    trace!(slices = slices.len(), workers, "Ingesting slices.");

    let ingest = &ingest;
    let chunks = thread::scope(|scope| {
        let handles = slices
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|&(name, values)| ingest(name, values))
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| HistogramError::WorkerPanicked))
            .collect::<Vec<_>>()
    });

    let mut aggregators = Vec::with_capacity(slices.len());
    for chunk in chunks {
        for result in chunk? {
            aggregators.push(result?);
        }
    }

    Ok(aggregators)
}
