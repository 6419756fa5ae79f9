use llhist::{LogLinearHistogram, SketchError};
use snafu::ResultExt as _;

use super::{ingest_parallel, slice_all, Histogram, HistogramError, Sketch};
use crate::dataset::Dataset;

/// A histogram with log-linear bins that needs no range up front.
///
/// Each power of ten is split into 90 linear bins, preserving two significant figures. Bins only exist once a value
/// lands in them, and scratch histograms merge exactly regardless of the order they are merged in.
#[derive(Clone, Debug, Default)]
pub struct LogLinearBucketed {
    merged: LogLinearHistogram,
}

impl LogLinearBucketed {
    /// Creates an empty `LogLinearBucketed` histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the underlying log-linear histogram.
    pub fn inner(&self) -> &LogLinearHistogram {
        &self.merged
    }
}

impl Histogram for LogLinearBucketed {
    fn name(&self) -> &'static str {
        "LogLinear"
    }

    fn significant_figures(&self) -> Option<u8> {
        Some(self.merged.significant_figures())
    }

    fn used_memory(&self) -> usize {
        self.merged.used_bytes()
    }

    fn reset(&mut self) {
        self.merged.clear();
    }

    fn record_range(&mut self, datasets: &[Dataset], start: usize, stop: usize) -> Result<(), HistogramError> {
        let slices = slice_all(datasets, start, stop)?;
        let scratch = ingest_parallel(&slices, |_, values| {
            let mut hist = LogLinearHistogram::new();
            hist.insert_many(values).context(Sketch)?;
            Ok(hist)
        })?;

        for hist in &scratch {
            self.merged.merge(hist);
        }

        Ok(())
    }

    fn quantiles(&mut self, quantiles: &[f64]) -> Result<Vec<f64>, HistogramError> {
        self.merged.quantiles(quantiles).map_err(|e| match e {
            SketchError::EmptyHistogram => HistogramError::EmptyHistogram,
            SketchError::QuantileOutOfBounds { quantile } => HistogramError::QuantileOutOfBounds { quantile },
            source => HistogramError::Sketch { source },
        })
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::ApproxEqRatio as _;

    use super::*;

    fn datasets() -> Vec<Dataset> {
        vec![
            Dataset::new("a", (1..=500).map(f64::from).collect(), 1.0, 500.0),
            Dataset::new("b", (1..=500).map(|v| f64::from(v) * 3.0).collect(), 3.0, 1500.0),
        ]
    }

    #[test]
    fn estimates_close_to_exact() {
        let datasets = datasets();
        let mut hist = LogLinearBucketed::new();
        hist.record_range(&datasets, 0, 250).unwrap();
        hist.record_range(&datasets, 250, 500).unwrap();

        let mut all = datasets.iter().flat_map(|ds| ds.values().to_vec()).collect::<Vec<_>>();
        all.sort_by(f64::total_cmp);

        for q in [0.1, 0.5, 0.7, 0.95, 0.99] {
            let exact = crate::stats::quantile(&all, q).unwrap().0;
            let estimate = hist.value_at_quantile(q).unwrap();
            assert!(estimate.approx_eq_ratio(&exact, 0.03), "q={} {} vs {}", q, estimate, exact);
        }
        assert_eq!(hist.significant_figures(), Some(2));
    }

    #[test]
    fn merge_order_does_not_matter() {
        let datasets = datasets();
        let swapped = vec![datasets[1].clone(), datasets[0].clone()];
        let grid = [0.0, 0.01, 0.5, 0.99, 1.0];

        let mut forward = LogLinearBucketed::new();
        forward.record_range(&datasets, 0, 100).unwrap();
        forward.record_range(&datasets, 100, 500).unwrap();

        let mut reverse = LogLinearBucketed::new();
        reverse.record_range(&swapped, 100, 500).unwrap();
        reverse.record_range(&swapped, 0, 100).unwrap();

        assert_eq!(forward.quantiles(&grid).unwrap(), reverse.quantiles(&grid).unwrap());
    }

    #[test]
    fn reset_matches_fresh_histogram() {
        let datasets = datasets();
        let grid = [0.0, 0.25, 0.5, 0.75, 1.0];

        let mut reused = LogLinearBucketed::new();
        reused.record_range(&datasets, 0, 500).unwrap();
        reused.reset();
        assert!(reused.inner().is_empty());
        reused.record_range(&datasets, 10, 20).unwrap();

        let mut fresh = LogLinearBucketed::new();
        fresh.record_range(&datasets, 10, 20).unwrap();

        assert_eq!(reused.quantiles(&grid).unwrap(), fresh.quantiles(&grid).unwrap());
    }

    #[test]
    fn unrepresentable_values_fail_the_whole_batch() {
        let mut datasets = datasets();
        datasets.push(Dataset::new("broken", vec![1.0; 499].into_iter().chain([f64::INFINITY]).collect(), 0.0, 1.0));

        let mut hist = LogLinearBucketed::new();
        hist.record_range(&datasets[..2], 0, 10).unwrap();
        let before = hist.quantiles(&[0.5]).unwrap();

        assert!(matches!(
            hist.record_range(&datasets, 0, 500),
            Err(HistogramError::Sketch { .. })
        ));
        assert_eq!(hist.inner().count(), 20);
        assert_eq!(hist.quantiles(&[0.5]).unwrap(), before);
    }

    #[test]
    fn query_errors() {
        let mut hist = LogLinearBucketed::new();
        assert!(matches!(hist.quantiles(&[0.5]), Err(HistogramError::EmptyHistogram)));

        hist.record_range(&datasets(), 0, 1).unwrap();
        assert!(matches!(
            hist.quantiles(&[-0.5]),
            Err(HistogramError::QuantileOutOfBounds { .. })
        ));
        assert!(matches!(hist.record_range(&datasets(), 0, 501), Err(HistogramError::RangeOutOfBounds { .. })));
    }
}
