use hdrhistogram::Histogram as Hdr;
use snafu::ensure;
use tracing::debug;

use super::{
    ingest_parallel, slice_all, EmptyHistogram, Histogram, HistogramError, InvalidConfiguration, LossyMerge, Merge,
    QuantileOutOfBounds, Record, ValueOutOfRange,
};
use crate::{dataset::Dataset, stats};

/// A histogram over integer-scaled values with a fixed number of significant figures.
///
/// Samples are multiplied by a scale factor and rounded to integers before being recorded into an HDR histogram. The
/// trackable range grows on demand: when a batch holds a value above the current highest trackable value, everything
/// recorded so far is migrated into a histogram covering the new maximum. A migration that would lose samples fails
/// the batch.
pub struct FixedPrecisionHistogram {
    merged: Hdr<u64>,

    // Empty histogram with the configured range, restored on reset if the range was widened.
    pristine: Hdr<u64>,

    scale: f64,
}

impl FixedPrecisionHistogram {
    /// Creates a new `FixedPrecisionHistogram`.
    ///
    /// Values are scaled by `scale` before being recorded, and the initial trackable range is
    /// `[lowest_discernible, highest_trackable]`, in scaled units.
    ///
    /// # Errors
    ///
    /// If `scale` is not a finite positive number, or the HDR histogram rejects the range or precision, an error is
    /// returned.
    pub fn new(
        lowest_discernible: u64, highest_trackable: u64, significant_figures: u8, scale: f64,
    ) -> Result<Self, HistogramError> {
        ensure!(
            scale.is_finite() && scale > 0.0,
            InvalidConfiguration {
                reason: format!("scale must be a finite positive number, got {}", scale),
            }
        );

        let merged = Hdr::new_with_bounds(lowest_discernible, highest_trackable, significant_figures).map_err(|e| {
            InvalidConfiguration {
                reason: format!("{:?}", e),
            }
            .build()
        })?;

        Ok(Self {
            pristine: merged.clone(),
            merged,
            scale,
        })
    }

    /// Returns the scale factor applied to samples before they are recorded.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Returns the lowest discernible value, in scaled units.
    pub fn lowest_discernible(&self) -> u64 {
        self.merged.low()
    }

    /// Returns the current highest trackable value, in scaled units.
    pub fn highest_trackable(&self) -> u64 {
        self.merged.high()
    }

    /// Returns the number of recorded samples.
    pub fn len(&self) -> u64 {
        self.merged.len()
    }

    /// Returns `true` if no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    fn widen(&mut self, highest_trackable: u64) -> Result<(), HistogramError> {
        let low = self.merged.low();
        let mut widened =
            Hdr::new_with_bounds(low, highest_trackable.max(low * 2), self.merged.sigfig()).map_err(|e| {
                InvalidConfiguration {
                    reason: format!("{:?}", e),
                }
                .build()
            })?;

        let recorded = self.merged.len();
        let added = widened.add(&self.merged);
        let dropped = recorded.saturating_sub(widened.len());
        ensure!(added.is_ok() && dropped == 0, LossyMerge { dropped });

        debug!(
            from = self.merged.high(),
            to = widened.high(),
            recorded,
            "Widened trackable range."
        );
        self.merged = widened;

        Ok(())
    }
}

impl Histogram for FixedPrecisionHistogram {
    fn name(&self) -> &'static str {
        "HDR"
    }

    fn significant_figures(&self) -> Option<u8> {
        Some(self.merged.sigfig())
    }

    fn used_memory(&self) -> usize {
        std::mem::size_of::<Hdr<u64>>() + self.merged.distinct_values() * std::mem::size_of::<u64>()
    }

    fn reset(&mut self) {
        if self.merged.high() == self.pristine.high() {
            self.merged.reset();
        } else {
            self.merged = self.pristine.clone();
        }
    }

    fn record_range(&mut self, datasets: &[Dataset], start: usize, stop: usize) -> Result<(), HistogramError> {
        let slices = slice_all(datasets, start, stop)?;

        let scale = self.scale;
        let max = datasets.iter().map(|ds| ds.max_as_int(scale)).max().unwrap_or(0);
        if max > 0 && max as u64 > self.merged.high() {
            self.widen(max as u64)?;
        }

        let template = Hdr::<u64>::new_from(&self.merged);
        let scratch = ingest_parallel(&slices, |dataset, values| {
            let mut hist = template.clone();
            for &v in values {
                let scaled = stats::round_half_away(v * scale);
                ensure!(scaled >= 0, ValueOutOfRange { dataset, value: scaled });

                let value = scaled as u64;
                hist.record(value).map_err(|e| {
                    Record {
                        dataset,
                        value,
                        reason: format!("{:?}", e),
                    }
                    .build()
                })?;
            }
            Ok(hist)
        })?;

        for hist in &scratch {
            self.merged.add(hist).map_err(|e| {
                Merge {
                    reason: format!("{:?}", e),
                }
                .build()
            })?;
        }

        Ok(())
    }

    fn quantiles(&mut self, quantiles: &[f64]) -> Result<Vec<f64>, HistogramError> {
        if let Some(&quantile) = quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return QuantileOutOfBounds { quantile }.fail();
        }
        ensure!(!self.merged.is_empty(), EmptyHistogram);

        Ok(quantiles
            .iter()
            .map(|&q| self.merged.value_at_quantile(q) as f64 / self.scale)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::ApproxEqRatio as _;

    use super::*;

    fn ramp(name: &str, from: u32, to: u32) -> Dataset {
        Dataset::new(name, (from..=to).map(f64::from).collect(), f64::from(from), f64::from(to))
    }

    #[test]
    fn records_and_estimates_quantiles() {
        let datasets = vec![ramp("low", 1, 50), ramp("high", 51, 100)];
        let mut hist = FixedPrecisionHistogram::new(1, 2000, 2, 10.0).unwrap();
        hist.record_range(&datasets, 0, 50).unwrap();

        assert_eq!(hist.len(), 100);
        assert_eq!(hist.significant_figures(), Some(2));

        let estimates = hist.quantiles(&[0.25, 0.5, 0.9]).unwrap();
        for (estimate, expected) in estimates.iter().zip([25.0, 50.0, 90.0]) {
            assert!(estimate.approx_eq_ratio(&expected, 0.05), "{} vs {}", estimate, expected);
        }
    }

    #[test]
    fn widens_range_without_losing_samples() {
        let datasets = vec![ramp("low", 1, 50), ramp("high", 51, 100)];
        let mut hist = FixedPrecisionHistogram::new(1, 100, 2, 10.0).unwrap();
        assert!(hist.highest_trackable() < 1000);

        hist.record_range(&datasets[..1], 0, 50).unwrap();
        hist.record_range(&datasets[1..], 0, 50).unwrap();

        assert!(hist.highest_trackable() >= 1000);
        assert_eq!(hist.len(), 100);
        assert!(hist.value_at_quantile(1.0).unwrap().approx_eq_ratio(&100.0, 0.02));
    }

    #[test]
    fn lossy_widening_keeps_recorded_samples() {
        let datasets = vec![ramp("a", 1, 500)];
        let mut hist = FixedPrecisionHistogram::new(1, 10_000, 2, 10.0).unwrap();
        hist.record_range(&datasets, 0, 500).unwrap();
        let configured = hist.highest_trackable();
        let before = hist.quantiles(&[0.5, 1.0]).unwrap();

        let err = hist.widen(10).unwrap_err();
        assert!(matches!(err, HistogramError::LossyMerge { dropped: 500 }));
        assert_eq!(hist.len(), 500);
        assert_eq!(hist.highest_trackable(), configured);
        assert_eq!(hist.quantiles(&[0.5, 1.0]).unwrap(), before);
    }

    #[test]
    fn reset_restores_configured_range() {
        let datasets = vec![ramp("a", 1, 500)];
        let mut reused = FixedPrecisionHistogram::new(1, 100, 2, 10.0).unwrap();
        let configured = reused.highest_trackable();

        reused.record_range(&datasets, 0, 500).unwrap();
        assert!(reused.highest_trackable() > configured);

        reused.reset();
        assert!(reused.is_empty());
        assert_eq!(reused.highest_trackable(), configured);

        reused.record_range(&datasets, 100, 200).unwrap();
        let mut fresh = FixedPrecisionHistogram::new(1, 100, 2, 10.0).unwrap();
        fresh.record_range(&datasets, 100, 200).unwrap();

        let grid = [0.0, 0.25, 0.5, 0.75, 1.0];
        assert_eq!(reused.quantiles(&grid).unwrap(), fresh.quantiles(&grid).unwrap());
        assert_eq!(reused.used_memory(), fresh.used_memory());
    }

    #[test]
    fn merge_order_does_not_matter() {
        let datasets = vec![ramp("a", 1, 300), ramp("b", 200, 499)];
        let grid = [0.01, 0.1, 0.5, 0.9, 0.99];

        let mut forward = FixedPrecisionHistogram::new(1, 10_000, 2, 10.0).unwrap();
        forward.record_range(&datasets, 0, 150).unwrap();
        forward.record_range(&datasets, 150, 300).unwrap();

        let mut reverse = FixedPrecisionHistogram::new(1, 10_000, 2, 10.0).unwrap();
        let swapped = vec![datasets[1].clone(), datasets[0].clone()];
        reverse.record_range(&swapped, 150, 300).unwrap();
        reverse.record_range(&swapped, 0, 150).unwrap();

        assert_eq!(forward.quantiles(&grid).unwrap(), reverse.quantiles(&grid).unwrap());
    }

    #[test]
    fn negative_values_fail_the_whole_batch() {
        let datasets = vec![
            ramp("fine", 1, 10),
            Dataset::new("negative", vec![1.0, 2.0, -3.0, 4.0], -3.0, 4.0),
        ];
        let mut hist = FixedPrecisionHistogram::new(1, 1000, 2, 10.0).unwrap();

        let err = hist.record_range(&datasets, 0, 4).unwrap_err();
        assert!(matches!(
            err,
            HistogramError::ValueOutOfRange { ref dataset, value: -30 } if dataset == "negative"
        ));
        assert!(hist.is_empty());
        assert!(matches!(hist.quantiles(&[0.5]), Err(HistogramError::EmptyHistogram)));
    }

    #[test]
    fn invalid_configuration() {
        assert!(FixedPrecisionHistogram::new(0, 1000, 2, 10.0).is_err());
        assert!(FixedPrecisionHistogram::new(10, 15, 2, 10.0).is_err());
        assert!(FixedPrecisionHistogram::new(1, 1000, 6, 10.0).is_err());
        assert!(FixedPrecisionHistogram::new(1, 1000, 2, 0.0).is_err());
        assert!(FixedPrecisionHistogram::new(1, 1000, 2, f64::NAN).is_err());
    }

    #[test]
    fn out_of_bounds_quantile() {
        let mut hist = FixedPrecisionHistogram::new(1, 1000, 2, 10.0).unwrap();
        hist.record_range(&[ramp("a", 1, 10)], 0, 10).unwrap();
        assert!(matches!(
            hist.quantiles(&[1.01]),
            Err(HistogramError::QuantileOutOfBounds { .. })
        ));
    }
}
