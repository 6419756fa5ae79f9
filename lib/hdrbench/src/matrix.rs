//! Per-iteration quantile error matrix.

use crate::stats;

/// Relative errors of every approximate histogram variant, per iteration.
///
/// Indexed by `[iteration][variant][quantile]`. Each `[iteration][variant]` slice holds the relative error of the
/// variant's estimate at every quantile of the grid versus the reference variant, sorted ascending so that percentiles
/// of the error can be read off directly.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantileErrorMatrix {
    reference: &'static str,
    variants: Vec<&'static str>,
    errors: Vec<Vec<Vec<f64>>>,
}

/// A named sequence of error percentiles, one value per iteration, in percent.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorSeries {
    /// Label of the percentile, such as `P99`.
    pub label: String,

    /// Value of the percentile at each iteration, in percent.
    pub values: Vec<f64>,
}

impl QuantileErrorMatrix {
    /// Creates an empty `QuantileErrorMatrix` for the given variants, measured against `reference`.
    pub fn new(reference: &'static str, variants: Vec<&'static str>) -> Self {
        Self {
            reference,
            variants,
            errors: Vec::new(),
        }
    }

    /// Appends the errors of one iteration, one vector per variant in variant order.
    ///
    /// Each vector is sorted before it is stored.
    ///
    /// # Panics
    ///
    /// Panics if the number of vectors does not match the number of variants.
    pub fn push_iteration(&mut self, mut errors: Vec<Vec<f64>>) {
        assert_eq!(
            errors.len(),
            self.variants.len(),
            "iteration must hold errors for every variant"
        );

        for variant_errors in &mut errors {
            stats::sort(variant_errors);
        }
        self.errors.push(errors);
    }

    /// Returns the name of the reference variant.
    pub fn reference(&self) -> &'static str {
        self.reference
    }

    /// Returns the names of the measured variants, in matrix order.
    pub fn variants(&self) -> &[&'static str] {
        &self.variants
    }

    /// Returns the number of recorded iterations.
    pub fn iterations(&self) -> usize {
        self.errors.len()
    }

    /// Returns the sorted errors of a variant at the given iteration.
    pub fn errors(&self, iteration: usize, variant: usize) -> Option<&[f64]> {
        self.errors
            .get(iteration)
            .and_then(|row| row.get(variant))
            .map(Vec::as_slice)
    }

    /// Returns the given percentiles of a variant's errors at the given iteration, as fractions.
    ///
    /// Returns `None` if the iteration or variant does not exist, or no errors were recorded for it.
    pub fn error_percentiles(&self, iteration: usize, variant: usize, fractions: &[f64]) -> Option<Vec<f64>> {
        self.errors(iteration, variant)
            .and_then(|errors| stats::quantiles(errors, fractions))
    }

    /// Returns one series per fraction, following the given percentile of a variant's errors across all iterations.
    ///
    /// Series values are in percent. Returns `None` if the variant does not exist.
    pub fn error_series(&self, variant: usize, fractions: &[f64]) -> Option<Vec<ErrorSeries>> {
        if variant >= self.variants.len() {
            return None;
        }

        let mut series = fractions
            .iter()
            .map(|&fraction| ErrorSeries {
                label: percentile_label(fraction),
                values: Vec::with_capacity(self.errors.len()),
            })
            .collect::<Vec<_>>();

        for iteration in 0..self.errors.len() {
            let percentiles = self
                .error_percentiles(iteration, variant, fractions)
                .unwrap_or_else(|| vec![0.0; fractions.len()]);
            for (s, value) in series.iter_mut().zip(percentiles) {
                s.values.push(value * 100.0);
            }
        }

        Some(series)
    }
}

/// Returns the label of a percentile given as a fraction, such as `P97` for `0.97`.
pub fn percentile_label(fraction: f64) -> String {
    format!("P{}", stats::round_half_away(fraction * 100.0))
}
