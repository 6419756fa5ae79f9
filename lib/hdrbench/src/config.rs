//! Sweep configuration.

use serde::Deserialize;
use snafu::{ensure, Snafu};

/// Configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ConfigError {
    /// A configuration value is outside of its valid range.
    #[snafu(display("Invalid value for '{}': {}", field, reason))]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,

        /// Why the value was rejected.
        reason: String,
    },
}

/// Fixed-precision histogram configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FixedPrecisionConfig {
    /// Lowest discernible value, in scaled units.
    ///
    /// Defaults to 1.
    pub lowest_discernible: u64,

    /// Initial highest trackable value, in scaled units.
    ///
    /// The range is widened on demand, so this only sizes the histogram before the first batch. Defaults to 1000.
    pub highest_trackable: u64,

    /// Number of significant decimal figures to preserve, between 0 and 5.
    ///
    /// Defaults to 2.
    pub significant_figures: u8,

    /// Factor applied to samples before they are rounded to integers.
    ///
    /// Defaults to 10.
    pub int_scale: f64,
}

impl Default for FixedPrecisionConfig {
    fn default() -> Self {
        Self {
            lowest_discernible: 1,
            highest_trackable: 1000,
            significant_figures: 2,
            int_scale: 10.0,
        }
    }
}

/// Benchmark sweep configuration.
///
/// The sweep runs once per signal count, starting at `min_signals` and multiplying by `signal_multiplier` for as long
/// as the count does not exceed `max_signals`. Each sweep generates its signals from `seed` and then runs
/// `iterations` iterations, each recording the next `samples_per_iteration` samples of every signal.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Seed for signal generation.
    ///
    /// Defaults to 1234.
    pub seed: u64,

    /// Number of samples recorded from every signal per iteration.
    ///
    /// Defaults to 240.
    pub samples_per_iteration: usize,

    /// Number of iterations per sweep.
    ///
    /// Defaults to 5.
    pub iterations: usize,

    /// Number of signals in the first sweep.
    ///
    /// Defaults to 3.
    pub min_signals: usize,

    /// Upper limit on the number of signals.
    ///
    /// Defaults to 3000.
    pub max_signals: usize,

    /// Factor the signal count grows by between sweeps.
    ///
    /// Defaults to 30.
    pub signal_multiplier: usize,

    /// Number of high-latency outlier signals added to every sweep.
    ///
    /// Defaults to 1.
    pub outliers: usize,

    /// Fixed-precision histogram configuration.
    pub fixed_precision: FixedPrecisionConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            seed: 1234,
            samples_per_iteration: 240,
            iterations: 5,
            min_signals: 3,
            max_signals: 3000,
            signal_multiplier: 30,
            outliers: 1,
            fixed_precision: FixedPrecisionConfig::default(),
        }
    }
}

impl SweepConfig {
    /// Returns the number of samples every signal must hold to cover all iterations.
    pub fn samples_per_signal(&self) -> usize {
        self.samples_per_iteration.saturating_mul(self.iterations)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// If any value is outside of its valid range, an error is returned naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            self.samples_per_iteration >= 1,
            InvalidValue {
                field: "samples_per_iteration",
                reason: "must be at least 1",
            }
        );
        ensure!(
            self.iterations >= 1,
            InvalidValue {
                field: "iterations",
                reason: "must be at least 1",
            }
        );
        ensure!(
            self.min_signals >= 1,
            InvalidValue {
                field: "min_signals",
                reason: "must be at least 1",
            }
        );
        ensure!(
            self.min_signals <= self.max_signals,
            InvalidValue {
                field: "max_signals",
                reason: format!("must not be lower than min_signals ({})", self.min_signals),
            }
        );
        ensure!(
            self.signal_multiplier >= 2,
            InvalidValue {
                field: "signal_multiplier",
                reason: "must be at least 2",
            }
        );

        let fixed = &self.fixed_precision;
        ensure!(
            fixed.int_scale.is_finite() && fixed.int_scale > 0.0,
            InvalidValue {
                field: "fixed_precision.int_scale",
                reason: format!("must be a finite positive number, got {}", fixed.int_scale),
            }
        );
        ensure!(
            fixed.lowest_discernible >= 1,
            InvalidValue {
                field: "fixed_precision.lowest_discernible",
                reason: "must be at least 1",
            }
        );
        ensure!(
            fixed.highest_trackable >= fixed.lowest_discernible.saturating_mul(2),
            InvalidValue {
                field: "fixed_precision.highest_trackable",
                reason: format!(
                    "must be at least twice lowest_discernible ({})",
                    fixed.lowest_discernible
                ),
            }
        );
        ensure!(
            fixed.significant_figures <= 5,
            InvalidValue {
                field: "fixed_precision.significant_figures",
                reason: "must be at most 5",
            }
        );

        Ok(())
    }
}
