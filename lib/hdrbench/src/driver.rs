//! Benchmark driver.
//!
//! The driver runs one sweep per signal count. A sweep generates its signals once, then runs a fixed number of
//! iterations over consecutive windows of those signals. Every iteration resets each histogram, records the window
//! into it, queries a dense quantile grid, and stores the relative error of every approximate variant against the
//! exact one.

use snafu::{ResultExt as _, Snafu};
use tracing::{debug, info};

use crate::{
    config::{ConfigError, SweepConfig},
    dataset::Dataset,
    generator::{generate_latency_signals, GeneratorError},
    histogram::{ExactHistogram, FixedPrecisionHistogram, Histogram, HistogramError, LogLinearBucketed},
    matrix::QuantileErrorMatrix,
    stats,
};

/// Percentiles of the relative error that are reported for every iteration.
pub const ERROR_PERCENTILES: [f64; 4] = [0.10, 0.50, 0.97, 0.99];

/// Number of points in the quantile grid every histogram is queried at.
pub const QUANTILE_GRID_POINTS: usize = 1000;

/// Driver error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum DriverError {
    /// The sweep configuration is invalid.
    #[snafu(display("Invalid sweep configuration: {}", source))]
    Config {
        /// Error source.
        source: ConfigError,
    },

    /// A histogram could not be constructed.
    #[snafu(display("Failed to construct histogram: {}", source))]
    Construction {
        /// Error source.
        source: HistogramError,
    },

    /// Signals could not be generated.
    #[snafu(display("Failed to generate {} signals: {}", signals, source))]
    Generate {
        /// Number of signals requested.
        signals: usize,

        /// Error source.
        source: GeneratorError,
    },

    /// A histogram failed to record an iteration's samples.
    #[snafu(display(
        "Failed to record values at iteration {} into histogram {}: {}",
        iteration,
        histogram,
        source
    ))]
    Record {
        /// Iteration that failed, starting at zero.
        iteration: usize,

        /// Name of the histogram that failed.
        histogram: &'static str,

        /// Error source.
        source: HistogramError,
    },

    /// A histogram failed to compute quantiles.
    #[snafu(display(
        "Failed to calculate quantiles at iteration {} for histogram {}: {}",
        iteration,
        histogram,
        source
    ))]
    Query {
        /// Iteration that failed, starting at zero.
        iteration: usize,

        /// Name of the histogram that failed.
        histogram: &'static str,

        /// Error source.
        source: HistogramError,
    },
}

/// Returns `points` evenly spaced quantiles in `(0, 1]`.
pub fn quantile_grid(points: usize) -> Vec<f64> {
    (1..=points).map(|i| i as f64 / points as f64).collect()
}

/// Signal counts visited by a sweep: `min`, `min × multiplier`, and so on, for as long as they do not exceed `max`.
#[derive(Clone, Debug)]
pub struct SignalCounts {
    next: Option<usize>,
    max: usize,
    multiplier: usize,
}

impl SignalCounts {
    /// Creates a new `SignalCounts` schedule.
    pub fn new(min: usize, max: usize, multiplier: usize) -> Self {
        Self {
            next: Some(min),
            max,
            multiplier,
        }
    }
}

impl Iterator for SignalCounts {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next.filter(|&count| count > 0 && count <= self.max)?;
        self.next = current.checked_mul(self.multiplier).filter(|&next| next > current);
        Some(current)
    }
}

/// Results of a single sweep.
#[derive(Clone, Debug)]
pub struct SweepResult {
    /// Number of normal signals in the sweep.
    pub signals: usize,

    /// Number of outlier signals in the sweep.
    pub outliers: usize,

    /// Errors of every approximate histogram, per iteration.
    pub matrix: QuantileErrorMatrix,

    /// Memory used by every histogram after the last iteration, in bytes.
    pub memory: Vec<(&'static str, usize)>,
}

/// Receives the output of the driver as it runs.
pub trait SweepReporter {
    /// Called once the signals of a sweep have been generated, before any of them are recorded.
    fn signals_generated(&mut self, signals: usize, datasets: &[Dataset]) {
        let _ = (signals, datasets);
    }

    /// Called once a sweep has completed.
    fn sweep_completed(&mut self, result: &SweepResult);
}

/// Benchmark driver.
///
/// Owns the histograms for the whole run, with the exact histogram first. Histograms are reset between iterations
/// rather than recreated.
pub struct Driver {
    config: SweepConfig,
    histograms: Vec<Box<dyn Histogram>>,
    grid: Vec<f64>,
}

impl Driver {
    /// Creates a new `Driver` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration is invalid, or any histogram cannot be constructed from it, an error is returned.
    pub fn new(config: &SweepConfig) -> Result<Self, DriverError> {
        config.validate().context(Config)?;

        let fixed = &config.fixed_precision;
        let histograms: Vec<Box<dyn Histogram>> = vec![
            Box::new(ExactHistogram::new()),
            Box::new(
                FixedPrecisionHistogram::new(
                    fixed.lowest_discernible,
                    fixed.highest_trackable,
                    fixed.significant_figures,
                    fixed.int_scale,
                )
                .context(Construction)?,
            ),
            Box::new(LogLinearBucketed::new()),
        ];
        for histogram in &histograms {
            info!(
                histogram = histogram.name(),
                significant_figures = ?histogram.significant_figures(),
                "Adding histogram."
            );
        }

        Ok(Self {
            config: config.clone(),
            histograms,
            grid: quantile_grid(QUANTILE_GRID_POINTS),
        })
    }

    /// Returns the names of all histograms, the exact histogram first.
    pub fn histogram_names(&self) -> Vec<&'static str> {
        self.histograms.iter().map(|h| h.name()).collect()
    }

    /// Returns the signal counts this driver sweeps over.
    pub fn signal_counts(&self) -> SignalCounts {
        SignalCounts::new(
            self.config.min_signals,
            self.config.max_signals,
            self.config.signal_multiplier,
        )
    }

    /// Runs every sweep, handing each result to `reporter` as soon as it completes.
    ///
    /// # Errors
    ///
    /// If signals cannot be generated, or any histogram fails to record values or compute quantiles, an error is
    /// returned and the run stops.
    pub fn run<R>(&mut self, reporter: &mut R) -> Result<(), DriverError>
    where
        R: SweepReporter + ?Sized,
    {
        for signals in self.signal_counts() {
            let result = self.run_sweep(signals, reporter)?;
            reporter.sweep_completed(&result);
        }

        Ok(())
    }

    /// Runs a single sweep over `signals` normal signals plus the configured outliers.
    ///
    /// # Errors
    ///
    /// If signals cannot be generated, or any histogram fails to record values or compute quantiles, an error is
    /// returned.
    pub fn run_sweep<R>(&mut self, signals: usize, reporter: &mut R) -> Result<SweepResult, DriverError>
    where
        R: SweepReporter + ?Sized,
    {
        let samples = self.config.samples_per_iteration;
        let iterations = self.config.iterations;
        let outliers = self.config.outliers;
        info!(signals, outliers, iterations, samples, "Calculating errors.");

        let datasets = generate_latency_signals(self.config.seed, self.config.samples_per_signal(), signals, outliers)
            .context(Generate { signals })?;
        reporter.signals_generated(signals, &datasets);

        let names = self.histogram_names();
        let mut matrix = QuantileErrorMatrix::new(names[0], names[1..].to_vec());

        for iteration in 0..iterations {
            let start = iteration * samples;
            let stop = start + samples;
            debug!(iteration, start, stop, "Recording iteration.");

            let mut estimates = Vec::with_capacity(self.histograms.len());
            for histogram in &mut self.histograms {
                let name = histogram.name();
                histogram.reset();
                histogram
                    .record_range(&datasets, start, stop)
                    .context(Record { iteration, histogram: name })?;
                let quantiles = histogram
                    .quantiles(&self.grid)
                    .context(Query { iteration, histogram: name })?;
                estimates.push(quantiles);
            }

            let (reference, approximations) = estimates.split_at(1);
            let errors = approximations
                .iter()
                .map(|candidate| stats::relative_difference(&reference[0], candidate))
                .collect();
            matrix.push_iteration(errors);
        }

        let memory = self
            .histograms
            .iter()
            .map(|h| (h.name(), h.used_memory()))
            .collect::<Vec<_>>();
        for (histogram, bytes) in &memory {
            debug!(histogram, bytes, "Histogram memory after sweep.");
        }
        info!(signals, "Calculated errors.");

        Ok(SweepResult {
            signals,
            outliers,
            matrix,
            memory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collector {
        generated: Vec<(usize, usize)>,
        results: Vec<SweepResult>,
    }

    impl SweepReporter for Collector {
        fn signals_generated(&mut self, signals: usize, datasets: &[Dataset]) {
            self.generated.push((signals, datasets.len()));
        }

        fn sweep_completed(&mut self, result: &SweepResult) {
            self.results.push(result.clone());
        }
    }

    fn small_config() -> SweepConfig {
        SweepConfig {
            samples_per_iteration: 50,
            iterations: 3,
            min_signals: 2,
            max_signals: 20,
            signal_multiplier: 3,
            ..Default::default()
        }
    }

    #[test]
    fn signal_count_schedule() {
        assert_eq!(SignalCounts::new(3, 3000, 30).collect::<Vec<_>>(), vec![3, 90, 2700]);
        assert_eq!(SignalCounts::new(2, 20, 3).collect::<Vec<_>>(), vec![2, 6, 18]);
        assert_eq!(SignalCounts::new(5, 4, 2).count(), 0);
        assert_eq!(SignalCounts::new(0, 10, 2).count(), 0);
        assert_eq!(
            SignalCounts::new(usize::MAX / 2, usize::MAX, 4).collect::<Vec<_>>(),
            vec![usize::MAX / 2]
        );
    }

    #[test]
    fn grid_is_dense() {
        let grid = quantile_grid(QUANTILE_GRID_POINTS);
        assert_eq!(grid.len(), 1000);
        assert_eq!(grid[0], 0.001);
        assert_eq!(grid[499], 0.5);
        assert_eq!(grid[999], 1.0);
    }

    #[test]
    fn rejects_invalid_configuration() {
        let config = SweepConfig {
            iterations: 0,
            ..Default::default()
        };
        assert!(matches!(Driver::new(&config), Err(DriverError::Config { .. })));
    }

    #[test]
    fn runs_every_sweep() {
        let config = small_config();
        let mut driver = Driver::new(&config).unwrap();
        assert_eq!(driver.histogram_names(), vec!["Exact", "HDR", "LogLinear"]);

        let mut collector = Collector::default();
        driver.run(&mut collector).unwrap();

        assert_eq!(collector.generated, vec![(2, 3), (6, 7), (18, 19)]);
        assert_eq!(collector.results.len(), 3);

        for result in &collector.results {
            assert_eq!(result.outliers, 1);
            assert_eq!(result.matrix.reference(), "Exact");
            assert_eq!(result.matrix.variants(), &["HDR", "LogLinear"]);
            assert_eq!(result.matrix.iterations(), 3);
            assert_eq!(result.memory.len(), 3);

            // The exact histogram holds exactly one window of every signal.
            let (name, bytes) = result.memory[0];
            assert_eq!(name, "Exact");
            assert_eq!(bytes, (result.signals + result.outliers) * 50 * 8);

            for iteration in 0..3 {
                for variant in 0..2 {
                    let errors = result.matrix.errors(iteration, variant).unwrap();
                    assert_eq!(errors.len(), QUANTILE_GRID_POINTS);
                    assert!(errors.windows(2).all(|w| w[0] <= w[1]));
                    assert!(errors.iter().all(|e| e.is_finite() && *e >= 0.0));
                }
            }
        }
    }

    #[test]
    fn approximations_stay_close() {
        let mut driver = Driver::new(&small_config()).unwrap();
        let mut collector = Collector::default();
        let result = driver.run_sweep(6, &mut collector).unwrap();

        for iteration in 0..result.matrix.iterations() {
            for variant in 0..2 {
                let p50 = result.matrix.error_percentiles(iteration, variant, &[0.5]).unwrap()[0];
                assert!(p50 < 0.05, "iteration {} variant {} median error {}", iteration, variant, p50);
            }
        }
    }

    #[test]
    fn sweeps_are_reproducible() {
        let config = small_config();
        let mut first = Driver::new(&config).unwrap();
        let mut second = Driver::new(&config).unwrap();
        let mut collector = Collector::default();

        let a = first.run_sweep(2, &mut collector).unwrap();
        let b = second.run_sweep(2, &mut collector).unwrap();
        assert_eq!(a.matrix, b.matrix);
    }
}
