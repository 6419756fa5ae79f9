use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use clap::Parser;
use hdrbench::{FixedPrecisionConfig, SweepConfig};
use tracing::info;

/// Measures how closely approximate histograms estimate quantiles of synthetic latency signals.
#[derive(Clone, Debug, Parser)]
#[command(about)]
pub struct Cli {
    /// Number of datapoints per signal per iteration.
    #[arg(long = "datapoints", default_value_t = 240)]
    pub datapoints: usize,

    /// Number of iterations.
    #[arg(long = "iter", default_value_t = 5)]
    pub iterations: usize,

    /// Number of signals in the first sweep.
    #[arg(long = "min-sig", default_value_t = 3)]
    pub min_signals: usize,

    /// Upper limit on the number of signals.
    #[arg(long = "max-sig", default_value_t = 3000)]
    pub max_signals: usize,

    /// Factor the number of signals grows by between sweeps.
    #[arg(long = "mult-proc", default_value_t = 30)]
    pub signal_multiplier: usize,

    /// Random seed to use.
    #[arg(long = "rand", default_value_t = 1234)]
    pub seed: u64,

    /// Factor applied to values before they are recorded into the fixed-precision histogram.
    #[arg(long = "int-scale", default_value_t = 10.0)]
    pub int_scale: f64,

    /// Number of high-latency outlier signals.
    #[arg(long, default_value_t = 1)]
    pub outliers: usize,

    /// Directory to put generated files in.
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    /// Draw the generated signals (requires gnuplot).
    #[arg(long)]
    pub draw_dataset: bool,

    /// Draw the error percentiles of every histogram (requires gnuplot).
    #[arg(long)]
    pub draw_errors: bool,

    /// Command used to render plots.
    #[arg(long, default_value = "gnuplot")]
    pub gnuplot: String,

    /// Path to a YAML file holding the sweep configuration.
    ///
    /// When given, the sweep flags above are ignored.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Builds the sweep configuration, either from the configuration file or from the command line flags.
    pub fn sweep_config(&self) -> anyhow::Result<SweepConfig> {
        if let Some(path) = &self.config {
            return load_config(path);
        }

        Ok(SweepConfig {
            seed: self.seed,
            samples_per_iteration: self.datapoints,
            iterations: self.iterations,
            min_signals: self.min_signals,
            max_signals: self.max_signals,
            signal_multiplier: self.signal_multiplier,
            outliers: self.outliers,
            fixed_precision: FixedPrecisionConfig {
                int_scale: self.int_scale,
                ..Default::default()
            },
        })
    }
}

/// Loads a sweep configuration from the YAML file at `path`.
///
/// Fields missing from the file take their default values.
pub fn load_config(path: &Path) -> anyhow::Result<SweepConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file '{}'.", path.display()))?;
    let config = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse configuration file '{}'.", path.display()))?;

    Ok(config)
}

/// Ensures `path` is a directory, creating it if it does not exist yet.
pub fn prepare_workdir(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("'{}' exists, but is not a directory.", path.display());
        }
    } else {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create workdir '{}'.", path.display()))?;
    }

    info!(workdir = %path.display(), "Using workdir.");
    Ok(())
}
