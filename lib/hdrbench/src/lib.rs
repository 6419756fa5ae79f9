//! Quantile accuracy benchmark for online histograms.
//!
//! Compares how closely approximate histograms estimate quantiles of synthetic latency signals, relative to an exact
//! histogram that keeps every sample. Three [`Histogram`] variants are measured: [`ExactHistogram`], the reference;
//! [`FixedPrecisionHistogram`], an HDR histogram over integer-scaled values; and [`LogLinearBucketed`], a log-linear
//! histogram that needs no range up front.
//!
//! The [`Driver`] sweeps over an increasing number of signals, and for every sweep produces a [`QuantileErrorMatrix`]
//! holding the relative error of every approximate variant at a dense grid of quantiles, per iteration.
#![deny(warnings)]
#![deny(missing_docs)]

pub mod config;
pub use self::config::{ConfigError, FixedPrecisionConfig, SweepConfig};

pub mod dataset;
pub use self::dataset::{Dataset, SignalEnvelope};

pub mod driver;
pub use self::driver::{Driver, DriverError, SweepReporter, SweepResult};

pub mod generator;
pub use self::generator::{generate_latency_signals, GeneratorError};

pub mod histogram;
pub use self::histogram::{ExactHistogram, FixedPrecisionHistogram, Histogram, HistogramError, LogLinearBucketed};

pub mod matrix;
pub use self::matrix::{ErrorSeries, QuantileErrorMatrix};

pub mod stats;
