//! A log-linear histogram with two significant decimal digits of precision.
//!
//! Every recorded value is assigned to a bin of the form `m × 10^e`, where the mantissa `m` holds two significant
//! digits (`10..=99`) and the exponent `e` is a signed byte. Bins are created on demand, so no value range has to be
//! declared up front, and two histograms can always be merged without losing any recorded mass.
//!
//! Quantiles are estimated by linear interpolation inside the bin that holds the requested rank, and then clamped to
//! the observed minimum and maximum.
#![deny(warnings)]
#![deny(missing_docs)]

mod bin;
pub use self::bin::Bin;

mod error;
pub use self::error::SketchError;

mod histogram;
pub use self::histogram::LogLinearHistogram;

/// Number of significant decimal digits tracked by every bin.
pub const SIGNIFICANT_FIGURES: u8 = 2;
