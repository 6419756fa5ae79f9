use snafu::Snafu;

/// Errors raised while recording into, or querying, a log-linear histogram.
#[derive(Debug, Snafu, Clone, PartialEq)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum SketchError {
    /// The value was NaN or infinite.
    #[snafu(display("Cannot record non-finite value {}.", value))]
    NonFiniteValue {
        /// The rejected value.
        value: f64,
    },

    /// The value's magnitude is too large to be represented by any bin.
    #[snafu(display("Value {} exceeds the largest representable bin.", value))]
    ValueOutOfRange {
        /// The rejected value.
        value: f64,
    },

    /// A quantile was requested from a histogram holding no values.
    #[snafu(display("Cannot compute quantiles of an empty histogram."))]
    EmptyHistogram,

    /// A requested quantile was outside of `[0, 1]`.
    #[snafu(display("Quantile {} is outside of the range [0, 1].", quantile))]
    QuantileOutOfBounds {
        /// The rejected quantile.
        quantile: f64,
    },
}
