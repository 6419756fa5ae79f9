//! Synthetic latency signal generation.
//!
//! Signals are built from two bounded random walks: a coarse walk that wanders across the signal's whole range, and a
//! fine walk around zero that adds jitter on top of it. The result is autocorrelated and bounded, much closer to how
//! real latencies behave than independent draws from a distribution.
//!
//! Generation is fully determined by the seed. A top-level RNG seeded from it only hands out per-signal seeds, so the
//! shape of each signal does not depend on how many signals are generated after it.

use rand::{rngs::StdRng, Rng, SeedableRng as _};
use snafu::{ensure, Snafu};
use tracing::debug;

use crate::dataset::Dataset;

/// Lowest value of a normal signal.
pub const NORMAL_MIN: f64 = 1.0;

/// Highest value of a normal signal.
pub const NORMAL_MAX: f64 = 1500.0;

/// Highest value of an outlier signal.
pub const OUTLIER_MAX: f64 = 10_000.0;

/// Outlier signals start this far above [`NORMAL_MAX`], at most (exclusive).
pub const OUTLIER_MAX_OFFSET: u32 = 100;

/// Error raised while generating signals.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum GeneratorError {
    /// Signals must hold at least one sample.
    #[snafu(display("Signals must hold at least one sample."))]
    ZeroSamples,
}

/// A random walk that stays within `[min, max]` by reflecting off its limits.
///
/// Each step moves the walk by a uniformly distributed amount in `[-step, step]`. The walk starts at the middle of its
/// range.
pub struct RandomWalk<R> {
    rng: R,
    step: f64,
    min: f64,
    max: f64,
    current: f64,
}

impl<R: Rng> RandomWalk<R> {
    /// Creates a new `RandomWalk` drawing its steps from `rng`.
    ///
    /// The limits may be given in either order.
    pub fn new(rng: R, step: f64, min: f64, max: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            rng,
            step: step.abs(),
            min,
            max,
            current: min + (max - min) / 2.0,
        }
    }

    /// Advances the walk and returns its new position.
    pub fn next_value(&mut self) -> f64 {
        let delta = self.rng.random_range(-self.step..=self.step);
        self.current = reflect(self.current + delta, self.min, self.max);
        self.current
    }
}

impl<R: Rng> Iterator for RandomWalk<R> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_value())
    }
}

/// Folds `value` back into `[min, max]` as if it bounced off the nearest limit.
fn reflect(value: f64, min: f64, max: f64) -> f64 {
    let reflected = if value > max {
        2.0 * max - value
    } else if value < min {
        2.0 * min - value
    } else {
        value
    };

    // A step longer than the whole range can bounce past the opposite limit.
    reflected.clamp(min, max)
}

/// Generates a single latency-like dataset with values in `[min, max]`.
///
/// The bounds may be given in either order.
///
/// The coarse walk moves by up to a tenth of the range per sample and is seeded by `base_seed`. The jitter walk moves
/// by up to a thousandth of the range, stays within a tenth of the range around zero, and is seeded by `mixin_seed`.
pub fn latency_dataset<N>(name: N, base_seed: u64, mixin_seed: u64, min: f64, max: f64, samples: usize) -> Dataset
where
    N: Into<String>,
{
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    let spread = max - min;
    let base = RandomWalk::new(StdRng::seed_from_u64(base_seed), spread / 10.0, min, max);
    let jitter = RandomWalk::new(
        StdRng::seed_from_u64(mixin_seed),
        spread / 1000.0,
        -spread / 10.0,
        spread / 10.0,
    );

    let values = base
        .zip(jitter)
        .map(|(b, j)| reflect(b + j, min, max))
        .take(samples)
        .collect();

    Dataset::new(name, values, min, max)
}

/// Generates `signal_count` normal latency signals followed by `outlier_count` high-latency outlier signals.
///
/// Normal signals take values in `[NORMAL_MIN, NORMAL_MAX]`. Each outlier signal starts at `NORMAL_MAX` plus a random
/// offset in `[0, OUTLIER_MAX_OFFSET)` and extends up to `OUTLIER_MAX`.
///
/// Per-signal seeds are drawn from an RNG seeded with `seed`, in order: for every signal its base seed, then its mixin
/// seed, then (for outliers) its offset.
///
/// # Errors
///
/// If `samples_per_signal` is zero, an error is returned.
pub fn generate_latency_signals(
    seed: u64, samples_per_signal: usize, signal_count: usize, outlier_count: usize,
) -> Result<Vec<Dataset>, GeneratorError> {
    ensure!(samples_per_signal > 0, ZeroSamples);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut datasets = Vec::with_capacity(signal_count + outlier_count);

    for idx in 0..signal_count {
        let base_seed = rng.random::<u64>();
        let mixin_seed = rng.random::<u64>();
        datasets.push(latency_dataset(
            format!("low-latency-{}", idx),
            base_seed,
            mixin_seed,
            NORMAL_MIN,
            NORMAL_MAX,
            samples_per_signal,
        ));
    }

    for idx in signal_count..signal_count + outlier_count {
        let base_seed = rng.random::<u64>();
        let mixin_seed = rng.random::<u64>();
        let offset = f64::from(rng.random_range(0..OUTLIER_MAX_OFFSET));
        datasets.push(latency_dataset(
            format!("high-latency-{}", idx),
            base_seed,
            mixin_seed,
            NORMAL_MAX + offset,
            OUTLIER_MAX,
            samples_per_signal,
        ));
    }

    debug!(
        signals = signal_count,
        outliers = outlier_count,
        samples = samples_per_signal,
        "Generated latency signals."
    );

    Ok(datasets)
}
