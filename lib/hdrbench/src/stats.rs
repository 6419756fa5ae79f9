//! Quantile selection, sorting, downsampling and difference primitives.
//!
//! Everything here works on plain `f64` slices. Functions taking `sorted` expect their input to be sorted in ascending
//! order already, typically by [`sort`].

use rand::Rng;

/// Reference values with a magnitude below this are treated as zero when computing relative differences.
pub const NEGLIGIBLE_REFERENCE: f64 = 1.0e-15;

// Slices at or below this length are finished off with insertion sort.
const INSERTION_SORT_THRESHOLD: usize = 16;

/// Rounds to the nearest integer, with halfway cases rounded away from zero.
pub fn round_half_away(value: f64) -> i64 {
    value.round() as i64
}

/// Returns the sum of all values.
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Returns the arithmetic mean of all values, or `0.0` if there are none.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        sum(values) / values.len() as f64
    }
}

/// Returns the sample standard deviation of `values` around `mean`, or `0.0` if there are fewer than two values.
pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let total = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    (total / (values.len() - 1) as f64).sqrt()
}

/// Returns the value at the given fraction of a sorted slice, along with its index.
///
/// Uses the nearest-rank method: the index is `round(len × fraction)`, rounded half away from zero and clamped to the
/// bounds of the slice.
///
/// Returns `None` if `sorted` is empty.
pub fn quantile(sorted: &[f64], fraction: f64) -> Option<(f64, usize)> {
    if sorted.is_empty() {
        return None;
    }

    let rank = nearest_rank(sorted.len(), fraction);
    Some((sorted[rank], rank))
}

/// Returns the value at each of the given fractions of a sorted slice, in the order requested.
///
/// Returns `None` if `sorted` is empty.
pub fn quantiles(sorted: &[f64], fractions: &[f64]) -> Option<Vec<f64>> {
    if sorted.is_empty() {
        return None;
    }

    Some(
        fractions
            .iter()
            .map(|&fraction| sorted[nearest_rank(sorted.len(), fraction)])
            .collect(),
    )
}

fn nearest_rank(len: usize, fraction: f64) -> usize {
    let rank = round_half_away(len as f64 * fraction);
    rank.clamp(0, len as i64 - 1) as usize
}

/// Returns the fractional error of each candidate value against its reference value.
///
/// Where the reference value is negligible (smaller in magnitude than [`NEGLIGIBLE_REFERENCE`]) the error is defined
/// as zero.
///
/// # Panics
///
/// Panics if `reference` and `candidate` have different lengths.
pub fn relative_difference(reference: &[f64], candidate: &[f64]) -> Vec<f64> {
    assert_eq!(
        reference.len(),
        candidate.len(),
        "reference and candidate must have the same length"
    );

    reference
        .iter()
        .zip(candidate)
        .map(|(&r, &c)| {
            if r.abs() < NEGLIGIBLE_REFERENCE {
                0.0
            } else {
                (c - r).abs() / r.abs()
            }
        })
        .collect()
}

/// Returns the absolute difference between each pair of values.
///
/// # Panics
///
/// Panics if `reference` and `candidate` have different lengths.
pub fn absolute_difference(reference: &[f64], candidate: &[f64]) -> Vec<f64> {
    assert_eq!(
        reference.len(),
        candidate.len(),
        "reference and candidate must have the same length"
    );

    reference.iter().zip(candidate).map(|(&r, &c)| (c - r).abs()).collect()
}

/// Sorts values in ascending order, in place.
///
/// This is a quicksort with a randomly chosen pivot and three-way partitioning, so runs of equal values do not degrade
/// it. Recursion always descends into the smaller partition, bounding stack depth to `O(log n)`.
pub fn sort(values: &mut [f64]) {
    let mut rng = rand::rng();
    quicksort(values, &mut rng);
}

fn quicksort<R: Rng>(mut values: &mut [f64], rng: &mut R) {
    while values.len() > INSERTION_SORT_THRESHOLD {
        let pivot = values[rng.random_range(0..values.len())];
        let (lt, gt) = partition(values, pivot);

        let (left, rest) = std::mem::take(&mut values).split_at_mut(lt);
        let right = &mut rest[gt - lt..];
        if left.len() < right.len() {
            quicksort(left, rng);
            values = right;
        } else {
            quicksort(right, rng);
            values = left;
        }
    }

    insertion_sort(values);
}

// Three-way partition around `pivot`: `[..lt]` is less, `[lt..gt]` is equal, `[gt..]` is greater.
fn partition(values: &mut [f64], pivot: f64) -> (usize, usize) {
    let mut lt = 0;
    let mut i = 0;
    let mut gt = values.len();

    while i < gt {
        if values[i] < pivot {
            values.swap(lt, i);
            lt += 1;
            i += 1;
        } else if values[i] > pivot {
            gt -= 1;
            values.swap(i, gt);
        } else {
            i += 1;
        }
    }

    (lt, gt)
}

fn insertion_sort(values: &mut [f64]) {
    for i in 1..values.len() {
        let mut j = i;
        while j > 0 && values[j] < values[j - 1] {
            values.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Splits `values` into consecutive windows of `window_size` and returns the requested fractions of each window.
///
/// The output is flattened: for every window, one value per fraction, in the order the fractions were given. The last
/// window may be shorter than `window_size`. Fractions of exactly `0.0` and `1.0` yield the window's minimum and
/// maximum directly.
///
/// # Panics
///
/// Panics if `window_size` is zero.
pub fn downsample(values: &[f64], window_size: usize, fractions: &[f64]) -> Vec<f64> {
    assert!(window_size > 0, "window size must be non-zero");

    let mut estimates = Vec::with_capacity(values.len().div_ceil(window_size) * fractions.len());
    let mut window = Vec::with_capacity(window_size.min(values.len()));

    for chunk in values.chunks(window_size) {
        window.clear();
        window.extend_from_slice(chunk);
        sort(&mut window);

        for &fraction in fractions {
            let estimate = if fraction == 0.0 {
                window[0]
            } else if fraction == 1.0 {
                window[window.len() - 1]
            } else {
                window[nearest_rank(window.len(), fraction)]
            };
            estimates.push(estimate);
        }
    }

    estimates
}
