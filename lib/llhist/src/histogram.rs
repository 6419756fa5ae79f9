use std::cmp::Ordering;

use smallvec::SmallVec;

use crate::{
    bin::Bin,
    error::{EmptyHistogram, QuantileOutOfBounds, SketchError},
    SIGNIFICANT_FIGURES,
};

/// A bin and the number of observations within it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct BinCount {
    bin: Bin,
    count: u64,
}

/// Log-linear histogram.
///
/// Bins are kept sorted by the values they cover and only exist once at least one value has landed in them, so the
/// memory footprint grows with the spread of the recorded values rather than with their count.
///
/// Merging is exact: merging `a` into `b` yields the same bins as merging `b` into `a`, or as recording every value of
/// both into a single histogram.
#[derive(Clone, Debug)]
pub struct LogLinearHistogram {
    /// Non-empty bins, sorted by [`Bin`] ordering.
    bins: SmallVec<[BinCount; 4]>,

    /// The number of observations within the histogram.
    count: u64,

    /// The minimum value of all observations.
    min: f64,

    /// The maximum value of all observations.
    max: f64,
}

impl LogLinearHistogram {
    /// Creates an empty `LogLinearHistogram`.
    pub fn new() -> Self {
        Self {
            bins: SmallVec::new(),
            count: 0,
            min: f64::MAX,
            max: f64::MIN,
        }
    }

    /// Returns `true` if no values have been recorded.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the number of recorded values.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the smallest recorded value, or `None` if the histogram is empty.
    pub fn min(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.min)
    }

    /// Returns the largest recorded value, or `None` if the histogram is empty.
    pub fn max(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.max)
    }

    /// Returns the number of non-empty bins.
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Returns the non-empty bins with their counts, in ascending value order.
    pub fn bins(&self) -> impl Iterator<Item = (Bin, u64)> + '_ {
        self.bins.iter().map(|bc| (bc.bin, bc.count))
    }

    /// Returns the number of significant decimal digits the bins preserve.
    pub fn significant_figures(&self) -> u8 {
        SIGNIFICANT_FIGURES
    }

    /// Returns an estimate of the memory used by this histogram, in bytes.
    pub fn used_bytes(&self) -> usize {
        let heap = if self.bins.spilled() {
            self.bins.capacity() * std::mem::size_of::<BinCount>()
        } else {
            0
        };
        std::mem::size_of::<Self>() + heap
    }

    /// Removes all values, keeping allocated bin storage for reuse.
    pub fn clear(&mut self) {
        self.bins.clear();
        self.count = 0;
        self.min = f64::MAX;
        self.max = f64::MIN;
    }

    /// Records a single value.
    ///
    /// # Errors
    ///
    /// If the value is not finite, or too large to be binned, an error is returned and the histogram is unchanged.
    pub fn insert(&mut self, value: f64) -> Result<(), SketchError> {
        let bin = Bin::from_value(value)?;
        match self.bins.binary_search_by(|bc| bc.bin.cmp(&bin)) {
            Ok(idx) => self.bins[idx].count += 1,
            Err(idx) => self.bins.insert(idx, BinCount { bin, count: 1 }),
        }
        self.adjust_basic_stats(value, value, 1);
        Ok(())
    }

    /// Records many values at once.
    ///
    /// # Errors
    ///
    /// If any value is not finite, or too large to be binned, an error is returned and none of the values are recorded.
    pub fn insert_many(&mut self, values: &[f64]) -> Result<(), SketchError> {
        if values.is_empty() {
            return Ok(());
        }

        let mut keys = Vec::with_capacity(values.len());
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for &value in values {
            keys.push(Bin::from_value(value)?);
            min = min.min(value);
            max = max.max(value);
        }
        keys.sort_unstable();

        let mut counts = Vec::new();
        let mut idx = 0;
        while idx < keys.len() {
            let run = count_leading_equal(&keys[idx..]);
            counts.push(BinCount {
                bin: keys[idx],
                count: run as u64,
            });
            idx += run;
        }

        self.absorb(&counts);
        self.adjust_basic_stats(min, max, values.len() as u64);
        Ok(())
    }

    /// Merges another histogram into this one.
    pub fn merge(&mut self, other: &LogLinearHistogram) {
        if other.is_empty() {
            return;
        }

        self.absorb(&other.bins);
        self.adjust_basic_stats(other.min, other.max, other.count);
    }

    /// Returns the estimated value at the given quantile.
    ///
    /// # Errors
    ///
    /// If the histogram is empty, or the quantile is outside of `[0, 1]`, an error is returned.
    pub fn quantile(&self, quantile: f64) -> Result<f64, SketchError> {
        self.quantiles(&[quantile]).map(|estimates| estimates[0])
    }

    /// Returns the estimated values at each of the given quantiles, in the order they were requested.
    ///
    /// The estimate is interpolated linearly inside the bin holding the requested rank, assuming values are spread
    /// evenly across the bin, and is clamped to the observed minimum and maximum.
    ///
    /// # Errors
    ///
    /// If the histogram is empty, or any quantile is outside of `[0, 1]`, an error is returned.
    pub fn quantiles(&self, quantiles: &[f64]) -> Result<Vec<f64>, SketchError> {
        if let Some(&quantile) = quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return QuantileOutOfBounds { quantile }.fail();
        }

        let mut bins = self.bins.iter();
        let Some(mut current) = bins.next() else {
            return EmptyHistogram.fail();
        };

        // Walk the bins once, answering the requested quantiles from smallest to largest.
        let mut order = (0..quantiles.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| quantiles[a].total_cmp(&quantiles[b]));

        let total = self.count as f64;
        let mut lower = 0.0;
        let mut upper = current.count as f64;
        let mut estimates = vec![0.0; quantiles.len()];

        for idx in order {
            let quantile = quantiles[idx];
            if quantile == 0.0 {
                estimates[idx] = self.min;
                continue;
            }
            if quantile == 1.0 {
                estimates[idx] = self.max;
                continue;
            }

            let target = quantile * total;
            while upper < target {
                match bins.next() {
                    Some(next) => {
                        current = next;
                        lower = upper;
                        upper += next.count as f64;
                    }
                    None => break,
                }
            }

            let left = current.bin.left();
            let width = current.bin.width();
            let estimate = if target <= lower {
                left
            } else if target >= upper {
                left + width
            } else {
                left + (target - lower) / (upper - lower) * width
            };
            estimates[idx] = estimate.clamp(self.min, self.max);
        }

        Ok(estimates)
    }

    fn adjust_basic_stats(&mut self, min: f64, max: f64, n: u64) {
        if min < self.min {
            self.min = min;
        }
        if max > self.max {
            self.max = max;
        }
        self.count += n;
    }

    fn absorb(&mut self, counts: &[BinCount]) {
        let mut temp = SmallVec::<[BinCount; 4]>::with_capacity(self.bins.len() + counts.len());

        let mut bins_idx = 0;
        let mut counts_idx = 0;
        while bins_idx < self.bins.len() && counts_idx < counts.len() {
            let ours = self.bins[bins_idx];
            let theirs = counts[counts_idx];

            match ours.bin.cmp(&theirs.bin) {
                Ordering::Less => {
                    temp.push(ours);
                    bins_idx += 1;
                }
                Ordering::Greater => {
                    temp.push(theirs);
                    counts_idx += 1;
                }
                Ordering::Equal => {
                    temp.push(BinCount {
                        bin: ours.bin,
                        count: ours.count + theirs.count,
                    });
                    bins_idx += 1;
                    counts_idx += 1;
                }
            }
        }

        temp.extend_from_slice(&self.bins[bins_idx..]);
        temp.extend_from_slice(&counts[counts_idx..]);

        self.bins = temp;
    }
}

impl Default for LogLinearHistogram {
    fn default() -> Self {
        Self::new()
    }
}

fn count_leading_equal(keys: &[Bin]) -> usize {
    let first = keys[0];
    keys.iter().take_while(|k| **k == first).count()
}

#[cfg(test)]
mod tests {
    use float_cmp::ApproxEqRatio as _;

    use super::*;

    #[test]
    fn empty_histogram() {
        let hist = LogLinearHistogram::new();

        assert!(hist.is_empty());
        assert_eq!(hist.count(), 0);
        assert_eq!(hist.min(), None);
        assert_eq!(hist.max(), None);
        assert_eq!(hist.quantile(0.5), Err(SketchError::EmptyHistogram));
    }

    #[test]
    fn single_value() {
        let mut hist = LogLinearHistogram::new();
        hist.insert(42.0).unwrap();

        assert_eq!(hist.count(), 1);
        assert_eq!(hist.bin_count(), 1);
        for q in [0.0, 0.25, 0.5, 1.0] {
            assert_eq!(hist.quantile(q).unwrap(), 42.0);
        }
    }

    #[test]
    fn extremes_are_exact() {
        let mut hist = LogLinearHistogram::new();
        hist.insert_many(&[3.3, 17.0, 250.0, 1234.0, 9876.0]).unwrap();

        assert_eq!(hist.quantile(0.0).unwrap(), 3.3);
        assert_eq!(hist.quantile(1.0).unwrap(), 9876.0);
    }

    #[test]
    fn interpolates_within_bin() {
        let mut hist = LogLinearHistogram::new();
        for i in 0..100 {
            hist.insert(100.0 + f64::from(i) / 10.0).unwrap();
        }

        // All values land in [100, 110).
        assert_eq!(hist.bin_count(), 1);
        let median = hist.quantile(0.5).unwrap();
        assert!(median.approx_eq_ratio(&105.0, 0.01), "median {}", median);
    }

    #[test]
    fn insert_and_insert_many_agree() {
        let values = [0.5, 1.0, 1.05, 7.5, 7.51, 120.0, 125.0, 0.0, -3.0, 10_000.0];

        let mut single = LogLinearHistogram::new();
        for v in values {
            single.insert(v).unwrap();
        }

        let mut many = LogLinearHistogram::new();
        many.insert_many(&values).unwrap();

        assert_eq!(single.bins().collect::<Vec<_>>(), many.bins().collect::<Vec<_>>());
        assert_eq!(single.min(), many.min());
        assert_eq!(single.max(), many.max());
        assert_eq!(single.count(), many.count());
    }

    #[test]
    fn insert_many_is_all_or_nothing() {
        let mut hist = LogLinearHistogram::new();
        hist.insert(1.0).unwrap();

        let result = hist.insert_many(&[2.0, f64::NAN, 3.0]);
        assert!(matches!(result, Err(SketchError::NonFiniteValue { .. })));
        assert_eq!(hist.count(), 1);
        assert_eq!(hist.bin_count(), 1);
    }

    #[test]
    fn quantiles_keep_request_order() {
        let mut hist = LogLinearHistogram::new();
        hist.insert_many(&(1..=1000).map(f64::from).collect::<Vec<_>>()).unwrap();

        let ascending = hist.quantiles(&[0.1, 0.5, 0.9]).unwrap();
        let shuffled = hist.quantiles(&[0.9, 0.1, 0.5]).unwrap();
        assert_eq!(shuffled, vec![ascending[2], ascending[0], ascending[1]]);
    }

    #[test]
    fn relative_accuracy_on_uniform_values() {
        let mut hist = LogLinearHistogram::new();
        hist.insert_many(&(1..=1000).map(f64::from).collect::<Vec<_>>()).unwrap();

        for q in [0.1, 0.5, 0.9, 0.95, 0.99] {
            let estimated = hist.quantile(q).unwrap();
            let expected = q * 1000.0;
            assert!(
                estimated.approx_eq_ratio(&expected, 0.02),
                "quantile {} estimated {} expected {}",
                q,
                estimated,
                expected
            );
        }
    }

    #[test]
    fn rejects_out_of_bounds_quantiles() {
        let mut hist = LogLinearHistogram::new();
        hist.insert(1.0).unwrap();

        assert_eq!(
            hist.quantiles(&[0.5, 1.5]),
            Err(SketchError::QuantileOutOfBounds { quantile: 1.5 })
        );
        assert!(matches!(
            hist.quantile(f64::NAN),
            Err(SketchError::QuantileOutOfBounds { .. })
        ));
    }

    #[test]
    fn merge_combines_counts_and_extremes() {
        let mut a = LogLinearHistogram::new();
        a.insert_many(&[1.0, 2.0, 150.0]).unwrap();

        let mut b = LogLinearHistogram::new();
        b.insert_many(&[0.5, 2.05, 3000.0]).unwrap();

        a.merge(&b);

        assert_eq!(a.count(), 6);
        assert_eq!(a.min(), Some(0.5));
        assert_eq!(a.max(), Some(3000.0));
        // 2.0 and 2.05 share the [2.0, 2.1) bin.
        assert_eq!(a.bin_count(), 5);
    }

    #[test]
    fn clear_resets_everything() {
        let mut hist = LogLinearHistogram::new();
        hist.insert_many(&[1.0, 2.0, 3.0, 4.0, 5.0, 600.0]).unwrap();
        hist.clear();

        assert!(hist.is_empty());
        assert_eq!(hist.bin_count(), 0);
        assert_eq!(hist.min(), None);

        hist.insert(7.0).unwrap();
        assert_eq!(hist.quantile(0.5).unwrap(), 7.0);
    }

    #[test]
    fn used_bytes_grows_with_bins() {
        let mut hist = LogLinearHistogram::new();
        let empty = hist.used_bytes();

        hist.insert_many(&(1..=500).map(f64::from).collect::<Vec<_>>()).unwrap();
        assert!(hist.used_bytes() > empty);
    }
}
