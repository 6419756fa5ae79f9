use llhist::LogLinearHistogram;
use proptest::prelude::*;

const QUANTILES: [f64; 7] = [0.0, 0.1, 0.25, 0.5, 0.9, 0.99, 1.0];

fn arb_values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop_oneof![0.0..1.0f64, 1.0..1500.0f64, 1500.0..10_000.0f64], 1..200)
}

fn histogram_of(values: &[f64]) -> LogLinearHistogram {
    let mut hist = LogLinearHistogram::new();
    hist.insert_many(values).unwrap();
    hist
}

proptest! {
    #[test]
    fn property_test_merge_order_independent(left in arb_values(), right in arb_values()) {
        let a = histogram_of(&left);
        let b = histogram_of(&right);

        let mut forward = LogLinearHistogram::new();
        forward.merge(&a);
        forward.merge(&b);

        let mut reverse = LogLinearHistogram::new();
        reverse.merge(&b);
        reverse.merge(&a);

        prop_assert_eq!(forward.bins().collect::<Vec<_>>(), reverse.bins().collect::<Vec<_>>());
        prop_assert_eq!(forward.quantiles(&QUANTILES).unwrap(), reverse.quantiles(&QUANTILES).unwrap());
    }

    #[test]
    fn property_test_merge_matches_direct_recording(left in arb_values(), right in arb_values()) {
        // Recording everything into one histogram and merging two partial histograms must agree exactly.
        let mut merged = histogram_of(&left);
        merged.merge(&histogram_of(&right));

        let mut all = left.clone();
        all.extend_from_slice(&right);
        let direct = histogram_of(&all);

        prop_assert_eq!(merged.count(), direct.count());
        prop_assert_eq!(merged.bins().collect::<Vec<_>>(), direct.bins().collect::<Vec<_>>());
        prop_assert_eq!(merged.quantiles(&QUANTILES).unwrap(), direct.quantiles(&QUANTILES).unwrap());
    }

    #[test]
    fn property_test_estimates_within_observed_range(values in arb_values()) {
        let hist = histogram_of(&values);
        let min = values.iter().copied().fold(f64::MAX, f64::min);
        let max = values.iter().copied().fold(f64::MIN, f64::max);

        for estimate in hist.quantiles(&QUANTILES).unwrap() {
            prop_assert!(estimate >= min && estimate <= max);
        }
        prop_assert_eq!(hist.quantile(0.0).unwrap(), min);
        prop_assert_eq!(hist.quantile(1.0).unwrap(), max);
    }
}
