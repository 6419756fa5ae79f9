use std::cmp::Ordering;

use crate::error::{NonFiniteValue, SketchError, ValueOutOfRange};

// Smallest and largest mantissa magnitudes for a non-zero bin. Two significant digits.
const MANTISSA_MIN: i32 = 10;
const MANTISSA_MAX: i32 = 99;

/// A log-linear bin.
///
/// A bin is identified by a signed two-digit mantissa and a signed decimal exponent. A positive bin `(m, e)` covers
/// `[m × 10^e, (m + 1) × 10^e)`, while a negative bin `(-m, e)` covers `(-(m + 1) × 10^e, -m × 10^e]`. The bin
/// `(0, 0)` holds zero and every value too small to be represented by the smallest exponent.
///
/// Bins are ordered by the values they cover, from the most negative to the most positive.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Bin {
    mantissa: i8,
    exponent: i8,
}

impl Bin {
    /// The bin holding zero.
    pub const ZERO: Bin = Bin {
        mantissa: 0,
        exponent: 0,
    };

    /// Returns the bin that covers the given value.
    ///
    /// # Errors
    ///
    /// If the value is not finite, or its magnitude is too large for the exponent range, an error is returned.
    pub fn from_value(value: f64) -> Result<Self, SketchError> {
        if !value.is_finite() {
            return NonFiniteValue { value }.fail();
        }

        let magnitude = value.abs();
        if magnitude == 0.0 {
            return Ok(Self::ZERO);
        }

        let mut exponent = magnitude.log10().floor() as i32 - 1;
        let mut mantissa = scaled_mantissa(magnitude, exponent);

        // `log10` and the scaling can be off by one ulp near powers of ten.
        if mantissa > MANTISSA_MAX {
            exponent += 1;
            mantissa = scaled_mantissa(magnitude, exponent);
        } else if mantissa < MANTISSA_MIN {
            exponent -= 1;
            mantissa = scaled_mantissa(magnitude, exponent);
        }

        if exponent < i32::from(i8::MIN) {
            return Ok(Self::ZERO);
        }
        if exponent > i32::from(i8::MAX) {
            return ValueOutOfRange { value }.fail();
        }

        let mantissa = mantissa.clamp(MANTISSA_MIN, MANTISSA_MAX);
        let mantissa = if value < 0.0 { -mantissa } else { mantissa };

        Ok(Self {
            mantissa: mantissa as i8,
            exponent: exponent as i8,
        })
    }

    /// Returns the signed two-digit mantissa of this bin.
    pub fn mantissa(&self) -> i8 {
        self.mantissa
    }

    /// Returns the decimal exponent of this bin.
    pub fn exponent(&self) -> i8 {
        self.exponent
    }

    /// Returns `true` if this is the zero bin.
    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    /// Returns the width of the value range covered by this bin.
    pub fn width(&self) -> f64 {
        if self.is_zero() {
            0.0
        } else {
            power_of_ten(i32::from(self.exponent))
        }
    }

    /// Returns the lowest value covered by this bin.
    pub fn left(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }

        let mantissa = if self.mantissa < 0 {
            f64::from(self.mantissa) - 1.0
        } else {
            f64::from(self.mantissa)
        };
        mantissa * power_of_ten(i32::from(self.exponent))
    }

    fn sign(&self) -> i8 {
        self.mantissa.signum()
    }
}

impl Ord for Bin {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.sign().cmp(&other.sign()) {
            Ordering::Equal => {}
            unequal => return unequal,
        }

        let ours = (self.exponent, self.mantissa.unsigned_abs());
        let theirs = (other.exponent, other.mantissa.unsigned_abs());
        match self.sign() {
            // Larger magnitudes sort first on the negative side.
            -1 => theirs.cmp(&ours),
            0 => Ordering::Equal,
            _ => ours.cmp(&theirs),
        }
    }
}

impl PartialOrd for Bin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn power_of_ten(exponent: i32) -> f64 {
    10f64.powi(exponent)
}

fn scaled_mantissa(magnitude: f64, exponent: i32) -> i32 {
    // Multiplying by an exact power of ten is more precise than dividing by an inexact one.
    let scaled = if exponent < 0 {
        magnitude * power_of_ten(-exponent)
    } else {
        magnitude / power_of_ten(exponent)
    };
    scaled.floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(value: f64) -> Bin {
        Bin::from_value(value).unwrap()
    }

    #[test]
    fn zero_and_tiny_values_map_to_zero_bin() {
        assert_eq!(bin(0.0), Bin::ZERO);
        assert_eq!(bin(-0.0), Bin::ZERO);
        assert_eq!(bin(1.0e-200), Bin::ZERO);
        assert_eq!(bin(-1.0e-200), Bin::ZERO);
    }

    #[test]
    fn two_significant_digits() {
        let b = bin(123.456);
        assert_eq!(b.mantissa(), 12);
        assert_eq!(b.exponent(), 1);
        assert_eq!(b.left(), 120.0);
        assert_eq!(b.width(), 10.0);

        let b = bin(0.3);
        assert_eq!(b.mantissa(), 30);
        assert_eq!(b.exponent(), -2);

        let b = bin(1000.0);
        assert_eq!(b.mantissa(), 10);
        assert_eq!(b.exponent(), 2);

        let b = bin(99.9);
        assert_eq!(b.mantissa(), 99);
        assert_eq!(b.exponent(), 0);
    }

    #[test]
    fn negative_bins_mirror_positive_bins() {
        let b = bin(-123.456);
        assert_eq!(b.mantissa(), -12);
        assert_eq!(b.exponent(), 1);
        assert_eq!(b.left(), -130.0);
        assert_eq!(b.width(), 10.0);
    }

    #[test]
    fn value_is_inside_its_bin() {
        for value in [0.0017, 1.0, 3.75, 42.0, 999.0, 1234.5, 9999.9, 1.0e12] {
            let b = bin(value);
            let slack = value * 1.0e-12;
            assert!(b.left() <= value + slack, "{} < left {}", value, b.left());
            assert!(value < b.left() + b.width() + slack, "{} >= right of {:?}", value, b);
        }
    }

    #[test]
    fn rejects_non_finite_and_huge_values() {
        assert!(matches!(
            Bin::from_value(f64::NAN),
            Err(SketchError::NonFiniteValue { .. })
        ));
        assert!(matches!(
            Bin::from_value(f64::INFINITY),
            Err(SketchError::NonFiniteValue { .. })
        ));
        assert!(matches!(
            Bin::from_value(1.0e200),
            Err(SketchError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn ordering_follows_covered_values() {
        let mut bins = vec![bin(5.0), bin(-5.0), bin(0.0), bin(-500.0), bin(500.0), bin(0.05), bin(-0.05)];
        bins.sort();

        let lefts = bins.iter().map(Bin::left).collect::<Vec<_>>();
        let mut sorted = lefts.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(lefts, sorted);
        assert_eq!(bins[0], bin(-500.0));
        assert_eq!(bins[3], Bin::ZERO);
        assert_eq!(bins[6], bin(500.0));
    }
}
