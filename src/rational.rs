//! # Exact rational numbers
//!
//! A [`Rational`] is a ratio of two [`BigInt`]s kept in canonical form:
//! the denominator is positive, the sign lives on the numerator, and the
//! two are coprime. Canonical form makes structural equality coincide
//! with numeric equality, so `Eq`/`Ord`/`Hash` all agree.

use std::cmp::Ordering;
use std::fmt;

use crate::bigint::BigInt;
use crate::decimal::{BigDecimal, Context};
use crate::error::{NumericError, NumericResult};

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Rational {
    numerator: BigInt,
    denominator: BigInt,
}

impl Rational {
    /// Builds the canonical rational `n/d`: reduced by the GCD, sign on
    /// the numerator. A zero denominator is an error.
    pub fn new(numerator: BigInt, denominator: BigInt) -> NumericResult<Rational> {
        if denominator.is_zero() {
            return Err(NumericError::DivisionByZero);
        }

        // gcd is non-zero because the denominator is
        let g = numerator.gcd(&denominator);
        let (mut n, _) = numerator.div_rem(&g)?;
        let (mut d, _) = denominator.div_rem(&g)?;
        if d.is_negative() {
            n = n.negate();
            d = d.negate();
        }
        Ok(Rational {
            numerator: n,
            denominator: d,
        })
    }

    /// Wraps an already-reduced pair; the caller guarantees coprimality
    /// and a positive denominator.
    pub(crate) fn from_reduced(numerator: BigInt, denominator: BigInt) -> Rational {
        debug_assert!(denominator.is_positive());
        Rational {
            numerator,
            denominator,
        }
    }

    pub fn from_bigint(v: BigInt) -> Rational {
        Rational {
            numerator: v,
            denominator: BigInt::one(),
        }
    }

    pub fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    pub fn denominator(&self) -> &BigInt {
        &self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.numerator.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.numerator.is_negative()
    }

    pub fn signum(&self) -> i32 {
        self.numerator.signum()
    }

    /// True when the denominator reduced to one.
    pub fn is_integral(&self) -> bool {
        self.denominator == BigInt::one()
    }

    // ----- arithmetic -----

    pub fn add(&self, y: &Rational) -> NumericResult<Rational> {
        let n = self
            .numerator
            .multiply(&y.denominator)
            .add(&y.numerator.multiply(&self.denominator));
        Rational::new(n, self.denominator.multiply(&y.denominator))
    }

    pub fn subtract(&self, y: &Rational) -> NumericResult<Rational> {
        let n = self
            .numerator
            .multiply(&y.denominator)
            .subtract(&y.numerator.multiply(&self.denominator));
        Rational::new(n, self.denominator.multiply(&y.denominator))
    }

    pub fn multiply(&self, y: &Rational) -> NumericResult<Rational> {
        Rational::new(
            self.numerator.multiply(&y.numerator),
            self.denominator.multiply(&y.denominator),
        )
    }

    pub fn divide(&self, y: &Rational) -> NumericResult<Rational> {
        if y.is_zero() {
            return Err(NumericError::DivisionByZero);
        }
        Rational::new(
            self.numerator.multiply(&y.denominator),
            self.denominator.multiply(&y.numerator),
        )
    }

    pub fn negate(&self) -> Rational {
        Rational {
            numerator: self.numerator.negate(),
            denominator: self.denominator.clone(),
        }
    }

    pub fn abs(&self) -> Rational {
        if self.is_negative() {
            self.negate()
        } else {
            self.clone()
        }
    }

    // ----- conversions -----

    /// Truncates toward zero.
    pub fn to_bigint(&self) -> NumericResult<BigInt> {
        Ok(self.numerator.div_rem(&self.denominator)?.0)
    }

    /// Exact decimal quotient; fails when the expansion does not
    /// terminate (denominator with prime factors other than 2 and 5).
    pub fn to_big_decimal(&self) -> NumericResult<BigDecimal> {
        BigDecimal::from_bigint(self.numerator.clone())
            .divide(&BigDecimal::from_bigint(self.denominator.clone()))
    }

    pub fn to_big_decimal_ctx(&self, c: &Context) -> NumericResult<BigDecimal> {
        BigDecimal::from_bigint(self.numerator.clone())
            .divide_ctx(&BigDecimal::from_bigint(self.denominator.clone()), c)
    }

    /// Approximates through a 16-digit decimal division.
    pub fn to_f64(&self) -> f64 {
        match self.to_big_decimal_ctx(&Context::DECIMAL64) {
            Ok(d) => d.to_f64(),
            // Context division over non-zero denominator cannot fail, but
            // keep a sane value on the error path anyway.
            Err(_) => f64::NAN,
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Rational) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Rational) -> Ordering {
        // denominators are positive, so cross-multiplication preserves order
        self.numerator
            .multiply(&other.denominator)
            .cmp(&other.numerator.multiply(&self.denominator))
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rational({}/{})", self.numerator, self.denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(n: i64, d: i64) -> Rational {
        Rational::new(BigInt::from_i64(n), BigInt::from_i64(d)).unwrap()
    }

    #[test]
    fn test_canonical_form() {
        let r = rat(4, 6);
        assert_eq!(r.numerator(), &BigInt::from_i64(2));
        assert_eq!(r.denominator(), &BigInt::from_i64(3));

        // sign moves to the numerator
        let r = rat(4, -6);
        assert_eq!(r.numerator(), &BigInt::from_i64(-2));
        assert_eq!(r.denominator(), &BigInt::from_i64(3));

        let r = rat(-4, -6);
        assert!(r.is_positive());

        // zero is 0/1
        let r = rat(0, 5);
        assert_eq!(r.denominator(), &BigInt::one());

        assert!(Rational::new(BigInt::one(), BigInt::zero()).is_err());
    }

    #[test]
    fn test_equality_and_ordering() {
        assert_eq!(rat(1, 2), rat(2, 4));
        assert_ne!(rat(1, 2), rat(1, 3));
        assert!(rat(1, 3) < rat(1, 2));
        assert!(rat(-1, 2) < rat(1, 3));
        assert!(rat(7, 2) > rat(3, 1));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(rat(1, 2).add(&rat(1, 3)).unwrap(), rat(5, 6));
        assert_eq!(rat(1, 2).subtract(&rat(1, 3)).unwrap(), rat(1, 6));
        assert_eq!(rat(2, 3).multiply(&rat(3, 4)).unwrap(), rat(1, 2));
        assert_eq!(rat(1, 2).divide(&rat(1, 4)).unwrap(), rat(2, 1));
        assert!(rat(1, 2).divide(&rat(0, 1)).is_err());
        assert_eq!(rat(-1, 2).abs(), rat(1, 2));
        assert_eq!(rat(1, 2).negate(), rat(-1, 2));
    }

    #[test]
    fn test_reduction_after_arithmetic() {
        // 1/6 + 1/6 = 2/6 reduces to 1/3
        let r = rat(1, 6).add(&rat(1, 6)).unwrap();
        assert_eq!(r, rat(1, 3));
        // multiply collapsing to an integer value
        let r = rat(3, 2).multiply(&rat(2, 3)).unwrap();
        assert!(r.is_integral());
        assert_eq!(r.numerator(), &BigInt::one());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(rat(7, 2).to_bigint().unwrap(), BigInt::from_i64(3));
        assert_eq!(rat(-7, 2).to_bigint().unwrap(), BigInt::from_i64(-3));
        assert_eq!(rat(1, 4).to_big_decimal().unwrap().to_string(), "0.25");
        assert!(rat(1, 3).to_big_decimal().is_err());
        let d = rat(1, 3)
            .to_big_decimal_ctx(&Context::DECIMAL64)
            .unwrap()
            .to_string();
        assert_eq!(d, "0.3333333333333333");
        assert!((rat(1, 2).to_f64() - 0.5).abs() < 1e-15);
        assert!((rat(1, 3).to_f64() - 1.0 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn test_display() {
        assert_eq!(rat(7, 2).to_string(), "7/2");
        assert_eq!(rat(-7, 2).to_string(), "-7/2");
    }
}
