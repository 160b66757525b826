//! # Scaled arbitrary-precision decimals
//!
//! A [`BigDecimal`] is `coefficient * 10^exponent` with a [`BigInt`]
//! coefficient, a 32-bit exponent and a lazily computed digit count.
//! Rounding behavior is controlled by a [`Context`] (precision plus one of
//! eight rounding modes); precision 0 means unlimited.
//!
//! Exponent arithmetic is carried out in 64 bits and checked back into
//! `i32`. When the true exponent leaves that range but the coefficient is
//! zero, the exponent clamps to the signed extreme instead of erroring
//! (zero's exponent is immaterial to the value).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use once_cell::sync::{Lazy, OnceCell};

use crate::bigint::BigInt;
use crate::error::{NumericError, NumericResult};

const DOUBLE_EXPONENT_BIAS: i32 = 1023;
const DOUBLE_SIGNIFICAND_BITS: i32 = 52;
const DOUBLE_SHIFT_BIAS: i32 = DOUBLE_EXPONENT_BIAS + DOUBLE_SIGNIFICAND_BITS;

/// How a result is rounded to fit a context's precision.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RoundingMode {
    /// Away from zero.
    Up,
    /// Toward zero (truncation).
    Down,
    /// Toward positive infinity.
    Ceiling,
    /// Toward negative infinity.
    Floor,
    /// Nearest neighbor; ties away from zero.
    HalfUp,
    /// Nearest neighbor; ties toward zero.
    HalfDown,
    /// Nearest neighbor; ties to the even neighbor (banker's rounding).
    HalfEven,
    /// No rounding allowed; inexact results are an error.
    Unnecessary,
}

/// Precision and rounding mode for decimal operations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Context {
    precision: u32,
    rounding: RoundingMode,
}

impl Context {
    /// IEEE 754 decimal32: 7 digits, half-even.
    pub const DECIMAL32: Context = Context {
        precision: 7,
        rounding: RoundingMode::HalfEven,
    };
    /// IEEE 754 decimal64: 16 digits, half-even.
    pub const DECIMAL64: Context = Context {
        precision: 16,
        rounding: RoundingMode::HalfEven,
    };
    /// IEEE 754 decimal128: 34 digits, half-even.
    pub const DECIMAL128: Context = Context {
        precision: 34,
        rounding: RoundingMode::HalfEven,
    };
    /// No precision limit; no rounding ever happens.
    pub const UNLIMITED: Context = Context {
        precision: 0,
        rounding: RoundingMode::HalfUp,
    };
    /// General-purpose default: 9 digits, half-up.
    pub const BASIC_DEFAULT: Context = Context {
        precision: 9,
        rounding: RoundingMode::HalfUp,
    };

    /// A context with the given precision, rounding half-up.
    pub fn new(precision: u32) -> Context {
        Context {
            precision,
            rounding: RoundingMode::HalfUp,
        }
    }

    pub fn with_mode(precision: u32, rounding: RoundingMode) -> Context {
        Context {
            precision,
            rounding,
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn rounding_mode(&self) -> RoundingMode {
        self.rounding
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "precision={} roundingMode={:?}",
            self.precision, self.rounding
        )
    }
}

/// Immutable scaled decimal: `coefficient * 10^exponent`.
#[derive(Clone)]
pub struct BigDecimal {
    coeff: BigInt,
    exp: i32,
    /// Digit count of the coefficient, computed on first use. A zero
    /// coefficient counts as one digit.
    precision: OnceCell<u32>,
}

static POWERS_OF_TEN: Lazy<Vec<BigInt>> = Lazy::new(|| {
    let mut v = Vec::with_capacity(12);
    let mut p = BigInt::one();
    let ten = BigInt::ten();
    for _ in 0..12 {
        v.push(p.clone());
        p = p.multiply(&ten);
    }
    v
});

fn pow_of_ten(n: u32) -> BigInt {
    if (n as usize) < POWERS_OF_TEN.len() {
        return POWERS_OF_TEN[n as usize].clone();
    }
    let mut result = BigInt::one();
    let mut base = BigInt::ten();
    let mut e = n;
    loop {
        if e & 1 == 1 {
            result = result.multiply(&base);
        }
        e >>= 1;
        if e == 0 {
            break;
        }
        base = base.multiply(&base);
    }
    result
}

/// Reduces the result of 64-bit exponent arithmetic back to `i32`. Out of
/// range with a zero coefficient clamps to the extreme; otherwise errors.
fn check_exponent(candidate: i64, is_zero: bool) -> NumericResult<i32> {
    if let Ok(exp) = i32::try_from(candidate) {
        return Ok(exp);
    }
    if is_zero {
        Ok(if candidate > i32::MAX as i64 {
            i32::MAX
        } else {
            i32::MIN
        })
    } else {
        Err(NumericError::ExponentOverflow)
    }
}

fn clamp_exponent(candidate: i64) -> i32 {
    candidate.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl BigDecimal {
    pub fn new(coeff: BigInt, exp: i32) -> BigDecimal {
        BigDecimal {
            coeff,
            exp,
            precision: OnceCell::new(),
        }
    }

    fn with_precision(coeff: BigInt, exp: i32, precision: u32) -> BigDecimal {
        let cell = OnceCell::new();
        if precision > 0 {
            let _ = cell.set(precision);
        }
        BigDecimal {
            coeff,
            exp,
            precision: cell,
        }
    }

    pub fn zero() -> BigDecimal {
        BigDecimal::with_precision(BigInt::zero(), 0, 1)
    }

    pub fn one() -> BigDecimal {
        BigDecimal::with_precision(BigInt::one(), 0, 1)
    }

    pub fn ten() -> BigDecimal {
        BigDecimal::with_precision(BigInt::ten(), 0, 2)
    }

    // ----- factories -----

    pub fn from_i32(v: i32) -> BigDecimal {
        BigDecimal::new(BigInt::from_i32(v), 0)
    }

    pub fn from_i64(v: i64) -> BigDecimal {
        BigDecimal::new(BigInt::from_i64(v), 0)
    }

    pub fn from_u64(v: u64) -> BigDecimal {
        BigDecimal::new(BigInt::from_u64(v), 0)
    }

    pub fn from_bigint(v: BigInt) -> BigDecimal {
        BigDecimal::new(v, 0)
    }

    pub fn from_i64_ctx(v: i64, c: &Context) -> NumericResult<BigDecimal> {
        BigDecimal::from_i64(v).round_ctx(c)
    }

    pub fn from_bigint_ctx(v: BigInt, c: &Context) -> NumericResult<BigDecimal> {
        BigDecimal::from_bigint(v).round_ctx(c)
    }

    /// Exact conversion of a finite double. Note that the result is the
    /// exact binary value, so `try_from_f64(0.1)` is not `parse("0.1")`.
    pub fn try_from_f64(v: f64) -> NumericResult<BigDecimal> {
        if v.is_nan() || v.is_infinite() {
            return Err(NumericError::Domain(
                "Infinity/NaN not supported in decimals".into(),
            ));
        }

        let bits = v.to_bits();
        let biased_exp = ((bits >> DOUBLE_SIGNIFICAND_BITS) & 0x7FF) as i32;
        let significand = bits & 0x000F_FFFF_FFFF_FFFF;
        let mut left_shift = biased_exp - DOUBLE_SHIFT_BIAS;

        let coeff;
        if significand == 0 {
            if biased_exp == 0 {
                return Ok(BigDecimal::zero());
            }
            coeff = if v < 0.0 {
                BigInt::negative_one()
            } else {
                BigInt::one()
            };
            left_shift = biased_exp - DOUBLE_EXPONENT_BIAS;
        } else {
            let c = BigInt::from_u64(significand | 0x0010_0000_0000_0000);
            coeff = if v < 0.0 { c.negate() } else { c };
        }

        // v = coeff * 2^left_shift; fold the binary exponent into powers
        // of ten (2^-n * 10^n = 5^n).
        let mut exp_to_use = 0;
        let coeff = if left_shift < 0 {
            exp_to_use = left_shift;
            coeff.multiply(&BigInt::five().power(-left_shift)?)
        } else if left_shift > 0 {
            coeff.shift_left(left_shift)
        } else {
            coeff
        };

        Ok(BigDecimal::new(coeff, exp_to_use))
    }

    pub fn try_from_f64_ctx(v: f64, c: &Context) -> NumericResult<BigDecimal> {
        BigDecimal::try_from_f64(v)?.round_ctx(c)
    }

    // ----- parsing -----

    /// Parses `[+-]?digit*(.digit*)?([eE][+-]?digit+)?`; at least one digit
    /// must appear in the integer or fraction part. Trailing fractional
    /// zeros are normalized away, so `"123.450"` yields coefficient 12345
    /// at exponent -2; integer trailing zeros are significant and stay.
    pub fn parse(s: &str) -> NumericResult<BigDecimal> {
        let buf = s.as_bytes();
        if buf.is_empty() {
            return Err(NumericError::Format("empty string".into()));
        }

        let mut pos = 0;

        let has_sign = matches!(buf[0], b'-' | b'+');
        if has_sign {
            pos += 1;
        }

        while pos < buf.len() && buf[pos].is_ascii_digit() {
            pos += 1;
        }
        let signed_main_len = pos;
        let main_len = signed_main_len - usize::from(has_sign);

        let mut fraction_offset = pos;
        let mut fraction_len = 0;
        if pos < buf.len() && buf[pos] == b'.' {
            pos += 1;
            fraction_offset = pos;
            while pos < buf.len() && buf[pos].is_ascii_digit() {
                pos += 1;
            }
            fraction_len = pos - fraction_offset;
        }

        let mut exp_val: i64 = 0;
        if pos < buf.len() && (buf[pos] == b'e' || buf[pos] == b'E') {
            pos += 1;
            if pos == buf.len() {
                return Err(NumericError::Format("missing exponent".into()));
            }
            let exp_negative = buf[pos] == b'-';
            if matches!(buf[pos], b'-' | b'+') {
                pos += 1;
            }
            let exp_start = pos;
            while pos < buf.len() && buf[pos].is_ascii_digit() {
                exp_val = exp_val
                    .saturating_mul(10)
                    .saturating_add((buf[pos] - b'0') as i64);
                pos += 1;
            }
            if pos == exp_start {
                return Err(NumericError::Format("missing exponent".into()));
            }
            if exp_negative {
                exp_val = -exp_val;
            }
        }

        if pos != buf.len() {
            return Err(NumericError::Format("unused characters at end".into()));
        }

        let mut precision = main_len + fraction_len;
        if precision == 0 {
            return Err(NumericError::Format("no digits in coefficient".into()));
        }

        let mut digits = Vec::with_capacity(signed_main_len + fraction_len);
        digits.extend_from_slice(&buf[..signed_main_len]);
        digits.extend_from_slice(&buf[fraction_offset..fraction_offset + fraction_len]);
        // the collected bytes are a valid integer literal
        let coeff = BigInt::parse(std::str::from_utf8(&digits).unwrap_or(""))?;

        let mut exp_to_use = -(fraction_len as i64);
        if exp_val != 0 {
            exp_to_use = check_exponent(exp_to_use + exp_val, coeff.is_zero())? as i64;
        }

        // Leading zeros do not count toward precision (minimum one digit).
        let mut i = usize::from(has_sign);
        while i < signed_main_len + fraction_len && precision > 1 && digits[i] == b'0' {
            precision -= 1;
            i += 1;
        }

        BigDecimal::with_precision(coeff, exp_to_use as i32, precision as u32)
            .strip_zeros_to(0)
    }

    pub fn parse_ctx(s: &str, c: &Context) -> NumericResult<BigDecimal> {
        BigDecimal::parse(s)?.round_ctx(c)
    }

    // ----- accessors -----

    pub fn coefficient(&self) -> &BigInt {
        &self.coeff
    }

    pub fn exponent(&self) -> i32 {
        self.exp
    }

    /// Digit count of the coefficient; computed on first call and cached.
    pub fn precision(&self) -> u32 {
        *self.precision.get_or_init(|| {
            if self.coeff.is_zero() {
                1
            } else {
                self.coeff.precision()
            }
        })
    }

    pub fn is_zero(&self) -> bool {
        self.coeff.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.coeff.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.coeff.is_negative()
    }

    pub fn signum(&self) -> i32 {
        self.coeff.signum()
    }

    // ----- arithmetic -----

    /// Exact sum: align to the smaller exponent, add coefficients.
    pub fn add(&self, y: &BigDecimal) -> BigDecimal {
        let (a, b) = align(self, y);
        BigDecimal::new(a.coeff.add(&b.coeff), a.exp)
    }

    pub fn add_ctx(&self, y: &BigDecimal, c: &Context) -> NumericResult<BigDecimal> {
        let result = self.add(y);
        if c.precision == 0 || c.rounding == RoundingMode::Unnecessary {
            return Ok(result);
        }
        round(&result, c)
    }

    pub fn subtract(&self, y: &BigDecimal) -> BigDecimal {
        let (a, b) = align(self, y);
        BigDecimal::new(a.coeff.subtract(&b.coeff), a.exp)
    }

    pub fn subtract_ctx(&self, y: &BigDecimal, c: &Context) -> NumericResult<BigDecimal> {
        let result = self.subtract(y);
        if c.precision == 0 || c.rounding == RoundingMode::Unnecessary {
            return Ok(result);
        }
        round(&result, c)
    }

    pub fn negate(&self) -> BigDecimal {
        if self.coeff.is_zero() {
            return self.clone();
        }
        BigDecimal {
            coeff: self.coeff.negate(),
            exp: self.exp,
            precision: self.precision.clone(),
        }
    }

    pub fn negate_ctx(&self, c: &Context) -> NumericResult<BigDecimal> {
        self.negate().round_ctx(c)
    }

    pub fn abs(&self) -> BigDecimal {
        if self.coeff.is_negative() {
            self.negate()
        } else {
            self.clone()
        }
    }

    pub fn abs_ctx(&self, c: &Context) -> NumericResult<BigDecimal> {
        self.abs().round_ctx(c)
    }

    /// Exact product: coefficient product at the summed exponent.
    pub fn multiply(&self, y: &BigDecimal) -> NumericResult<BigDecimal> {
        let coeff = self.coeff.multiply(&y.coeff);
        let exp = check_exponent(self.exp as i64 + y.exp as i64, coeff.is_zero())?;
        Ok(BigDecimal::new(coeff, exp))
    }

    pub fn multiply_ctx(&self, y: &BigDecimal, c: &Context) -> NumericResult<BigDecimal> {
        self.multiply(y)?.round_ctx(c)
    }

    /// Exact division. Fails with [`NumericError::RoundingRequired`] when
    /// the quotient has no terminating decimal expansion.
    ///
    /// A terminating quotient can need no more than
    /// `dividend.precision + ceil(10 * divisor.precision / 3)` digits, so
    /// the division runs once at that precision with no rounding allowed,
    /// then rescales toward the preferred exponent
    /// (`dividend.exponent - divisor.exponent`).
    pub fn divide(&self, divisor: &BigDecimal) -> NumericResult<BigDecimal> {
        // 0/0 has an undefined result; it reports the same error kind
        if divisor.coeff.is_zero() {
            return Err(NumericError::DivisionByZero);
        }

        let preferred_exp = clamp_exponent(self.exp as i64 - divisor.exp as i64);

        if self.coeff.is_zero() {
            return Ok(BigDecimal::new(BigInt::zero(), preferred_exp));
        }

        let working_precision = (self.precision() as i64
            + (10 * divisor.precision() as i64 + 2) / 3)
            .min(i32::MAX as i64) as u32;
        log::trace!("exact divide at working precision {}", working_precision);
        let c = Context::with_mode(working_precision, RoundingMode::Unnecessary);

        let quotient = self.divide_ctx(divisor, &c).map_err(|e| match e {
            NumericError::RoundingRequired(_) => NumericError::RoundingRequired(
                "non-terminating decimal expansion; no exact representable decimal result"
                    .into(),
            ),
            other => other,
        })?;

        if preferred_exp < quotient.exp {
            return rescale(&quotient, preferred_exp, RoundingMode::Unnecessary);
        }
        Ok(quotient)
    }

    /// Division rounded to the context's precision.
    ///
    /// The operands are scaled so the coefficient ratio lands in (0.1, 1],
    /// one integer division at the target precision produces the rounded
    /// coefficient, and exact quotients are stripped of trailing zeros back
    /// toward the preferred exponent.
    pub fn divide_ctx(&self, rhs: &BigDecimal, c: &Context) -> NumericResult<BigDecimal> {
        if c.precision == 0 {
            return self.divide(rhs);
        }

        let preferred_exp = self.exp as i64 - rhs.exp as i64;

        if rhs.coeff.is_zero() {
            return Err(NumericError::DivisionByZero);
        }
        if self.coeff.is_zero() {
            return Ok(BigDecimal::new(BigInt::zero(), clamp_exponent(preferred_exp)));
        }

        let xprec = self.precision() as i64;
        let yprec = rhs.precision() as i64;

        let mut x = self.coeff.clone();
        let mut y = rhs.coeff.clone();

        // Scale the shorter magnitude so both have the same digit count,
        // then nudge y up a decade if needed to pin x/y into (0.1, 1].
        let xtest = if xprec < yprec {
            x.abs().multiply(&pow_of_ten((yprec - xprec) as u32))
        } else {
            x.abs()
        };
        let ytest = if xprec > yprec {
            y.abs().multiply(&pow_of_ten((xprec - yprec) as u32))
        } else {
            y.abs()
        };

        let mut adjust = 0;
        if ytest < xtest {
            y = y.multiply(&BigInt::ten());
            adjust = 1;
        }

        let delta = c.precision as i64 - (xprec - yprec);
        if delta > 0 {
            x = x.multiply(&pow_of_ten(delta as u32));
        } else if delta < 0 {
            y = y.multiply(&pow_of_ten((-delta) as u32));
        }

        let rounded = rounding_divide(&x, &y, c.rounding)?;
        let exp = check_exponent(preferred_exp - delta + adjust, rounded.is_zero())?;
        let result = round(&BigDecimal::new(rounded, exp), c)?;

        // Exact quotients follow the preferred-scale rules.
        if result.multiply(rhs)?.compare_to(self) == Ordering::Equal {
            return result.strip_zeros_to(preferred_exp);
        }
        Ok(result)
    }

    /// Truncating integer quotient; the result always has exponent 0.
    pub fn divide_integer(&self, y: &BigDecimal) -> NumericResult<BigDecimal> {
        let preferred_exp = 0;

        if self.abs().compare_to(&y.abs()) == Ordering::Less {
            return Ok(BigDecimal::new(BigInt::zero(), preferred_exp));
        }

        if self.coeff.is_zero() && !y.coeff.is_zero() {
            return rescale(self, preferred_exp, RoundingMode::Unnecessary);
        }

        // Enough digits to round to a correct integer value.
        let max_digits = (self.precision() as i64
            + (10 * y.precision() as i64 + 2) / 3
            + (self.exp as i64 - y.exp as i64).abs()
            + 2)
        .min(i32::MAX as i64) as u32;

        let mut quotient =
            self.divide_ctx(y, &Context::with_mode(max_digits, RoundingMode::Down))?;
        if quotient.exp < 0 {
            quotient = rescale(&quotient, 0, RoundingMode::Down)?
                .strip_zeros_to(preferred_exp as i64)?;
        }

        if quotient.exp > preferred_exp {
            // pad with zeros down to exponent 0
            quotient = rescale(&quotient, preferred_exp, RoundingMode::Unnecessary)?;
        }

        Ok(quotient)
    }

    /// Integer quotient limited to the context's precision; errors when the
    /// integer part needs more digits than the context allows.
    pub fn divide_integer_ctx(&self, y: &BigDecimal, c: &Context) -> NumericResult<BigDecimal> {
        if c.precision == 0 || self.abs().compare_to(&y.abs()) == Ordering::Less {
            return self.divide_integer(y);
        }

        let preferred_exp = 0;

        let result = self.divide_ctx(y, &Context::with_mode(c.precision, RoundingMode::Down))?;
        let result_exp = result.exp;

        let result = if result_exp > 0 {
            // The quotient came out as a scaled integer. It only stands for
            // the full integer part when the computed remainder is smaller
            // than the divisor.
            let product = result.multiply(y)?;
            if self.subtract(&product).abs().compare_to(&y.abs()) != Ordering::Less {
                return Err(NumericError::RoundingRequired("division impossible".into()));
            }
            result
        } else if result_exp < 0 {
            // Integer part fits; recompute at exponent 0 to avoid double
            // rounding.
            rescale(&result, 0, RoundingMode::Down)?
        } else {
            result
        };

        if preferred_exp < result_exp && c.precision as i64 - result.precision() as i64 > 0 {
            rescale(&result, 0, RoundingMode::Unnecessary)
        } else {
            result.strip_zeros_to(preferred_exp as i64)
        }
    }

    /// Remainder satisfying `self = quotient * y + remainder`; carries the
    /// dividend's sign.
    pub fn rem(&self, y: &BigDecimal) -> NumericResult<BigDecimal> {
        Ok(self.div_rem(y)?.1)
    }

    pub fn rem_ctx(&self, y: &BigDecimal, c: &Context) -> NumericResult<BigDecimal> {
        Ok(self.div_rem_ctx(y, c)?.1)
    }

    pub fn div_rem(&self, y: &BigDecimal) -> NumericResult<(BigDecimal, BigDecimal)> {
        let q = self.divide_integer(y)?;
        let r = self.subtract(&q.multiply(y)?);
        Ok((q, r))
    }

    pub fn div_rem_ctx(
        &self,
        y: &BigDecimal,
        c: &Context,
    ) -> NumericResult<(BigDecimal, BigDecimal)> {
        if c.rounding == RoundingMode::Unnecessary {
            return self.div_rem(y);
        }
        let q = self.divide_integer_ctx(y, c)?;
        let r = self.subtract(&q.multiply(y)?);
        Ok((q, r))
    }

    /// Exact power; `n` must lie in `0..=999_999_999`.
    pub fn power(&self, n: i32) -> NumericResult<BigDecimal> {
        if !(0..=999_999_999).contains(&n) {
            return Err(NumericError::Domain("invalid power exponent".into()));
        }
        let exp = check_exponent(self.exp as i64 * n as i64, self.coeff.is_zero())?;
        Ok(BigDecimal::new(self.coeff.power(n)?, exp))
    }

    /// Rounded power (ANSI X3.274 rules): repeated squaring at a working
    /// precision of `c.precision + digits(n) + 1`; a negative `n` computes
    /// the positive power and takes the reciprocal.
    pub fn power_ctx(&self, n: i32, c: &Context) -> NumericResult<BigDecimal> {
        if c.precision == 0 {
            return self.power(n);
        }
        if !(-999_999_999..=999_999_999).contains(&n) {
            return Err(NumericError::Domain("invalid power exponent".into()));
        }
        if n == 0 {
            return Ok(BigDecimal::one());
        }

        let mag = n.unsigned_abs();
        let elength = decimal_digits(mag);
        if elength > c.precision {
            // X3.274 rule
            return Err(NumericError::Domain("invalid power exponent".into()));
        }
        let workc = Context::with_mode(c.precision + elength + 1, c.rounding);

        let mut acc = BigDecimal::one();
        let mut seen_bit = false;
        for bit in (0..31).rev() {
            if seen_bit {
                acc = acc.multiply_ctx(&acc, &workc)?;
            }
            if (mag >> bit) & 1 == 1 {
                acc = acc.multiply_ctx(self, &workc)?;
                seen_bit = true;
            }
        }

        if n < 0 {
            acc = BigDecimal::one().divide_ctx(&acc, &workc)?;
        }
        round(&acc, c)
    }

    // ----- rounding / rescaling -----

    /// Rounds to the context's precision; a context with precision 0 is a
    /// no-op.
    pub fn round_ctx(&self, c: &Context) -> NumericResult<BigDecimal> {
        if c.precision == 0 {
            return Ok(self.clone());
        }
        round(self, c)
    }

    /// Rounds this value to the same exponent as `v`.
    pub fn quantize(&self, v: &BigDecimal, mode: RoundingMode) -> NumericResult<BigDecimal> {
        rescale(self, v.exp, mode)
    }

    /// Removes all insignificant trailing zeros.
    pub fn strip_trailing_zeros(&self) -> NumericResult<BigDecimal> {
        self.clone().strip_zeros_to(i64::MAX)
    }

    /// Divides the coefficient by ten while it stays exact and the exponent
    /// is below the preferred one.
    fn strip_zeros_to(self, preferred_exp: i64) -> NumericResult<BigDecimal> {
        let mut coeff = self.coeff;
        let mut exp = self.exp;
        let mut precision = self.precision.get().copied();
        let ten = BigInt::ten();

        while coeff.abs().cmp(&ten) != Ordering::Less && (exp as i64) < preferred_exp {
            if coeff.is_odd() {
                break; // odd numbers cannot end in 0
            }
            let (q, r) = coeff.div_rem(&ten)?;
            if !r.is_zero() {
                break;
            }
            coeff = q;
            exp = check_exponent(exp as i64 + 1, coeff.is_zero())?;
            if let Some(p) = precision.as_mut() {
                if *p > 1 {
                    *p -= 1;
                }
            }
        }

        Ok(match precision {
            Some(p) => BigDecimal::with_precision(coeff, exp, p),
            None => BigDecimal::new(coeff, exp),
        })
    }

    pub fn move_point_right(&self, n: i32) -> NumericResult<BigDecimal> {
        let exp = check_exponent(self.exp as i64 + n as i64, self.coeff.is_zero())?;
        Ok(BigDecimal::new(self.coeff.clone(), exp))
    }

    pub fn move_point_left(&self, n: i32) -> NumericResult<BigDecimal> {
        let exp = check_exponent(self.exp as i64 - n as i64, self.coeff.is_zero())?;
        Ok(BigDecimal::new(self.coeff.clone(), exp))
    }

    // ----- comparison -----

    /// Numeric ordering, independent of scale: `1.0` and `1.00` compare
    /// equal even though they are structurally distinct.
    pub fn compare_to(&self, other: &BigDecimal) -> Ordering {
        let (a, b) = align(self, other);
        a.coeff.cmp(&b.coeff)
    }

    // ----- conversions -----

    /// Truncates toward zero to an integer.
    pub fn to_bigint(&self) -> NumericResult<BigInt> {
        Ok(rescale(self, 0, RoundingMode::Down)?.coeff)
    }

    pub fn to_i64(&self) -> NumericResult<i64> {
        self.to_bigint()?.to_i64()
    }

    pub fn to_i32(&self) -> NumericResult<i32> {
        self.to_bigint()?.to_i32()
    }

    pub fn to_f64(&self) -> f64 {
        self.coeff.to_f64() * 10f64.powi(self.exp)
    }

    /// Canonical string form: plain notation when `exponent <= 0` and the
    /// adjusted exponent is at least -6, exponential notation otherwise.
    pub fn to_scientific_string(&self) -> String {
        let mut sb = self.coeff.to_string();
        let neg_offset = usize::from(self.coeff.is_negative());
        let coeff_len = sb.len() - neg_offset;

        let adjusted_exp = self.exp as i64 + coeff_len as i64 - 1;
        if self.exp <= 0 && adjusted_exp >= -6 {
            if self.exp != 0 {
                let num_dec = -(self.exp as i64) as usize;
                match num_dec.cmp(&coeff_len) {
                    Ordering::Less => sb.insert(coeff_len - num_dec + neg_offset, '.'),
                    Ordering::Equal => sb.insert_str(neg_offset, "0."),
                    Ordering::Greater => {
                        let num_zeros = num_dec - coeff_len;
                        sb.insert_str(neg_offset, &"0".repeat(num_zeros));
                        sb.insert_str(neg_offset, "0.");
                    }
                }
            }
        } else {
            if coeff_len > 1 {
                sb.insert(neg_offset + 1, '.');
            }
            sb.push('E');
            if adjusted_exp >= 0 {
                sb.push('+');
            }
            sb.push_str(&adjusted_exp.to_string());
        }
        sb
    }
}

/// Structural equality: equal exponent and equal coefficient. `1.0` and
/// `1.00` are unequal here; use [`BigDecimal::compare_to`] for numeric
/// comparison.
impl PartialEq for BigDecimal {
    fn eq(&self, other: &BigDecimal) -> bool {
        self.exp == other.exp && self.coeff == other.coeff
    }
}

impl Eq for BigDecimal {}

impl Hash for BigDecimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coeff.hash(state);
        self.exp.hash(state);
    }
}

impl fmt::Display for BigDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.to_scientific_string())
    }
}

impl fmt::Debug for BigDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigDecimal({})", self.to_scientific_string())
    }
}

/// Brings two values to a common (the smaller) exponent by multiplying the
/// larger-exponent coefficient by a power of ten. Never loses information.
fn align(x: &BigDecimal, y: &BigDecimal) -> (BigDecimal, BigDecimal) {
    if y.exp > x.exp {
        (x.clone(), compute_align(y, x))
    } else if x.exp > y.exp {
        (compute_align(x, y), y.clone())
    } else {
        (x.clone(), y.clone())
    }
}

fn compute_align(big: &BigDecimal, small: &BigDecimal) -> BigDecimal {
    let delta = (big.exp as i64 - small.exp as i64) as u64 as u32;
    BigDecimal::new(big.coeff.multiply(&pow_of_ten(delta)), small.exp)
}

/// Rounds `v` to the context's precision by dropping excess coefficient
/// digits. A carry out of the rounding can lengthen the coefficient again
/// (999 -> 1000), so the result re-rounds until it fits.
fn round(v: &BigDecimal, c: &Context) -> NumericResult<BigDecimal> {
    let vprec = v.precision() as i64;
    let drop = vprec - c.precision as i64;
    if drop <= 0 {
        return Ok(v.clone());
    }

    let divisor = pow_of_ten(drop as u32);
    let rounded = rounding_divide(&v.coeff, &divisor, c.rounding)?;
    let exp = check_exponent(v.exp as i64 + drop, rounded.is_zero())?;
    let result = BigDecimal::new(rounded, exp);

    if c.precision > 0 {
        return round(&result, c);
    }
    Ok(result)
}

/// `x / y` rounded per the mode, applied to the quotient/remainder pair of
/// the integer division. Increment always moves away from zero; the mode
/// decides whether it happens.
fn rounding_divide(x: &BigInt, y: &BigInt, mode: RoundingMode) -> NumericResult<BigInt> {
    let (q, r) = x.div_rem(y)?;

    if r.is_zero() {
        return Ok(q);
    }

    // True quotient sign; q itself may have rounded to zero.
    let is_neg = q.is_negative() || (q.is_zero() && x.signum() * y.signum() < 0);

    let increment = match mode {
        RoundingMode::Unnecessary => {
            return Err(NumericError::RoundingRequired(
                "rounding is required but prohibited".into(),
            ));
        }
        RoundingMode::Ceiling => !is_neg,
        RoundingMode::Floor => is_neg,
        RoundingMode::Down => false,
        RoundingMode::Up => true,
        RoundingMode::HalfDown | RoundingMode::HalfUp | RoundingMode::HalfEven => {
            let cmp = r.add(&r).abs().cmp(&y.abs());
            match mode {
                RoundingMode::HalfDown => cmp == Ordering::Greater,
                RoundingMode::HalfUp => cmp != Ordering::Less,
                _ => cmp == Ordering::Greater || (cmp == Ordering::Equal && q.is_odd()),
            }
        }
    };

    if increment {
        if is_neg {
            Ok(q.subtract(&BigInt::one()))
        } else {
            Ok(q.add(&BigInt::one()))
        }
    } else {
        Ok(q)
    }
}

/// Forces a value to a target exponent: padding the coefficient with zeros
/// when the exponent decreases, rounding digits away when it increases.
/// Rounding can carry and land one decade high (9.9999 -> 10.0), in which
/// case the rescale repeats.
pub fn rescale(lhs: &BigDecimal, new_exponent: i32, mode: RoundingMode) -> NumericResult<BigDecimal> {
    let delta = check_exponent(lhs.exp as i64 - new_exponent as i64, false)?;

    if delta == 0 {
        return Ok(lhs.clone());
    }

    if lhs.coeff.is_zero() {
        return Ok(BigDecimal::new(BigInt::zero(), new_exponent));
    }

    if delta < 0 {
        // Rounding away digits: the new precision must stay positive, else
        // the whole coefficient rounds away.
        let decrease = (-(delta as i64)) as u32;
        let p = lhs.precision();
        if p < decrease {
            return Ok(BigDecimal::new(BigInt::zero(), new_exponent));
        }
        let new_precision = p - decrease;

        let r = round(lhs, &Context::with_mode(new_precision, mode))?;
        if r.exp == new_exponent {
            return Ok(r);
        }
        return rescale(&r, new_exponent, mode);
    }

    let new_coeff = lhs.coeff.multiply(&pow_of_ten(delta as u32));
    Ok(match lhs.precision.get() {
        Some(p) => BigDecimal::with_precision(new_coeff, new_exponent, p + delta as u32),
        None => BigDecimal::new(new_coeff, new_exponent),
    })
}

fn decimal_digits(mut v: u32) -> u32 {
    let mut digits = 1;
    while v >= 10 {
        v /= 10;
        digits += 1;
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::parse(s).unwrap()
    }

    #[test]
    fn test_parse_basic() {
        let v = dec("123.450");
        assert_eq!(v.coefficient(), &BigInt::from_i64(12345));
        assert_eq!(v.exponent(), -2);
        assert_eq!(v.precision(), 5);
        assert_eq!(v.to_string(), "123.45");

        let v = dec("-0.00123");
        assert_eq!(v.coefficient(), &BigInt::from_i64(-123));
        assert_eq!(v.exponent(), -5);
        assert_eq!(v.precision(), 3);

        let v = dec("1.5e10");
        assert_eq!(v.coefficient(), &BigInt::from_i64(15));
        assert_eq!(v.exponent(), 9);

        let v = dec("2E-3");
        assert_eq!(v.exponent(), -3);

        assert_eq!(dec(".5").coefficient(), &BigInt::from_i64(5));
        assert_eq!(dec("7.").coefficient(), &BigInt::from_i64(7));
        assert_eq!(dec("0.00").to_string(), "0.00");
    }

    #[test]
    fn test_parse_errors() {
        for s in ["", "+", "-", ".", "1e", "1e+", "1e-", "1ex", "12x", "1.2.3", "--1"] {
            assert!(BigDecimal::parse(s).is_err(), "{:?} should fail", s);
        }
    }

    #[test]
    fn test_to_scientific_string() {
        assert_eq!(BigDecimal::new(BigInt::from_i64(123), 0).to_string(), "123");
        assert_eq!(BigDecimal::new(BigInt::from_i64(123), -2).to_string(), "1.23");
        assert_eq!(BigDecimal::new(BigInt::from_i64(123), -5).to_string(), "0.00123");
        assert_eq!(BigDecimal::new(BigInt::from_i64(123), 2).to_string(), "1.23E+4");
        assert_eq!(BigDecimal::new(BigInt::from_i64(5), -7).to_string(), "5E-7");
        assert_eq!(BigDecimal::new(BigInt::from_i64(-123), -2).to_string(), "-1.23");
        assert_eq!(BigDecimal::new(BigInt::from_i64(-5), -7).to_string(), "-5E-7");
        assert_eq!(BigDecimal::new(BigInt::from_i64(123), -3).to_string(), "0.123");
    }

    #[test]
    fn test_add_subtract_alignment() {
        assert_eq!(dec("1.23").add(&dec("0.7")).to_string(), "1.93");
        assert_eq!(dec("1.23").subtract(&dec("0.977")).to_string(), "0.253");
        assert_eq!(dec("0.1").add(&dec("0.02")).to_string(), "0.12");
        // exact zero keeps the common exponent
        assert_eq!(dec("1.5").subtract(&dec("1.5")).exponent(), -1);
    }

    #[test]
    fn test_add_with_context() {
        let c = Context::with_mode(3, RoundingMode::HalfUp);
        let sum = dec("123.4").add_ctx(&dec("0.06"), &c).unwrap();
        assert_eq!(sum.to_string(), "123");
        // unlimited context leaves the exact sum alone
        let sum = dec("123.4").add_ctx(&dec("0.06"), &Context::UNLIMITED).unwrap();
        assert_eq!(sum.to_string(), "123.46");
    }

    #[test]
    fn test_multiply() {
        assert_eq!(dec("1.5").multiply(&dec("2.5")).unwrap().to_string(), "3.75");
        assert_eq!(dec("-1.5").multiply(&dec("2.5")).unwrap().to_string(), "-3.75");
        let c = Context::with_mode(2, RoundingMode::HalfUp);
        assert_eq!(dec("1.5").multiply_ctx(&dec("2.5"), &c).unwrap().to_string(), "3.8");
    }

    #[test]
    fn test_divide_exact() {
        assert_eq!(dec("1").divide(&dec("8")).unwrap().to_string(), "0.125");
        assert_eq!(dec("2").divide(&dec("0.5")).unwrap().to_string(), "4");
        assert_eq!(dec("0").divide(&dec("3")).unwrap().to_string(), "0");
        assert_eq!(dec("-1").divide(&dec("8")).unwrap().to_string(), "-0.125");
    }

    #[test]
    fn test_divide_non_terminating() {
        let err = dec("1").divide(&dec("3")).unwrap_err();
        assert!(matches!(err, NumericError::RoundingRequired(_)));
    }

    #[test]
    fn test_divide_by_zero() {
        assert!(matches!(
            dec("1").divide(&dec("0")).unwrap_err(),
            NumericError::DivisionByZero
        ));
        // 0/0 is the same error kind
        assert!(matches!(
            dec("0").divide(&dec("0")).unwrap_err(),
            NumericError::DivisionByZero
        ));
        assert!(matches!(
            dec("0")
                .divide_ctx(&dec("0"), &Context::BASIC_DEFAULT)
                .unwrap_err(),
            NumericError::DivisionByZero
        ));
    }

    #[test]
    fn test_divide_with_context() {
        let c = Context::with_mode(5, RoundingMode::HalfUp);
        assert_eq!(dec("1").divide_ctx(&dec("3"), &c).unwrap().to_string(), "0.33333");
        assert_eq!(dec("2").divide_ctx(&dec("3"), &c).unwrap().to_string(), "0.66667");
        assert_eq!(dec("-1").divide_ctx(&dec("3"), &c).unwrap().to_string(), "-0.33333");

        // exact quotient strips back toward the preferred exponent
        assert_eq!(dec("1").divide_ctx(&dec("8"), &c).unwrap().to_string(), "0.125");
    }

    #[test]
    fn test_divide_integer() {
        assert_eq!(dec("17.5").divide_integer(&dec("5")).unwrap().to_string(), "3");
        assert_eq!(dec("-17.5").divide_integer(&dec("5")).unwrap().to_string(), "-3");
        assert_eq!(dec("1").divide_integer(&dec("3")).unwrap().to_string(), "0");
        let q = dec("100").divide_integer(&dec("3")).unwrap();
        assert_eq!(q.to_string(), "33");
        assert_eq!(q.exponent(), 0);
    }

    #[test]
    fn test_divide_integer_impossible() {
        let c = Context::with_mode(2, RoundingMode::Down);
        let err = dec("1000").divide_integer_ctx(&dec("3"), &c).unwrap_err();
        assert!(matches!(err, NumericError::RoundingRequired(_)));
    }

    #[test]
    fn test_div_rem() {
        let (q, r) = dec("17.5").div_rem(&dec("5")).unwrap();
        assert_eq!(q.to_string(), "3");
        assert_eq!(r.to_string(), "2.5");
        // identity: x = q*y + r
        let x = q.multiply(&dec("5")).unwrap().add(&r);
        assert_eq!(x.compare_to(&dec("17.5")), Ordering::Equal);

        let (q, r) = dec("-17.5").div_rem(&dec("5")).unwrap();
        assert_eq!(q.to_string(), "-3");
        assert_eq!(r.to_string(), "-2.5");
    }

    #[test]
    fn test_div_rem_with_context() {
        let (q, r) = dec("17.5").div_rem_ctx(&dec("5"), &Context::BASIC_DEFAULT).unwrap();
        assert_eq!(q.to_string(), "3");
        assert_eq!(r.to_string(), "2.5");
        assert_eq!(
            dec("-17.5").rem_ctx(&dec("5"), &Context::BASIC_DEFAULT).unwrap().to_string(),
            "-2.5"
        );

        // Unnecessary falls back to the exact pair
        let c = Context::with_mode(2, RoundingMode::Unnecessary);
        let (q, r) = dec("17.5").div_rem_ctx(&dec("5"), &c).unwrap();
        assert_eq!(q.to_string(), "3");
        assert_eq!(r.to_string(), "2.5");

        // integer part wider than the precision allows
        let c = Context::with_mode(2, RoundingMode::Down);
        assert!(dec("1000").rem_ctx(&dec("3"), &c).is_err());
    }

    #[test]
    fn test_round_half_even() {
        let c = Context::with_mode(1, RoundingMode::HalfEven);
        assert_eq!(dec("2.5").round_ctx(&c).unwrap().to_string(), "2");
        assert_eq!(dec("3.5").round_ctx(&c).unwrap().to_string(), "4");
        assert_eq!(dec("-2.5").round_ctx(&c).unwrap().to_string(), "-2");
        assert_eq!(dec("2.51").round_ctx(&c).unwrap().to_string(), "3");
    }

    #[test]
    fn test_rounding_modes() {
        let v = dec("2.15");
        let cases = [
            (RoundingMode::Up, "2.2"),
            (RoundingMode::Down, "2.1"),
            (RoundingMode::Ceiling, "2.2"),
            (RoundingMode::Floor, "2.1"),
            (RoundingMode::HalfUp, "2.2"),
            (RoundingMode::HalfDown, "2.1"),
            (RoundingMode::HalfEven, "2.2"),
        ];
        for (mode, expected) in cases {
            let r = v.round_ctx(&Context::with_mode(2, mode)).unwrap();
            assert_eq!(r.to_string(), expected, "{:?}", mode);
        }
        let v = dec("-2.15");
        let cases = [
            (RoundingMode::Up, "-2.2"),
            (RoundingMode::Down, "-2.1"),
            (RoundingMode::Ceiling, "-2.1"),
            (RoundingMode::Floor, "-2.2"),
            (RoundingMode::HalfUp, "-2.2"),
        ];
        for (mode, expected) in cases {
            let r = v.round_ctx(&Context::with_mode(2, mode)).unwrap();
            assert_eq!(r.to_string(), expected, "{:?}", mode);
        }

        assert!(dec("2.15")
            .round_ctx(&Context::with_mode(2, RoundingMode::Unnecessary))
            .is_err());
    }

    #[test]
    fn test_rescale() {
        let v = rescale(&dec("1.2345"), -2, RoundingMode::HalfUp).unwrap();
        assert_eq!(v.to_string(), "1.23");

        // rounding carry bumps the exponent; rescale recurses (9.9999 -> 10.00)
        let v = rescale(&dec("9.9999"), -2, RoundingMode::HalfUp).unwrap();
        assert_eq!(v.to_string(), "10.00");
        assert_eq!(v.exponent(), -2);

        // padding direction
        let v = rescale(&dec("5"), -3, RoundingMode::Unnecessary).unwrap();
        assert_eq!(v.to_string(), "5.000");

        // everything rounds away
        let v = rescale(&dec("0.05"), 0, RoundingMode::Down).unwrap();
        assert_eq!(v.coefficient(), &BigInt::zero());
        assert_eq!(v.exponent(), 0);
    }

    #[test]
    fn test_quantize() {
        let v = dec("2.17").quantize(&dec("0.001"), RoundingMode::HalfUp).unwrap();
        assert_eq!(v.to_string(), "2.170");
        let v = dec("2.17").quantize(&dec("0.1"), RoundingMode::HalfUp).unwrap();
        assert_eq!(v.to_string(), "2.2");
    }

    #[test]
    fn test_strip_trailing_zeros() {
        let v = BigDecimal::new(BigInt::from_i64(12300), -2);
        let s = v.strip_trailing_zeros().unwrap();
        assert_eq!(s.coefficient(), &BigInt::from_i64(123));
        assert_eq!(s.exponent(), 0);
    }

    #[test]
    fn test_power() {
        assert_eq!(dec("1.5").power(2).unwrap().to_string(), "2.25");
        assert_eq!(dec("10").power(3).unwrap().compare_to(&dec("1000")), Ordering::Equal);
        assert!(dec("2").power(-1).is_err());

        let c = Context::with_mode(5, RoundingMode::HalfUp);
        assert_eq!(dec("2").power_ctx(-2, &c).unwrap().to_string(), "0.25");
        let v = dec("3").power_ctx(-1, &c).unwrap();
        assert_eq!(v.to_string(), "0.33333");
    }

    #[test]
    fn test_structural_vs_numeric_equality() {
        let one_0 = dec("1.0");
        let one_00 = rescale(&dec("1.0"), -2, RoundingMode::Unnecessary).unwrap();
        assert_eq!(one_00.to_string(), "1.00");
        assert_ne!(one_0, one_00);
        assert_eq!(one_0.compare_to(&one_00), Ordering::Equal);
        assert!(dec("1.5").compare_to(&dec("1.49")) == Ordering::Greater);
    }

    #[test]
    fn test_exponent_clamping() {
        // non-zero coefficient overflows
        let v = BigDecimal::new(BigInt::one(), i32::MAX);
        assert!(matches!(
            v.move_point_right(1).unwrap_err(),
            NumericError::ExponentOverflow
        ));
        // zero coefficient clamps instead
        let z = BigDecimal::new(BigInt::zero(), i32::MAX);
        assert_eq!(z.move_point_right(1).unwrap().exponent(), i32::MAX);
        let z = BigDecimal::new(BigInt::zero(), i32::MIN);
        assert_eq!(z.move_point_left(1).unwrap().exponent(), i32::MIN);
    }

    #[test]
    fn test_from_f64() {
        // 0.5 is exact in binary
        assert_eq!(BigDecimal::try_from_f64(0.5).unwrap().to_string(), "0.5");
        assert_eq!(BigDecimal::try_from_f64(-2.0).unwrap().compare_to(&dec("-2")), Ordering::Equal);
        // 0.1 is not: the exact binary expansion comes through
        let v = BigDecimal::try_from_f64(0.1).unwrap();
        assert_ne!(v, dec("0.1"));
        assert!(v.to_string().starts_with("0.1000000000000000055511151231257827"));
        assert!(BigDecimal::try_from_f64(f64::NAN).is_err());
        assert!(BigDecimal::try_from_f64(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(dec("123.456").to_bigint().unwrap(), BigInt::from_i64(123));
        assert_eq!(dec("-123.456").to_i64().unwrap(), -123);
        assert_eq!(dec("123.9").to_i32().unwrap(), 123);
        assert!(dec("3e9").to_i32().is_err());
        assert_eq!(dec("1.5").to_f64(), 1.5);
        assert!(dec("1e30").to_i64().is_err());
    }

    #[test]
    fn test_context_presets() {
        assert_eq!(Context::DECIMAL32.precision(), 7);
        assert_eq!(Context::DECIMAL64.precision(), 16);
        assert_eq!(Context::DECIMAL128.precision(), 34);
        assert_eq!(Context::DECIMAL64.rounding_mode(), RoundingMode::HalfEven);
        assert_eq!(Context::UNLIMITED.precision(), 0);
        assert_eq!(Context::BASIC_DEFAULT.precision(), 9);
        assert_eq!(Context::new(5).rounding_mode(), RoundingMode::HalfUp);
    }
}
