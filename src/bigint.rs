//! # Arbitrary-precision integers
//!
//! Canonical sign-magnitude big integers over big-endian `u32` digit arrays.
//! Values are immutable; every operation builds a new value. Canonical form
//! (no leading zero digit, `Sign::Zero` exactly when the magnitude is empty)
//! gives each integer a unique representation, so structural equality and
//! hashing fall out of the derived impls.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{NumericError, NumericResult};

/// One magnitude word.
pub type Digit = u32;
/// Double-width word for carries and partial products.
pub type Digit2X = u64;

pub const DIGIT_BITS: u32 = 32;

const MIN_RADIX: u32 = 2;
const MAX_RADIX: u32 = 36;

/// Largest exponent accepted by [`BigInt::power`]. Mirrors the decimal
/// engine's nine-digit exponent limit.
pub const MAX_POWER_EXPONENT: i32 = 999_999_999;

const DOUBLE_EXPONENT_BIAS: i32 = 1023;
const DOUBLE_SIGNIFICAND_BITS: i32 = 52;
const DOUBLE_SHIFT_BIAS: i32 = DOUBLE_EXPONENT_BIAS + DOUBLE_SIGNIFICAND_BITS;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

impl Sign {
    pub fn flip(&self) -> Sign {
        match self {
            Sign::Negative => Sign::Positive,
            Sign::Zero => Sign::Zero,
            Sign::Positive => Sign::Negative,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Sign::Zero)
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Sign::Positive)
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, Sign::Negative)
    }

    pub fn signum(&self) -> i32 {
        match self {
            Sign::Negative => -1,
            Sign::Zero => 0,
            Sign::Positive => 1,
        }
    }

    fn mul(self, other: Sign) -> Sign {
        match (self, other) {
            (Sign::Zero, _) | (_, Sign::Zero) => Sign::Zero,
            (a, b) if a == b => Sign::Positive,
            _ => Sign::Negative,
        }
    }
}

#[inline]
const fn loword(v: u64) -> Digit {
    v as Digit
}

#[inline]
const fn hiword(v: u64) -> Digit {
    (v >> DIGIT_BITS) as Digit
}

/// Max digits of radix `i` whose value still fits one `u32`:
/// `floor(log_i(2^32 - 1))`.
static RADIX_DIGITS_PER_WORD: [u32; 37] = [
    0, 0, 31, 20, 15, 13, 12, 11, 10, 10, 9, 9, 8, 8, 8, 8, 7, 7, 7, 7, 7, 7, 7, 7, 6, 6, 6, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6,
];

/// `SUPER_RADIX[i] = i ^ RADIX_DIGITS_PER_WORD[i]`, the grouped radix used
/// for batch parse/format.
static SUPER_RADIX: [Digit; 37] = [
    0, 0, 0x8000_0000, 0xCFD4_1B91, 0x4000_0000, 0x48C2_7395, 0x81BF_1000, 0x75DB_9C97,
    0x4000_0000, 0xCFD4_1B91, 0x3B9A_CA00, 0x8C8B_6D2B, 0x19A1_0000, 0x309F_1021, 0x57F6_C100,
    0x98C2_9B81, 0x1000_0000, 0x1875_4571, 0x247D_BC80, 0x3547_667B, 0x4C4B_4000, 0x6B5A_6E1D,
    0x94AC_E180, 0xCAF1_8367, 0x0B64_0000, 0x0E8D_4A51, 0x1269_AE40, 0x1717_9149, 0x1CB9_1000,
    0x2374_4899, 0x2B73_A840, 0x34E6_3B41, 0x4000_0000, 0x4CFA_3CC1, 0x5C13_D840, 0x6D91_B519,
    0x81BF_1000,
];

/// `ceil(1024 * log_2(i))`, fixed point with a 1024 denominator; used to
/// size the magnitude buffer when parsing.
static BITS_PER_RADIX_DIGIT: [u32; 37] = [
    0, 0, 1024, 1624, 2048, 2378, 2648, 2875, 3072, 3247, 3402, 3543, 3672, 3790, 3899, 4001,
    4096, 4186, 4271, 4350, 4426, 4498, 4567, 4633, 4696, 4756, 4814, 4870, 4923, 4975, 5025,
    5074, 5120, 5166, 5210, 5253, 5295,
];

/// `UINT_LOG_TABLE[i]` is the largest value with `i` decimal digits
/// (Hacker's Delight, section 11-4).
static UINT_LOG_TABLE: [u32; 11] = [
    0,
    9,
    99,
    999,
    9_999,
    99_999,
    999_999,
    9_999_999,
    99_999_999,
    999_999_999,
    u32::MAX,
];

/// Number of decimal digits in a single word.
fn word_precision(v: Digit) -> u32 {
    let mut i = 1;
    loop {
        if v <= UINT_LOG_TABLE[i as usize] {
            return i;
        }
        i += 1;
    }
}

/// Arbitrary-precision signed integer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BigInt {
    sign: Sign,
    /// Magnitude, most-significant word first, no leading zero word.
    digits: Box<[Digit]>,
}

impl BigInt {
    /// Builds a value from raw sign/magnitude data, canonicalizing it
    /// (leading zero words stripped, sign forced to `Zero` on an empty
    /// magnitude).
    pub fn new(sign: Sign, digits: Vec<Digit>) -> BigInt {
        let digits = remove_leading_zeros(digits);
        if digits.is_empty() {
            BigInt {
                sign: Sign::Zero,
                digits: Box::from([]),
            }
        } else {
            debug_assert!(!sign.is_zero());
            BigInt {
                sign,
                digits: digits.into_boxed_slice(),
            }
        }
    }

    pub fn zero() -> BigInt {
        BigInt {
            sign: Sign::Zero,
            digits: Box::from([]),
        }
    }

    pub fn one() -> BigInt {
        BigInt::from_u32(1)
    }

    pub fn two() -> BigInt {
        BigInt::from_u32(2)
    }

    pub fn five() -> BigInt {
        BigInt::from_u32(5)
    }

    pub fn ten() -> BigInt {
        BigInt::from_u32(10)
    }

    pub fn negative_one() -> BigInt {
        BigInt {
            sign: Sign::Negative,
            digits: Box::from([1]),
        }
    }

    pub fn from_u32(v: u32) -> BigInt {
        if v == 0 {
            BigInt::zero()
        } else {
            BigInt {
                sign: Sign::Positive,
                digits: Box::from([v]),
            }
        }
    }

    pub fn from_u64(v: u64) -> BigInt {
        if v == 0 {
            return BigInt::zero();
        }
        let most = hiword(v);
        let digits = if most == 0 {
            vec![loword(v)]
        } else {
            vec![most, loword(v)]
        };
        BigInt {
            sign: Sign::Positive,
            digits: digits.into_boxed_slice(),
        }
    }

    pub fn from_i32(v: i32) -> BigInt {
        BigInt::from_i64(v as i64)
    }

    pub fn from_i64(v: i64) -> BigInt {
        if v == 0 {
            return BigInt::zero();
        }
        let sign = if v < 0 { Sign::Negative } else { Sign::Positive };
        let mag = v.unsigned_abs();
        let most = hiword(mag);
        let digits = if most == 0 {
            vec![loword(mag)]
        } else {
            vec![most, loword(mag)]
        };
        BigInt {
            sign,
            digits: digits.into_boxed_slice(),
        }
    }

    /// Truncating conversion from a finite double. NaN and infinities are
    /// rejected.
    pub fn try_from_f64(v: f64) -> NumericResult<BigInt> {
        if v.is_nan() || v.is_infinite() {
            return Err(NumericError::Domain(
                "cannot convert NaN or Infinity to an integer".into(),
            ));
        }

        let bits = v.to_bits();
        let negative = bits >> 63 != 0;
        let exp = ((bits >> DOUBLE_SIGNIFICAND_BITS) & 0x7FF) as i32;
        let significand = bits & 0x000F_FFFF_FFFF_FFFF;

        if significand == 0 {
            if exp == 0 {
                return Ok(BigInt::zero());
            }
            let result = if negative {
                BigInt::negative_one()
            } else {
                BigInt::one()
            };
            return Ok(result.shift_left(exp - DOUBLE_EXPONENT_BIAS));
        }

        let res = BigInt::from_u64(significand | 0x0010_0000_0000_0000);
        let res = if exp > DOUBLE_SHIFT_BIAS {
            res.shift_left(exp - DOUBLE_SHIFT_BIAS)
        } else {
            res.shift_right(DOUBLE_SHIFT_BIAS - exp)
        };
        Ok(if negative { res.negate() } else { res })
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn signum(&self) -> i32 {
        self.sign.signum()
    }

    pub fn is_zero(&self) -> bool {
        self.sign.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.sign.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.sign.is_negative()
    }

    pub fn is_odd(&self) -> bool {
        self.digits.last().is_some_and(|&d| d & 1 != 0)
    }

    /// Number of bits in the magnitude; zero has bit length 0.
    pub fn bit_length(&self) -> u32 {
        match self.digits.first() {
            None => 0,
            Some(&top) => {
                (self.digits.len() as u32 - 1) * DIGIT_BITS + (DIGIT_BITS - top.leading_zeros())
            }
        }
    }

    // ----- parsing and formatting -----

    /// Parses a string in the given radix (2..=36). Grammar: `[+-]?digits+`,
    /// one optional leading sign only.
    ///
    /// Digits are consumed in groups sized so each group fits a single word
    /// (the "super radix", the largest power of the radix below 2^32), then
    /// folded in with one multiply-add per group (Knuth 4.4, Method 1b).
    pub fn parse_radix(s: &str, radix: u32) -> NumericResult<BigInt> {
        check_radix(radix)?;

        let bytes = s.as_bytes();
        let (sign, rest) = match bytes.first() {
            Some(b'-') => (Sign::Negative, &bytes[1..]),
            Some(b'+') => (Sign::Positive, &bytes[1..]),
            Some(_) => (Sign::Positive, bytes),
            None => {
                return Err(NumericError::Format("empty input".into()));
            }
        };
        if rest.is_empty() {
            return Err(NumericError::Format(
                "missing digits after sign".into(),
            ));
        }

        // Leading zeros contribute nothing; stripping them keeps the size
        // estimate honest.
        let mut index = 0;
        while index < rest.len() && rest[index] == b'0' {
            index += 1;
        }
        if index == rest.len() {
            return Ok(BigInt::zero());
        }
        let digits = &rest[index..];
        let num_digits = digits.len();

        // Upper bound on the magnitude size; may be one word over.
        let num_bits = ((num_digits as u64 * BITS_PER_RADIX_DIGIT[radix as usize] as u64) >> 10) + 1;
        let num_words = ((num_bits + DIGIT_BITS as u64 - 1) / DIGIT_BITS as u64) as usize;
        let mut data = vec![0 as Digit; num_words];

        let group_size = RADIX_DIGITS_PER_WORD[radix as usize] as usize;
        let mut first_len = num_digits % group_size;
        if first_len == 0 {
            first_len = group_size;
        }

        let last = data.len() - 1;
        data[last] = parse_word(&digits[..first_len], radix)?;

        let mult = SUPER_RADIX[radix as usize];
        let mut pos = first_len;
        while pos < num_digits {
            let group = parse_word(&digits[pos..pos + group_size], radix)?;
            in_place_mul_add(&mut data, mult, group);
            pos += group_size;
        }

        Ok(BigInt::new(sign, data))
    }

    /// Parses a decimal string.
    pub fn parse(s: &str) -> NumericResult<BigInt> {
        BigInt::parse_radix(s, 10)
    }

    /// Formats in the given radix (2..=36), lowercase digits, no leading
    /// zeros, leading `-` for negatives.
    pub fn to_string_radix(&self, radix: u32) -> NumericResult<String> {
        check_radix(radix)?;
        Ok(self.format_radix(radix))
    }

    fn format_radix(&self, radix: u32) -> String {
        if self.sign.is_zero() {
            return "0".to_string();
        }

        // Peel off one super-radix digit per division; each remainder
        // expands to a fixed-width group of radix digits.
        let mut working: Vec<Digit> = self.digits.to_vec();
        let super_radix = SUPER_RADIX[radix as usize];
        let mut rems = Vec::new();
        let mut index = 0;
        while index < working.len() {
            let rem = in_place_div_rem(&mut working, &mut index, super_radix);
            rems.push(rem);
        }

        let group_size = RADIX_DIGITS_PER_WORD[radix as usize] as usize;
        let mut out = String::with_capacity(rems.len() * group_size + 1);
        if self.sign.is_negative() {
            out.push('-');
        }

        for (i, &rem) in rems.iter().rev().enumerate() {
            append_group(&mut out, rem, radix, group_size, i != 0);
        }
        out
    }

    // ----- arithmetic -----

    pub fn negate(&self) -> BigInt {
        BigInt {
            sign: self.sign.flip(),
            digits: self.digits.clone(),
        }
    }

    pub fn abs(&self) -> BigInt {
        if self.sign.is_negative() {
            self.negate()
        } else {
            self.clone()
        }
    }

    pub fn add(&self, y: &BigInt) -> BigInt {
        if self.sign.is_zero() {
            return y.clone();
        }
        if y.sign.is_zero() {
            return self.clone();
        }

        if self.sign == y.sign {
            return BigInt::new(self.sign, add_mag(&self.digits, &y.digits));
        }

        match compare_mag(&self.digits, &y.digits) {
            Ordering::Less => BigInt::new(self.sign.flip(), sub_mag(&y.digits, &self.digits)),
            Ordering::Equal => BigInt::zero(),
            Ordering::Greater => BigInt::new(self.sign, sub_mag(&self.digits, &y.digits)),
        }
    }

    pub fn subtract(&self, y: &BigInt) -> BigInt {
        if y.sign.is_zero() {
            return self.clone();
        }
        if self.sign.is_zero() {
            return y.negate();
        }

        if self.sign != y.sign {
            return BigInt::new(self.sign, add_mag(&self.digits, &y.digits));
        }

        match compare_mag(&self.digits, &y.digits) {
            Ordering::Less => BigInt::new(self.sign.flip(), sub_mag(&y.digits, &self.digits)),
            Ordering::Equal => BigInt::zero(),
            Ordering::Greater => BigInt::new(self.sign, sub_mag(&self.digits, &y.digits)),
        }
    }

    /// Schoolbook multiply over double-width partial products.
    pub fn multiply(&self, y: &BigInt) -> BigInt {
        if self.sign.is_zero() || y.sign.is_zero() {
            return BigInt::zero();
        }
        BigInt::new(self.sign.mul(y.sign), mul_mag(&self.digits, &y.digits))
    }

    /// Quotient and remainder in one pass; the remainder carries the
    /// dividend's sign (truncating division).
    pub fn div_rem(&self, y: &BigInt) -> NumericResult<(BigInt, BigInt)> {
        if y.sign.is_zero() {
            return Err(NumericError::DivisionByZero);
        }
        let (q, r) = div_mod_mag(&self.digits, &y.digits);
        Ok((
            BigInt::new(self.sign.mul(y.sign), q),
            BigInt::new(self.sign, r),
        ))
    }

    pub fn divide(&self, y: &BigInt) -> NumericResult<BigInt> {
        Ok(self.div_rem(y)?.0)
    }

    pub fn rem(&self, y: &BigInt) -> NumericResult<BigInt> {
        Ok(self.div_rem(y)?.1)
    }

    /// Greatest common divisor, always non-negative.
    ///
    /// Euclidean remainder steps while the operands differ in length by at
    /// least two words, then binary GCD once they converge (Knuth 4.5.5 B).
    pub fn gcd(&self, y: &BigInt) -> BigInt {
        if y.sign.is_zero() {
            return self.abs();
        }
        if self.sign.is_zero() {
            return y.abs();
        }
        hybrid_gcd(self.abs(), y.abs())
    }

    /// Least common multiple, always non-negative; zero if either is zero.
    pub fn lcm(&self, y: &BigInt) -> BigInt {
        if self.sign.is_zero() || y.sign.is_zero() {
            return BigInt::zero();
        }
        let g = self.gcd(y);
        let (q, _) = div_mod_mag(&self.digits, &g.digits);
        BigInt::new(Sign::Positive, q).multiply(&y.abs())
    }

    /// Exponentiation by repeated squaring. The exponent must lie in
    /// `0..=999_999_999`.
    pub fn power(&self, exp: i32) -> NumericResult<BigInt> {
        if exp < 0 {
            return Err(NumericError::Domain("negative exponent".into()));
        }
        if exp > MAX_POWER_EXPONENT {
            return Err(NumericError::Domain(format!(
                "exponent {} exceeds the maximum of {}",
                exp, MAX_POWER_EXPONENT
            )));
        }
        if exp == 0 {
            return Ok(BigInt::one());
        }
        if self.sign.is_zero() {
            return Ok(BigInt::zero());
        }

        let mut exp = exp as u32;
        let mut mult = self.clone();
        let mut result = BigInt::one();
        loop {
            if exp & 1 != 0 {
                result = result.multiply(&mult);
            }
            if exp == 1 {
                break;
            }
            mult = mult.multiply(&mult);
            exp >>= 1;
        }
        Ok(result)
    }

    /// `(self ^ power) mod modulus`, reducing after every multiply to bound
    /// operand growth. The exponent must be non-negative.
    pub fn mod_pow(&self, power: &BigInt, modulus: &BigInt) -> NumericResult<BigInt> {
        if power.is_negative() {
            return Err(NumericError::Domain("negative exponent".into()));
        }
        if modulus.is_zero() {
            return Err(NumericError::DivisionByZero);
        }
        if power.is_zero() {
            return Ok(BigInt::one());
        }
        if self.sign.is_zero() {
            return Ok(BigInt::zero());
        }

        let mut mult = self.clone();
        let mut result = BigInt::one();
        let one = BigInt::one();
        let mut power = power.clone();
        loop {
            if power.is_odd() {
                result = result.multiply(&mult).rem(modulus)?;
            }
            if power == one {
                break;
            }
            mult = mult.multiply(&mult).rem(modulus)?;
            power = power.shift_right(1);
        }
        Ok(result)
    }

    // ----- bitwise operations -----
    //
    // Sign-magnitude has no stored two's-complement form; each operation
    // synthesizes the needed two's-complement word on demand and converts
    // the result back.

    pub fn and(&self, y: &BigInt) -> BigInt {
        let rlen = self.digits.len().max(y.digits.len());
        let mut result = vec![0 as Digit; rlen];
        let mut seen_x = false;
        let mut seen_y = false;
        for i in 0..rlen {
            let xd = self.digit_2c(i, &mut seen_x);
            let yd = y.digit_2c(i, &mut seen_y);
            result[rlen - i - 1] = xd & yd;
        }
        // negative only if both operands are negative
        if self.is_negative() && y.is_negative() {
            make_twos_complement(&mut result);
            BigInt::new(Sign::Negative, result)
        } else {
            BigInt::new(Sign::Positive, result)
        }
    }

    pub fn or(&self, y: &BigInt) -> BigInt {
        let rlen = self.digits.len().max(y.digits.len());
        let mut result = vec![0 as Digit; rlen];
        let mut seen_x = false;
        let mut seen_y = false;
        for i in 0..rlen {
            let xd = self.digit_2c(i, &mut seen_x);
            let yd = y.digit_2c(i, &mut seen_y);
            result[rlen - i - 1] = xd | yd;
        }
        // negative if either operand is negative
        if self.is_negative() || y.is_negative() {
            make_twos_complement(&mut result);
            BigInt::new(Sign::Negative, result)
        } else {
            BigInt::new(Sign::Positive, result)
        }
    }

    pub fn xor(&self, y: &BigInt) -> BigInt {
        let rlen = self.digits.len().max(y.digits.len());
        let mut result = vec![0 as Digit; rlen];
        let mut seen_x = false;
        let mut seen_y = false;
        for i in 0..rlen {
            let xd = self.digit_2c(i, &mut seen_x);
            let yd = y.digit_2c(i, &mut seen_y);
            result[rlen - i - 1] = xd ^ yd;
        }
        // the sign bit of x ^ y is set when exactly one operand is negative
        if self.is_negative() != y.is_negative() {
            make_twos_complement(&mut result);
            BigInt::new(Sign::Negative, result)
        } else {
            BigInt::new(Sign::Positive, result)
        }
    }

    pub fn not(&self) -> BigInt {
        // zero has no digits but !0 is -1, so synthesize at least one word
        let len = self.digits.len().max(1);
        let mut result = vec![0 as Digit; len];
        let mut seen = false;
        for i in 0..len {
            let xd = self.digit_2c(i, &mut seen);
            result[len - i - 1] = !xd;
        }
        if self.is_negative() {
            BigInt::new(Sign::Positive, result)
        } else {
            make_twos_complement(&mut result);
            BigInt::new(Sign::Negative, result)
        }
    }

    pub fn and_not(&self, y: &BigInt) -> BigInt {
        let rlen = self.digits.len().max(y.digits.len());
        let mut result = vec![0 as Digit; rlen];
        let mut seen_x = false;
        let mut seen_y = false;
        for i in 0..rlen {
            let xd = self.digit_2c(i, &mut seen_x);
            let yd = y.digit_2c(i, &mut seen_y);
            result[rlen - i - 1] = xd & !yd;
        }
        // sign bit of x & !y: x negative, y non-negative
        if self.is_negative() && !y.is_negative() {
            make_twos_complement(&mut result);
            BigInt::new(Sign::Negative, result)
        } else {
            BigInt::new(Sign::Positive, result)
        }
    }

    /// Tests bit `n` of the two's-complement form.
    pub fn test_bit(&self, n: i32) -> NumericResult<bool> {
        let n = check_bit_index(n)?;
        Ok(self.digit_2c_at(n / 32) & (1 << (n % 32)) != 0)
    }

    pub fn set_bit(&self, n: i32) -> NumericResult<BigInt> {
        if self.test_bit(n)? {
            return Ok(self.clone());
        }
        let n = n as usize;
        Ok(self.with_bit(n, |word, mask| word | mask))
    }

    pub fn clear_bit(&self, n: i32) -> NumericResult<BigInt> {
        if !self.test_bit(n)? {
            return Ok(self.clone());
        }
        let n = n as usize;
        Ok(self.with_bit(n, |word, mask| word & !mask))
    }

    pub fn flip_bit(&self, n: i32) -> NumericResult<BigInt> {
        let n = check_bit_index(n)?;
        Ok(self.with_bit(n, |word, mask| word ^ mask))
    }

    fn with_bit(&self, n: usize, apply: impl Fn(Digit, Digit) -> Digit) -> BigInt {
        let index = n / 32;
        let len = self.digits.len().max(index + 1);
        let mut result = vec![0 as Digit; len];
        let mut seen = false;
        for i in 0..len {
            result[len - i - 1] = self.digit_2c(i, &mut seen);
        }
        result[len - index - 1] = apply(result[len - index - 1], 1 << (n % 32));

        if self.is_negative() {
            make_twos_complement(&mut result);
            BigInt::new(Sign::Negative, result)
        } else {
            BigInt::new(Sign::Positive, result)
        }
    }

    /// Left shift; a negative count shifts right instead.
    pub fn shift_left(&self, shift: i32) -> BigInt {
        if shift == 0 || self.sign.is_zero() {
            return self.clone();
        }
        if shift < 0 {
            return self.shift_right(-shift);
        }

        let digit_shift = shift as usize / 32;
        let bit_shift = shift as u32 % 32;
        let xlen = self.digits.len();

        let result = if bit_shift == 0 {
            let mut result = vec![0 as Digit; xlen + digit_shift];
            result[..xlen].copy_from_slice(&self.digits);
            result
        } else {
            let r_shift = DIGIT_BITS - bit_shift;
            let high_bits = self.digits[0] >> r_shift;
            let (mut result, mut i) = if high_bits == 0 {
                (vec![0 as Digit; xlen + digit_shift], 0)
            } else {
                let mut r = vec![0 as Digit; xlen + digit_shift + 1];
                r[0] = high_bits;
                (r, 1)
            };
            for j in 0..xlen - 1 {
                result[i] = self.digits[j] << bit_shift | self.digits[j + 1] >> r_shift;
                i += 1;
            }
            result[i] = self.digits[xlen - 1] << bit_shift;
            result
        };

        BigInt::new(self.sign, result)
    }

    /// Arithmetic right shift on the magnitude; shifting everything out
    /// yields 0 for non-negatives and -1 for negatives. A negative count
    /// shifts left instead.
    pub fn shift_right(&self, shift: i32) -> BigInt {
        if shift == 0 || self.sign.is_zero() {
            return self.clone();
        }
        if shift < 0 {
            return self.shift_left(-shift);
        }

        let digit_shift = shift as usize / 32;
        let bit_shift = shift as u32 % 32;
        let xlen = self.digits.len();

        if digit_shift >= xlen {
            return if self.sign.is_negative() {
                BigInt::negative_one()
            } else {
                BigInt::zero()
            };
        }

        let result = if bit_shift == 0 {
            self.digits[..xlen - digit_shift].to_vec()
        } else {
            let high_bits = self.digits[0] >> bit_shift;
            let (mut result, mut i) = if high_bits == 0 {
                (vec![0 as Digit; xlen - digit_shift - 1], 0)
            } else {
                let mut r = vec![0 as Digit; xlen - digit_shift];
                r[0] = high_bits;
                (r, 1)
            };
            let l_shift = DIGIT_BITS - bit_shift;
            for j in 0..xlen - digit_shift - 1 {
                result[i] = self.digits[j] << l_shift | self.digits[j + 1] >> bit_shift;
                i += 1;
            }
            result
        };

        BigInt::new(self.sign, result)
    }

    /// Index of the lowest set bit of the magnitude, or `None` for zero.
    fn lowest_set_bit(&self) -> Option<u32> {
        if self.sign.is_zero() {
            return None;
        }
        let mut j = self.digits.len() - 1;
        while j > 0 && self.digits[j] == 0 {
            j -= 1;
        }
        Some(((self.digits.len() - j - 1) as u32) * DIGIT_BITS + self.digits[j].trailing_zeros())
    }

    /// Two's-complement word at little-endian index `n`, streaming variant.
    /// `seen_non_zero` tracks whether a non-zero word has gone by, which
    /// decides between `~d + 1` and `~d` for negative values.
    fn digit_2c(&self, n: usize, seen_non_zero: &mut bool) -> Digit {
        if n >= self.digits.len() {
            return self.sign_extension_digit();
        }
        let digit = self.digits[self.digits.len() - n - 1];
        if !self.sign.is_negative() {
            return digit;
        }
        if *seen_non_zero {
            !digit
        } else if digit == 0 {
            0
        } else {
            *seen_non_zero = true;
            (!digit).wrapping_add(1)
        }
    }

    /// Random-access variant of [`digit_2c`].
    fn digit_2c_at(&self, n: usize) -> Digit {
        if n >= self.digits.len() {
            return self.sign_extension_digit();
        }
        let digit = self.digits[self.digits.len() - n - 1];
        if !self.sign.is_negative() {
            return digit;
        }
        if n <= self.first_nonzero_index() {
            (!digit).wrapping_add(1)
        } else {
            !digit
        }
    }

    fn sign_extension_digit(&self) -> Digit {
        if self.sign.is_negative() {
            Digit::MAX
        } else {
            0
        }
    }

    /// Little-endian index of the first non-zero magnitude word. Only
    /// meaningful for non-zero values.
    fn first_nonzero_index(&self) -> usize {
        let pos = self
            .digits
            .iter()
            .rposition(|&d| d != 0)
            .unwrap_or(self.digits.len());
        self.digits.len() - 1 - pos
    }

    // ----- conversions -----

    pub fn to_i64(&self) -> NumericResult<i64> {
        match self.digits.len() {
            0 => Ok(0),
            1 => Ok(self.digits[0] as i64 * self.signum() as i64),
            2 => {
                let mag = ((self.digits[0] as u64) << DIGIT_BITS) | self.digits[1] as u64;
                if self.sign.is_negative() {
                    if mag > 1 << 63 {
                        Err(NumericError::ConversionOverflow("i64"))
                    } else {
                        Ok((mag as i64).wrapping_neg())
                    }
                } else if mag > i64::MAX as u64 {
                    Err(NumericError::ConversionOverflow("i64"))
                } else {
                    Ok(mag as i64)
                }
            }
            _ => Err(NumericError::ConversionOverflow("i64")),
        }
    }

    pub fn to_i32(&self) -> NumericResult<i32> {
        let v = self.to_i64()?;
        i32::try_from(v).map_err(|_| NumericError::ConversionOverflow("i32"))
    }

    pub fn to_u64(&self) -> NumericResult<u64> {
        if self.sign.is_negative() {
            return Err(NumericError::ConversionOverflow("u64"));
        }
        match self.digits.len() {
            0 => Ok(0),
            1 => Ok(self.digits[0] as u64),
            2 => Ok(((self.digits[0] as u64) << DIGIT_BITS) | self.digits[1] as u64),
            _ => Err(NumericError::ConversionOverflow("u64")),
        }
    }

    pub fn to_u32(&self) -> NumericResult<u32> {
        let v = self.to_u64()?;
        u32::try_from(v).map_err(|_| NumericError::ConversionOverflow("u32"))
    }

    /// Lossy conversion to a double; values outside the double range
    /// become infinities.
    pub fn to_f64(&self) -> f64 {
        let mag = self
            .digits
            .iter()
            .fold(0.0f64, |acc, &d| acc * 4294967296.0 + d as f64);
        if self.sign.is_negative() {
            -mag
        } else {
            mag
        }
    }

    /// Number of significant decimal digits; zero counts as one digit.
    ///
    /// Peels nine digits per division by 10^9, then finishes the final word
    /// with a log table.
    pub fn precision(&self) -> u32 {
        if self.is_zero() {
            return 1;
        }

        let mut digits = 0;
        let mut work: Vec<Digit> = self.digits.to_vec();
        let mut index = 0;
        while index < work.len() - 1 {
            in_place_div_rem(&mut work, &mut index, 1_000_000_000);
            digits += 9;
        }
        if index == work.len() - 1 {
            digits += word_precision(work[index]);
        }
        digits
    }
}

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &BigInt) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &BigInt) -> Ordering {
        match self.sign.cmp(&other.sign) {
            Ordering::Equal => match self.sign {
                Sign::Zero => Ordering::Equal,
                Sign::Positive => compare_mag(&self.digits, &other.digits),
                Sign::Negative => compare_mag(&other.digits, &self.digits),
            },
            ord => ord,
        }
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad_integral(!self.is_negative(), "", self.format_radix(10).trim_start_matches('-'))
    }
}

impl fmt::Debug for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigInt({})", self.format_radix(10))
    }
}

fn check_radix(radix: u32) -> NumericResult<()> {
    if !(MIN_RADIX..=MAX_RADIX).contains(&radix) {
        return Err(NumericError::Domain(format!(
            "radix {} out of range [{},{}]",
            radix, MIN_RADIX, MAX_RADIX
        )));
    }
    Ok(())
}

fn check_bit_index(n: i32) -> NumericResult<usize> {
    if n < 0 {
        return Err(NumericError::Domain("negative bit address".into()));
    }
    Ok(n as usize)
}

/// Converts a short digit group; the group length guarantees the value fits
/// one word.
fn parse_word(group: &[u8], radix: u32) -> NumericResult<Digit> {
    let mut result: u64 = 0;
    for &b in group {
        let v = (b as char)
            .to_digit(radix)
            .ok_or_else(|| NumericError::Format(format!("invalid digit '{}'", b as char)))?;
        result = result * radix as u64 + v as u64;
    }
    debug_assert!(result <= Digit::MAX as u64);
    Ok(result as Digit)
}

/// Renders one super-radix digit as radix digits, zero-padded to the group
/// width except for the most significant group.
fn append_group(out: &mut String, mut rem: Digit, radix: u32, group_size: usize, pad: bool) {
    let mut buf = ['0'; 32];
    let mut i = group_size;
    while i > 0 && rem != 0 {
        i -= 1;
        let digit = rem % radix;
        rem /= radix;
        // radix digits are always mappable
        buf[i] = char::from_digit(digit, radix).unwrap_or('0');
    }
    let start = if pad { 0 } else { i };
    for &c in &buf[start..group_size] {
        out.push(c);
    }
}

fn remove_leading_zeros(mut data: Vec<Digit>) -> Vec<Digit> {
    let nonzero = data.iter().position(|&d| d != 0).unwrap_or(data.len());
    if nonzero > 0 {
        data.drain(..nonzero);
    }
    data
}

/// Compares two magnitudes: by length, then word by word from the most
/// significant end.
fn compare_mag(x: &[Digit], y: &[Digit]) -> Ordering {
    match x.len().cmp(&y.len()) {
        Ordering::Equal => x.cmp(y),
        ord => ord,
    }
}

fn add_mag(x: &[Digit], y: &[Digit]) -> Vec<Digit> {
    let (x, y) = if x.len() < y.len() { (y, x) } else { (x, y) };

    let mut result = vec![0 as Digit; x.len()];
    let mut xi = x.len();
    let mut yi = y.len();
    let mut sum: Digit2X = 0;

    while yi > 0 {
        xi -= 1;
        yi -= 1;
        sum = (sum >> DIGIT_BITS) + x[xi] as Digit2X + y[yi] as Digit2X;
        result[xi] = loword(sum);
    }

    sum >>= DIGIT_BITS;
    while xi > 0 && sum != 0 {
        xi -= 1;
        sum = x[xi] as Digit2X + 1;
        result[xi] = loword(sum);
        sum >>= DIGIT_BITS;
    }
    result[..xi].copy_from_slice(&x[..xi]);

    if sum != 0 {
        let mut grown = Vec::with_capacity(result.len() + 1);
        grown.push(loword(sum));
        grown.extend_from_slice(&result);
        return grown;
    }
    result
}

/// Magnitude subtraction; `xs` must compare greater than or equal to `ys`.
fn sub_mag(xs: &[Digit], ys: &[Digit]) -> Vec<Digit> {
    let xlen = xs.len();
    let ylen = ys.len();
    let mut result = vec![0 as Digit; xlen];

    let mut borrow = false;
    let mut ix = xlen;
    let mut iy = ylen;
    while iy > 0 {
        ix -= 1;
        iy -= 1;
        let mut x = xs[ix];
        let y = ys[iy];
        if borrow {
            if x == 0 {
                x = Digit::MAX;
            } else {
                x -= 1;
                borrow = false;
            }
        }
        borrow |= y > x;
        result[ix] = x.wrapping_sub(y);
    }

    while borrow && ix > 0 {
        ix -= 1;
        result[ix] = xs[ix].wrapping_sub(1);
        borrow = result[ix] == Digit::MAX;
    }
    result[..ix].copy_from_slice(&xs[..ix]);

    result
}

fn mul_mag(xs: &[Digit], ys: &[Digit]) -> Vec<Digit> {
    let xlen = xs.len();
    let ylen = ys.len();
    let mut zs = vec![0 as Digit; xlen + ylen];

    for xi in (0..xlen).rev() {
        let x = xs[xi] as Digit2X;
        let mut zi = xi + ylen;
        let mut product: Digit2X = 0;
        for yi in (0..ylen).rev() {
            product = product + x * ys[yi] as Digit2X + zs[zi] as Digit2X;
            zs[zi] = loword(product);
            product >>= DIGIT_BITS;
            zi -= 1;
        }
        while product != 0 {
            product += zs[zi] as Digit2X;
            zs[zi] = loword(product);
            product >>= DIGIT_BITS;
            if product != 0 {
                zi -= 1;
            }
        }
    }
    zs
}

/// Quotient and remainder of two magnitudes (Knuth 4.3.1, Algorithm D).
/// The divisor must be non-empty; public entry points check that.
fn div_mod_mag(x: &[Digit], y: &[Digit]) -> (Vec<Digit>, Vec<Digit>) {
    let ylen = y.len();
    debug_assert!(ylen != 0);

    let xlen = x.len();
    if xlen == 0 {
        return (Vec::new(), Vec::new());
    }

    match compare_mag(x, y) {
        Ordering::Equal => return (vec![1], Vec::new()),
        Ordering::Less => return (Vec::new(), x.to_vec()),
        Ordering::Greater => {}
    }

    // Single-word divisor fast path.
    if ylen == 1 {
        let (q, rem) = copy_div_rem(x, y[0]);
        return (q, if rem == 0 { Vec::new() } else { vec![rem] });
    }

    // D1. Normalize so the divisor's leading word has its high bit set;
    // both operands shift by the same amount.
    let shift = y[0].leading_zeros();

    let mut xnorm = vec![0 as Digit; xlen + 1];
    let mut ynorm = vec![0 as Digit; ylen];
    normalize(&mut xnorm, x, shift);
    normalize(&mut ynorm, y, shift);

    const SUPER_B: Digit2X = 1 << DIGIT_BITS;

    let mut q = vec![0 as Digit; xlen - ylen + 1];

    // D2/D7: one quotient word per position, most significant first.
    for j in 0..=(xlen - ylen) {
        // D3: estimate the quotient word from the top two dividend words.
        let toptwo = (xnorm[j] as Digit2X) * SUPER_B + xnorm[j + 1] as Digit2X;
        let mut qhat = toptwo / ynorm[0] as Digit2X;
        let mut rhat = toptwo % ynorm[0] as Digit2X;

        loop {
            if qhat < SUPER_B
                && qhat * ynorm[1] as Digit2X <= SUPER_B * rhat + xnorm[j + 2] as Digit2X
            {
                break;
            }
            qhat -= 1;
            rhat += ynorm[0] as Digit2X;
            if rhat >= SUPER_B {
                break;
            }
        }

        // D4: multiply and subtract.
        let mut borrow: i64 = 0;
        let mut temp: i64;
        for k in (0..ylen).rev() {
            let i = j + k + 1;
            let val = ynorm[k] as Digit2X * qhat;
            temp = xnorm[i] as i64 - loword(val) as i64 - borrow;
            xnorm[i] = temp as Digit;
            borrow = (val >> DIGIT_BITS) as i64 - (temp >> DIGIT_BITS);
        }
        temp = xnorm[j] as i64 - borrow;
        xnorm[j] = temp as Digit;

        // D5: tentative quotient word.
        q[j] = qhat as Digit;

        // D6: went negative, add the divisor back.
        if temp < 0 {
            q[j] -= 1;
            let mut carry: Digit2X = 0;
            for k in (0..ylen).rev() {
                let i = j + k + 1;
                carry = ynorm[k] as Digit2X + xnorm[i] as Digit2X + carry;
                xnorm[i] = loword(carry);
                carry >>= DIGIT_BITS;
            }
            carry += xnorm[j] as Digit2X;
            xnorm[j] = loword(carry);
        }
    }

    let r = unnormalize(&xnorm, shift);
    (q, r)
}

/// Copies `x` into `out` shifted left by `shift` bits. `out` is either the
/// same length (the carry must then be zero) or one word longer.
fn normalize(out: &mut [Digit], x: &[Digit], shift: u32) {
    let offset = out.len() - x.len();
    if shift == 0 {
        out[offset..].copy_from_slice(x);
        if offset == 1 {
            out[0] = 0;
        }
        return;
    }

    let rshift = DIGIT_BITS - shift;
    let mut carry = 0;
    for i in (0..x.len()).rev() {
        let xi = x[i];
        out[i + offset] = (xi << shift) | carry;
        carry = xi >> rshift;
    }

    if offset == 0 {
        debug_assert_eq!(carry, 0, "carry off the left end");
    } else {
        out[0] = carry;
    }
}

fn unnormalize(xnorm: &[Digit], shift: u32) -> Vec<Digit> {
    let len = xnorm.len();
    let mut r = vec![0 as Digit; len];

    if shift == 0 {
        r.copy_from_slice(xnorm);
    } else {
        let lshift = DIGIT_BITS - shift;
        let mut carry = 0;
        for i in 0..len {
            let val = xnorm[i];
            r[i] = (val >> shift) | carry;
            carry = val << lshift;
        }
    }

    remove_leading_zeros(r)
}

/// `data = data * mult + addend`, in place.
fn in_place_mul_add(data: &mut [Digit], mult: Digit, addend: Digit) {
    let len = data.len();

    let mut carry: Digit2X = 0;
    for i in (0..len).rev() {
        let product = data[i] as Digit2X * mult as Digit2X + carry;
        data[i] = loword(product);
        carry = product >> DIGIT_BITS;
    }

    let mut sum = data[len - 1] as Digit2X + addend as Digit2X;
    data[len - 1] = loword(sum);
    carry = sum >> DIGIT_BITS;

    let mut i = len - 1;
    while i > 0 && carry > 0 {
        i -= 1;
        sum = data[i] as Digit2X + carry;
        data[i] = loword(sum);
        carry = sum >> DIGIT_BITS;
    }
}

/// Divides `data[index..]` by a single word in place and returns the
/// remainder; `index` advances past quotient words that became zero.
fn in_place_div_rem(data: &mut [Digit], index: &mut usize, divisor: Digit) -> Digit {
    let mut rem: Digit2X = 0;
    let mut seen_non_zero = false;
    for i in *index..data.len() {
        rem = (rem << DIGIT_BITS) | data[i] as Digit2X;
        let q = (rem / divisor as Digit2X) as Digit;
        data[i] = q;
        if q == 0 {
            if !seen_non_zero {
                *index += 1;
            }
        } else {
            seen_non_zero = true;
        }
        rem %= divisor as Digit2X;
    }
    rem as Digit
}

/// Single-word division into a fresh quotient, returning the remainder.
fn copy_div_rem(data: &[Digit], divisor: Digit) -> (Vec<Digit>, Digit) {
    let mut quotient = vec![0 as Digit; data.len()];
    let mut rem: Digit2X = 0;
    for (i, &d) in data.iter().enumerate() {
        rem = (rem << DIGIT_BITS) | d as Digit2X;
        quotient[i] = (rem / divisor as Digit2X) as Digit;
        rem %= divisor as Digit2X;
    }
    (remove_leading_zeros(quotient), rem as Digit)
}

/// Converts a two's-complement word array (big-endian, known negative)
/// back to magnitude form, in place.
fn make_twos_complement(a: &mut [Digit]) {
    let mut i = a.len();
    let mut carry = true;
    while i > 0 && carry {
        i -= 1;
        let digit = (!a[i]).wrapping_add(1);
        a[i] = digit;
        carry = digit == 0;
    }
    while i > 0 {
        i -= 1;
        a[i] = !a[i];
    }
}

fn hybrid_gcd(mut a: BigInt, mut b: BigInt) -> BigInt {
    while !b.digits.is_empty() {
        if a.digits.len().abs_diff(b.digits.len()) < 2 {
            return binary_gcd(a, b);
        }
        let (_, r) = div_mod_mag(&a.digits, &b.digits);
        a = b;
        b = BigInt::new(Sign::Positive, r);
    }
    a
}

/// Knuth 4.5.5, Algorithm B. Both inputs positive and of similar length.
fn binary_gcd(mut a: BigInt, mut b: BigInt) -> BigInt {
    // B1: factor out the common power of two.
    let s1 = a.lowest_set_bit().unwrap_or(0);
    let s2 = b.lowest_set_bit().unwrap_or(0);
    let k = s1.min(s2) as i32;
    if k != 0 {
        a = a.shift_right(k);
        b = b.shift_right(k);
    }

    // B2: initialize.
    let mut t;
    let mut tsign;
    if k == s1 as i32 {
        t = b.clone();
        tsign = -1;
    } else {
        t = a.clone();
        tsign = 1;
    }

    while let Some(lb) = t.lowest_set_bit() {
        // B3/B4: halve t until odd.
        t = t.shift_right(lb as i32);
        // B5: reset max(u, v).
        if tsign > 0 {
            a = t.clone();
        } else {
            b = t.clone();
        }

        // Down to single words? Finish with the word-sized algorithm.
        if let (Ok(x), Ok(y)) = (a.to_u32(), b.to_u32()) {
            let g = BigInt::from_u32(word_binary_gcd(x, y));
            return if k > 0 { g.shift_left(k) } else { g };
        }

        // B6: subtract.
        t = a.subtract(&b);
        if t.is_zero() {
            break;
        }
        if t.is_positive() {
            tsign = 1;
        } else {
            tsign = -1;
            t = t.abs();
        }
    }

    if k > 0 {
        a = a.shift_left(k);
    }
    a
}

/// Word-sized binary GCD, trailing zeros stripped with the hardware count.
fn word_binary_gcd(mut a: u32, mut b: u32) -> u32 {
    if b == 0 {
        return a;
    }
    if a == 0 {
        return b;
    }

    let a_zeros = a.trailing_zeros();
    let b_zeros = b.trailing_zeros();
    a >>= a_zeros;
    b >>= b_zeros;

    let t = a_zeros.min(b_zeros);

    while a != b {
        if a > b {
            a -= b;
            a >>= a.trailing_zeros();
        } else {
            b -= a;
            b >>= b.trailing_zeros();
        }
    }
    a << t
}
