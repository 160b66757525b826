//! # Numeric tower dispatch
//!
//! A [`Number`] is one of seven runtime variants. Binary operations
//! inspect both operands, promote to the wider category along
//!
//! `int32 < int64 < BigInt < ScaledDecimal < Rational < float32 < float64`
//!
//! delegate to that category's engine, then reduce integer results back to
//! the narrowest variant that represents them exactly. Machine integer
//! arithmetic is overflow-checked: an overflowing `i32` operation re-runs
//! at `i64` width, an overflowing `i64` operation at [`BigInt`] width, so
//! no operation ever wraps.
//!
//! Decimal operations accept an optional ambient [`Context`]; `None`
//! selects the exact (unlimited precision) forms.

use std::cmp::Ordering;
use std::fmt;

use crate::bigint::BigInt;
use crate::decimal::{BigDecimal, Context};
use crate::error::{NumericError, NumericResult};
use crate::rational::Rational;

#[derive(Clone, Debug)]
pub enum Number {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Ratio(Rational),
    Big(BigInt),
    Decimal(BigDecimal),
}

/// Promotion precedence; a binary operation runs in the wider category of
/// its two operands.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
enum Category {
    Int32,
    Int64,
    Big,
    Decimal,
    Ratio,
    Float32,
    Float64,
}

impl Number {
    fn category(&self) -> Category {
        match self {
            Number::Int32(_) => Category::Int32,
            Number::Int64(_) => Category::Int64,
            Number::Big(_) => Category::Big,
            Number::Decimal(_) => Category::Decimal,
            Number::Ratio(_) => Category::Ratio,
            Number::Float32(_) => Category::Float32,
            Number::Float64(_) => Category::Float64,
        }
    }

    // ----- reduction -----

    /// Narrowest integer variant holding `v` exactly.
    fn reduce_i64(v: i64) -> Number {
        match i32::try_from(v) {
            Ok(v) => Number::Int32(v),
            Err(_) => Number::Int64(v),
        }
    }

    fn reduce_bigint(v: BigInt) -> Number {
        match v.to_i64() {
            Ok(l) => Number::reduce_i64(l),
            Err(_) => Number::Big(v),
        }
    }

    /// An integral rational demotes to an integer variant; anything else
    /// stays a ratio.
    fn from_rational(r: Rational) -> Number {
        if r.is_integral() {
            Number::reduce_bigint(r.numerator().clone())
        } else {
            Number::Ratio(r)
        }
    }

    // ----- promotion -----

    fn to_f64(&self) -> f64 {
        match self {
            Number::Int32(v) => *v as f64,
            Number::Int64(v) => *v as f64,
            Number::Float32(v) => *v as f64,
            Number::Float64(v) => *v,
            Number::Big(v) => v.to_f64(),
            Number::Ratio(v) => v.to_f64(),
            Number::Decimal(v) => v.to_f64(),
        }
    }

    fn to_i64_unchecked(&self) -> i64 {
        match self {
            Number::Int32(v) => *v as i64,
            Number::Int64(v) => *v,
            _ => unreachable!("integer category holds only machine ints"),
        }
    }

    fn to_bigint(&self) -> BigInt {
        match self {
            Number::Int32(v) => BigInt::from_i32(*v),
            Number::Int64(v) => BigInt::from_i64(*v),
            Number::Big(v) => v.clone(),
            _ => unreachable!("bigint category holds only exact integers"),
        }
    }

    fn to_decimal(&self) -> BigDecimal {
        match self {
            Number::Int32(v) => BigDecimal::from_i64(*v as i64),
            Number::Int64(v) => BigDecimal::from_i64(*v),
            Number::Big(v) => BigDecimal::from_bigint(v.clone()),
            Number::Decimal(v) => v.clone(),
            _ => unreachable!("decimal category excludes ratios and floats"),
        }
    }

    /// Exact rational view; decimals convert via `coeff * 10^exp`.
    fn to_rational(&self) -> NumericResult<Rational> {
        match self {
            Number::Int32(v) => Ok(Rational::from_bigint(BigInt::from_i32(*v))),
            Number::Int64(v) => Ok(Rational::from_bigint(BigInt::from_i64(*v))),
            Number::Big(v) => Ok(Rational::from_bigint(v.clone())),
            Number::Ratio(v) => Ok(v.clone()),
            Number::Decimal(v) => {
                let exp = v.exponent() as i64;
                if exp >= 0 {
                    Ok(Rational::from_bigint(
                        v.coefficient().multiply(&ten_pow(exp)?),
                    ))
                } else {
                    Rational::new(v.coefficient().clone(), ten_pow(-exp)?)
                }
            }
            _ => unreachable!("ratio category excludes floats"),
        }
    }

    /// Rational view of the ratio category's integer members; decimals are
    /// handled by [`cmp_ratio_decimal`] instead of being materialized.
    fn as_ratio(&self) -> Rational {
        match self {
            Number::Int32(v) => Rational::from_bigint(BigInt::from_i32(*v)),
            Number::Int64(v) => Rational::from_bigint(BigInt::from_i64(*v)),
            Number::Big(v) => Rational::from_bigint(v.clone()),
            Number::Ratio(v) => v.clone(),
            _ => unreachable!("ratio category excludes floats and decimals"),
        }
    }

    /// Three-way comparison in the ratio category.
    fn cmp_in_ratio(&self, y: &Number) -> Ordering {
        match (self, y) {
            (Number::Decimal(dx), _) => cmp_ratio_decimal(&y.as_ratio(), dx).reverse(),
            (_, Number::Decimal(dy)) => cmp_ratio_decimal(&self.as_ratio(), dy),
            _ => self.as_ratio().cmp(&y.as_ratio()),
        }
    }

    // ----- predicates -----

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int32(v) => *v == 0,
            Number::Int64(v) => *v == 0,
            Number::Float32(v) => *v == 0.0,
            Number::Float64(v) => *v == 0.0,
            Number::Big(v) => v.is_zero(),
            Number::Ratio(v) => v.is_zero(),
            Number::Decimal(v) => v.is_zero(),
        }
    }

    pub fn is_positive(&self) -> bool {
        match self {
            Number::Int32(v) => *v > 0,
            Number::Int64(v) => *v > 0,
            Number::Float32(v) => *v > 0.0,
            Number::Float64(v) => *v > 0.0,
            Number::Big(v) => v.is_positive(),
            Number::Ratio(v) => v.is_positive(),
            Number::Decimal(v) => v.is_positive(),
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Number::Int32(v) => *v < 0,
            Number::Int64(v) => *v < 0,
            Number::Float32(v) => *v < 0.0,
            Number::Float64(v) => *v < 0.0,
            Number::Big(v) => v.is_negative(),
            Number::Ratio(v) => v.is_negative(),
            Number::Decimal(v) => v.is_negative(),
        }
    }

    // ----- binary arithmetic -----

    pub fn add(&self, y: &Number, ctx: Option<&Context>) -> NumericResult<Number> {
        match self.category().max(y.category()) {
            Category::Float32 | Category::Float64 => {
                Ok(Number::Float64(self.to_f64() + y.to_f64()))
            }
            Category::Ratio => Ok(Number::from_rational(
                self.to_rational()?.add(&y.to_rational()?)?,
            )),
            Category::Decimal => {
                let (dx, dy) = (self.to_decimal(), y.to_decimal());
                Ok(Number::Decimal(match ctx {
                    Some(c) => dx.add_ctx(&dy, c)?,
                    None => dx.add(&dy),
                }))
            }
            Category::Big => Ok(Number::reduce_bigint(self.to_bigint().add(&y.to_bigint()))),
            Category::Int64 => {
                let (lx, ly) = (self.to_i64_unchecked(), y.to_i64_unchecked());
                match lx.checked_add(ly) {
                    Some(ret) => Ok(Number::reduce_i64(ret)),
                    None => {
                        log::trace!("i64 add overflow, widening to bigint");
                        Ok(Number::reduce_bigint(
                            BigInt::from_i64(lx).add(&BigInt::from_i64(ly)),
                        ))
                    }
                }
            }
            Category::Int32 => {
                let (lx, ly) = (self.to_i64_unchecked() as i32, y.to_i64_unchecked() as i32);
                match lx.checked_add(ly) {
                    Some(ret) => Ok(Number::Int32(ret)),
                    None => Ok(Number::reduce_i64(lx as i64 + ly as i64)),
                }
            }
        }
    }

    pub fn subtract(&self, y: &Number, ctx: Option<&Context>) -> NumericResult<Number> {
        match self.category().max(y.category()) {
            Category::Float32 | Category::Float64 => {
                Ok(Number::Float64(self.to_f64() - y.to_f64()))
            }
            Category::Ratio => Ok(Number::from_rational(
                self.to_rational()?.subtract(&y.to_rational()?)?,
            )),
            Category::Decimal => {
                let (dx, dy) = (self.to_decimal(), y.to_decimal());
                Ok(Number::Decimal(match ctx {
                    Some(c) => dx.subtract_ctx(&dy, c)?,
                    None => dx.subtract(&dy),
                }))
            }
            Category::Big => Ok(Number::reduce_bigint(
                self.to_bigint().subtract(&y.to_bigint()),
            )),
            Category::Int64 => {
                let (lx, ly) = (self.to_i64_unchecked(), y.to_i64_unchecked());
                match lx.checked_sub(ly) {
                    Some(ret) => Ok(Number::reduce_i64(ret)),
                    None => Ok(Number::reduce_bigint(
                        BigInt::from_i64(lx).subtract(&BigInt::from_i64(ly)),
                    )),
                }
            }
            Category::Int32 => {
                let (lx, ly) = (self.to_i64_unchecked() as i32, y.to_i64_unchecked() as i32);
                match lx.checked_sub(ly) {
                    Some(ret) => Ok(Number::Int32(ret)),
                    None => Ok(Number::reduce_i64(lx as i64 - ly as i64)),
                }
            }
        }
    }

    pub fn multiply(&self, y: &Number, ctx: Option<&Context>) -> NumericResult<Number> {
        match self.category().max(y.category()) {
            Category::Float32 | Category::Float64 => {
                Ok(Number::Float64(self.to_f64() * y.to_f64()))
            }
            Category::Ratio => Ok(Number::from_rational(
                self.to_rational()?.multiply(&y.to_rational()?)?,
            )),
            Category::Decimal => {
                let (dx, dy) = (self.to_decimal(), y.to_decimal());
                Ok(Number::Decimal(match ctx {
                    Some(c) => dx.multiply_ctx(&dy, c)?,
                    None => dx.multiply(&dy)?,
                }))
            }
            Category::Big => Ok(Number::reduce_bigint(
                self.to_bigint().multiply(&y.to_bigint()),
            )),
            Category::Int64 => {
                let (lx, ly) = (self.to_i64_unchecked(), y.to_i64_unchecked());
                match lx.checked_mul(ly) {
                    Some(ret) => Ok(Number::reduce_i64(ret)),
                    None => {
                        log::trace!("i64 multiply overflow, widening to bigint");
                        Ok(Number::reduce_bigint(
                            BigInt::from_i64(lx).multiply(&BigInt::from_i64(ly)),
                        ))
                    }
                }
            }
            Category::Int32 => {
                let (lx, ly) = (self.to_i64_unchecked() as i32, y.to_i64_unchecked() as i32);
                match lx.checked_mul(ly) {
                    Some(ret) => Ok(Number::Int32(ret)),
                    None => Ok(Number::reduce_i64(lx as i64 * ly as i64)),
                }
            }
        }
    }

    /// Exact division. Two integers that do not divide evenly produce a
    /// reduced [`Rational`]; an even division demotes to the narrowest
    /// integer. NaN operands pass through; a zero divisor is an error in
    /// every category.
    pub fn divide(&self, y: &Number, ctx: Option<&Context>) -> NumericResult<Number> {
        if self.is_nan() {
            return Ok(self.clone());
        }
        if y.is_nan() {
            return Ok(y.clone());
        }
        if y.is_zero() {
            return Err(NumericError::DivisionByZero);
        }

        match self.category().max(y.category()) {
            Category::Float32 | Category::Float64 => {
                Ok(Number::Float64(self.to_f64() / y.to_f64()))
            }
            Category::Ratio => Ok(Number::from_rational(
                self.to_rational()?.divide(&y.to_rational()?)?,
            )),
            Category::Decimal => {
                let (dx, dy) = (self.to_decimal(), y.to_decimal());
                Ok(Number::Decimal(match ctx {
                    Some(c) => dx.divide_ctx(&dy, c)?,
                    None => dx.divide(&dy)?,
                }))
            }
            Category::Big | Category::Int64 | Category::Int32 => Ok(Number::from_rational(
                Rational::new(self.to_bigint(), y.to_bigint())?,
            )),
        }
    }

    /// Truncating integer quotient.
    pub fn quotient(&self, y: &Number, ctx: Option<&Context>) -> NumericResult<Number> {
        if y.is_zero() {
            return Err(NumericError::DivisionByZero);
        }

        match self.category().max(y.category()) {
            Category::Float32 | Category::Float64 => {
                Ok(Number::Float64(f64_quotient(self.to_f64(), y.to_f64())?))
            }
            Category::Ratio => {
                let (rx, ry) = (self.to_rational()?, y.to_rational()?);
                let n = rx.numerator().multiply(ry.denominator());
                let d = rx.denominator().multiply(ry.numerator());
                Ok(Number::reduce_bigint(n.div_rem(&d)?.0))
            }
            Category::Decimal => {
                let (dx, dy) = (self.to_decimal(), y.to_decimal());
                Ok(Number::Decimal(match ctx {
                    Some(c) => dx.divide_integer_ctx(&dy, c)?,
                    None => dx.divide_integer(&dy)?,
                }))
            }
            Category::Big => Ok(Number::reduce_bigint(
                self.to_bigint().div_rem(&y.to_bigint())?.0,
            )),
            Category::Int64 => {
                let (lx, ly) = (self.to_i64_unchecked(), y.to_i64_unchecked());
                match lx.checked_div(ly) {
                    Some(ret) => Ok(Number::reduce_i64(ret)),
                    // i64::MIN / -1
                    None => Ok(Number::reduce_bigint(
                        BigInt::from_i64(lx).div_rem(&BigInt::from_i64(ly))?.0,
                    )),
                }
            }
            Category::Int32 => {
                let (lx, ly) = (self.to_i64_unchecked() as i32, y.to_i64_unchecked() as i32);
                match lx.checked_div(ly) {
                    Some(ret) => Ok(Number::Int32(ret)),
                    None => Ok(Number::reduce_i64(lx as i64 / ly as i64)),
                }
            }
        }
    }

    /// Truncating remainder; satisfies `x == quotient(x,y)*y + remainder(x,y)`
    /// and carries the dividend's sign.
    pub fn remainder(&self, y: &Number, ctx: Option<&Context>) -> NumericResult<Number> {
        if y.is_zero() {
            return Err(NumericError::DivisionByZero);
        }

        match self.category().max(y.category()) {
            Category::Float32 | Category::Float64 => {
                Ok(Number::Float64(f64_remainder(self.to_f64(), y.to_f64())?))
            }
            Category::Ratio => {
                let (rx, ry) = (self.to_rational()?, y.to_rational()?);
                let n = rx.numerator().multiply(ry.denominator());
                let d = rx.denominator().multiply(ry.numerator());
                let q = Rational::from_bigint(n.div_rem(&d)?.0);
                Ok(Number::from_rational(rx.subtract(&q.multiply(&ry)?)?))
            }
            Category::Decimal => {
                let (dx, dy) = (self.to_decimal(), y.to_decimal());
                Ok(Number::Decimal(match ctx {
                    Some(c) => dx.rem_ctx(&dy, c)?,
                    None => dx.rem(&dy)?,
                }))
            }
            Category::Big => Ok(Number::reduce_bigint(
                self.to_bigint().div_rem(&y.to_bigint())?.1,
            )),
            Category::Int64 => {
                let (lx, ly) = (self.to_i64_unchecked(), y.to_i64_unchecked());
                match lx.checked_rem(ly) {
                    Some(ret) => Ok(Number::reduce_i64(ret)),
                    // i64::MIN % -1 == 0
                    None => Ok(Number::Int32(0)),
                }
            }
            Category::Int32 => {
                let (lx, ly) = (self.to_i64_unchecked() as i32, y.to_i64_unchecked() as i32);
                match lx.checked_rem(ly) {
                    Some(ret) => Ok(Number::Int32(ret)),
                    None => Ok(Number::Int32(0)),
                }
            }
        }
    }

    // ----- unary arithmetic -----

    pub fn negate(&self, ctx: Option<&Context>) -> NumericResult<Number> {
        match self {
            Number::Int32(v) => Ok(match v.checked_neg() {
                Some(ret) => Number::Int32(ret),
                None => Number::reduce_i64(-(*v as i64)),
            }),
            Number::Int64(v) => Ok(match v.checked_neg() {
                Some(ret) => Number::reduce_i64(ret),
                None => Number::Big(BigInt::from_i64(*v).negate()),
            }),
            Number::Float32(v) => Ok(Number::Float64(-(*v as f64))),
            Number::Float64(v) => Ok(Number::Float64(-v)),
            Number::Big(v) => Ok(Number::reduce_bigint(v.negate())),
            Number::Ratio(v) => Ok(Number::Ratio(v.negate())),
            Number::Decimal(v) => Ok(Number::Decimal(match ctx {
                Some(c) => v.negate_ctx(c)?,
                None => v.negate(),
            })),
        }
    }

    pub fn abs(&self, ctx: Option<&Context>) -> NumericResult<Number> {
        if self.is_negative() {
            self.negate(ctx)
        } else {
            Ok(self.clone())
        }
    }

    pub fn inc(&self, ctx: Option<&Context>) -> NumericResult<Number> {
        self.add(&Number::Int32(1), ctx)
    }

    pub fn dec(&self, ctx: Option<&Context>) -> NumericResult<Number> {
        self.subtract(&Number::Int32(1), ctx)
    }

    // ----- comparison -----

    /// Numeric equality across variants: `1`, `1.0` and a decimal `1.00`
    /// are all equivalent. Decimals compare by value, not structure.
    pub fn equiv(&self, y: &Number) -> bool {
        match self.category().max(y.category()) {
            Category::Float32 | Category::Float64 => self.to_f64() == y.to_f64(),
            Category::Ratio => self.cmp_in_ratio(y) == Ordering::Equal,
            Category::Decimal => {
                self.to_decimal().compare_to(&y.to_decimal()) == Ordering::Equal
            }
            Category::Big => self.to_bigint() == y.to_bigint(),
            Category::Int64 | Category::Int32 => {
                self.to_i64_unchecked() == y.to_i64_unchecked()
            }
        }
    }

    pub fn lt(&self, y: &Number) -> bool {
        match self.category().max(y.category()) {
            Category::Float32 | Category::Float64 => self.to_f64() < y.to_f64(),
            Category::Ratio => self.cmp_in_ratio(y) == Ordering::Less,
            Category::Decimal => {
                self.to_decimal().compare_to(&y.to_decimal()) == Ordering::Less
            }
            Category::Big => self.to_bigint() < y.to_bigint(),
            Category::Int64 | Category::Int32 => {
                self.to_i64_unchecked() < y.to_i64_unchecked()
            }
        }
    }

    pub fn gt(&self, y: &Number) -> bool {
        y.lt(self)
    }

    pub fn le(&self, y: &Number) -> bool {
        self.lt(y) || self.equiv(y)
    }

    pub fn ge(&self, y: &Number) -> bool {
        y.lt(self) || self.equiv(y)
    }

    /// Three-way comparison derived from `lt` both ways; incomparable
    /// pairs (a NaN operand) come out `Equal`.
    pub fn compare(&self, y: &Number) -> Ordering {
        if self.lt(y) {
            Ordering::Less
        } else if y.lt(self) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    fn is_nan(&self) -> bool {
        match self {
            Number::Float32(v) => v.is_nan(),
            Number::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    // ----- bit operations -----

    /// Width for a bit operation: the wider of the two integer strategies.
    /// Floats, ratios and decimals have no bit representation here.
    fn bit_category(&self) -> NumericResult<Category> {
        match self {
            Number::Int32(_) => Ok(Category::Int32),
            Number::Int64(_) => Ok(Category::Int64),
            Number::Big(_) => Ok(Category::Big),
            _ => Err(NumericError::Domain(format!(
                "bit operation not supported on {}",
                self.type_name()
            ))),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Number::Int32(_) => "int32",
            Number::Int64(_) => "int64",
            Number::Float32(_) => "float32",
            Number::Float64(_) => "float64",
            Number::Ratio(_) => "rational",
            Number::Big(_) => "bigint",
            Number::Decimal(_) => "decimal",
        }
    }

    fn bit_binary(
        &self,
        y: &Number,
        op32: impl Fn(i32, i32) -> i32,
        op64: impl Fn(i64, i64) -> i64,
        opbig: impl Fn(&BigInt, &BigInt) -> BigInt,
    ) -> NumericResult<Number> {
        match self.bit_category()?.max(y.bit_category()?) {
            Category::Big => Ok(Number::Big(opbig(&self.to_bigint(), &y.to_bigint()))),
            Category::Int64 => Ok(Number::Int64(op64(
                self.to_i64_unchecked(),
                y.to_i64_unchecked(),
            ))),
            _ => Ok(Number::Int32(op32(
                self.to_i64_unchecked() as i32,
                y.to_i64_unchecked() as i32,
            ))),
        }
    }

    pub fn bit_and(&self, y: &Number) -> NumericResult<Number> {
        self.bit_binary(y, |a, b| a & b, |a, b| a & b, BigInt::and)
    }

    pub fn bit_or(&self, y: &Number) -> NumericResult<Number> {
        self.bit_binary(y, |a, b| a | b, |a, b| a | b, BigInt::or)
    }

    pub fn bit_xor(&self, y: &Number) -> NumericResult<Number> {
        self.bit_binary(y, |a, b| a ^ b, |a, b| a ^ b, BigInt::xor)
    }

    pub fn bit_and_not(&self, y: &Number) -> NumericResult<Number> {
        self.bit_binary(y, |a, b| a & !b, |a, b| a & !b, BigInt::and_not)
    }

    pub fn bit_not(&self) -> NumericResult<Number> {
        match self.bit_category()? {
            Category::Big => Ok(Number::Big(self.to_bigint().not())),
            Category::Int64 => Ok(Number::Int64(!self.to_i64_unchecked())),
            _ => Ok(Number::Int32(!(self.to_i64_unchecked() as i32))),
        }
    }

    /// Machine widths use the platform shift (count masked to the width);
    /// bigints shift exactly, with a negative count reversing direction.
    pub fn shift_left(&self, n: i32) -> NumericResult<Number> {
        match self.bit_category()? {
            Category::Big => Ok(Number::Big(self.to_bigint().shift_left(n))),
            Category::Int64 => Ok(Number::Int64(
                self.to_i64_unchecked().wrapping_shl(n as u32),
            )),
            _ => Ok(Number::Int32(
                (self.to_i64_unchecked() as i32).wrapping_shl(n as u32),
            )),
        }
    }

    pub fn shift_right(&self, n: i32) -> NumericResult<Number> {
        match self.bit_category()? {
            Category::Big => Ok(Number::Big(self.to_bigint().shift_right(n))),
            Category::Int64 => Ok(Number::Int64(
                self.to_i64_unchecked().wrapping_shr(n as u32),
            )),
            _ => Ok(Number::Int32(
                (self.to_i64_unchecked() as i32).wrapping_shr(n as u32),
            )),
        }
    }

    pub fn test_bit(&self, n: i32) -> NumericResult<bool> {
        match self.bit_category()? {
            Category::Big => self.to_bigint().test_bit(n),
            Category::Int64 => Ok(self.to_i64_unchecked() & 1i64.wrapping_shl(n as u32) != 0),
            _ => Ok((self.to_i64_unchecked() as i32) & 1i32.wrapping_shl(n as u32) != 0),
        }
    }

    pub fn set_bit(&self, n: i32) -> NumericResult<Number> {
        match self.bit_category()? {
            Category::Big => Ok(Number::Big(self.to_bigint().set_bit(n)?)),
            Category::Int64 => Ok(Number::Int64(
                self.to_i64_unchecked() | 1i64.wrapping_shl(n as u32),
            )),
            _ => Ok(Number::Int32(
                (self.to_i64_unchecked() as i32) | 1i32.wrapping_shl(n as u32),
            )),
        }
    }

    pub fn clear_bit(&self, n: i32) -> NumericResult<Number> {
        match self.bit_category()? {
            Category::Big => Ok(Number::Big(self.to_bigint().clear_bit(n)?)),
            Category::Int64 => Ok(Number::Int64(
                self.to_i64_unchecked() & !1i64.wrapping_shl(n as u32),
            )),
            _ => Ok(Number::Int32(
                (self.to_i64_unchecked() as i32) & !1i32.wrapping_shl(n as u32),
            )),
        }
    }

    pub fn flip_bit(&self, n: i32) -> NumericResult<Number> {
        match self.bit_category()? {
            Category::Big => Ok(Number::Big(self.to_bigint().flip_bit(n)?)),
            Category::Int64 => Ok(Number::Int64(
                self.to_i64_unchecked() ^ 1i64.wrapping_shl(n as u32),
            )),
            _ => Ok(Number::Int32(
                (self.to_i64_unchecked() as i32) ^ 1i32.wrapping_shl(n as u32),
            )),
        }
    }
}

/// Truncated float quotient; quotients beyond `i64` range truncate through
/// the exact decimal path.
fn f64_quotient(n: f64, d: f64) -> NumericResult<f64> {
    let q = n / d;
    if (i64::MIN as f64..=i64::MAX as f64).contains(&q) {
        Ok((q as i64) as f64)
    } else {
        Ok(BigDecimal::try_from_f64(q)?.to_bigint()?.to_f64())
    }
}

fn f64_remainder(n: f64, d: f64) -> NumericResult<f64> {
    let q = n / d;
    if (i64::MIN as f64..=i64::MAX as f64).contains(&q) {
        Ok(n - ((q as i64) as f64) * d)
    } else {
        let bq = BigDecimal::try_from_f64(q)?.to_bigint()?;
        Ok(n - bq.to_f64() * d)
    }
}

/// Compares `x` with `coefficient * 10^exponent` exactly. Digit-count
/// bounds settle the far-apart cases first, so a power of ten is only
/// built when it is comparable in size to the operands themselves.
fn cmp_ratio_decimal(x: &Rational, y: &BigDecimal) -> Ordering {
    let sx = x.signum();
    let sy = y.signum();
    if sx != sy {
        return sx.cmp(&sy);
    }
    if sx == 0 {
        return Ordering::Equal;
    }

    // |x| lies in (10^(a-b-1), 10^(a-b+1)); |y| in [10^adj, 10^(adj+1)).
    let a = x.numerator().precision() as i64;
    let b = x.denominator().precision() as i64;
    let adj = y.exponent() as i64 + y.precision() as i64 - 1;
    if a - b + 1 <= adj {
        return if sx > 0 { Ordering::Less } else { Ordering::Greater };
    }
    if a - b - 1 > adj {
        return if sx > 0 { Ordering::Greater } else { Ordering::Less };
    }

    // n/d vs c*10^e; the power lands on whichever side keeps it
    // non-negative, and cross-multiplication preserves order since d > 0.
    let e = y.exponent() as i64;
    if e >= 0 {
        x.numerator()
            .cmp(&x.denominator().multiply(y.coefficient()).multiply(&pow10(e)))
    } else {
        x.numerator()
            .multiply(&pow10(-e))
            .cmp(&x.denominator().multiply(y.coefficient()))
    }
}

fn pow10(n: i64) -> BigInt {
    let mut result = BigInt::one();
    let mut base = BigInt::ten();
    let mut e = n;
    while e > 0 {
        if e & 1 == 1 {
            result = result.multiply(&base);
        }
        e >>= 1;
        if e > 0 {
            base = base.multiply(&base);
        }
    }
    result
}

fn ten_pow(n: i64) -> NumericResult<BigInt> {
    let n = i32::try_from(n)
        .map_err(|_| NumericError::Domain("decimal exponent out of range".into()))?;
    BigInt::ten().power(n)
}

impl From<i32> for Number {
    fn from(v: i32) -> Number {
        Number::Int32(v)
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Number {
        Number::Int64(v)
    }
}

impl From<f32> for Number {
    fn from(v: f32) -> Number {
        Number::Float32(v)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Number {
        Number::Float64(v)
    }
}

impl From<BigInt> for Number {
    fn from(v: BigInt) -> Number {
        Number::Big(v)
    }
}

impl From<BigDecimal> for Number {
    fn from(v: BigDecimal) -> Number {
        Number::Decimal(v)
    }
}

/// Preserves the tower invariant that a stored ratio never has
/// denominator one.
impl From<Rational> for Number {
    fn from(v: Rational) -> Number {
        Number::from_rational(v)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int32(v) => write!(f, "{}", v),
            Number::Int64(v) => write!(f, "{}", v),
            Number::Float32(v) => write!(f, "{}", v),
            Number::Float64(v) => write!(f, "{}", v),
            Number::Big(v) => write!(f, "{}", v),
            Number::Ratio(v) => write!(f, "{}", v),
            Number::Decimal(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::RoundingMode;

    fn i32n(v: i32) -> Number {
        Number::Int32(v)
    }

    fn i64n(v: i64) -> Number {
        Number::Int64(v)
    }

    fn dec(s: &str) -> Number {
        Number::Decimal(BigDecimal::parse(s).unwrap())
    }

    fn rat(n: i64, d: i64) -> Number {
        Number::Ratio(Rational::new(BigInt::from_i64(n), BigInt::from_i64(d)).unwrap())
    }

    #[test]
    fn test_add_overflow_promotion() {
        // int32 overflow re-executes at int64
        let r = i32n(i32::MAX).add(&i32n(1), None).unwrap();
        assert!(matches!(r, Number::Int64(v) if v == i32::MAX as i64 + 1));

        // int64 overflow re-executes at bigint
        let r = i64n(i64::MAX).add(&i64n(1), None).unwrap();
        match r {
            Number::Big(b) => assert_eq!(b.to_string(), "9223372036854775808"),
            other => panic!("expected Big, got {:?}", other),
        }
    }

    #[test]
    fn test_multiply_overflow_promotion() {
        let r = i64n(i64::MAX).multiply(&i64n(2), None).unwrap();
        match r {
            Number::Big(b) => assert_eq!(b.to_string(), "18446744073709551614"),
            other => panic!("expected Big, got {:?}", other),
        }

        let r = i32n(100_000).multiply(&i32n(100_000), None).unwrap();
        assert!(matches!(r, Number::Int64(10_000_000_000)));
    }

    #[test]
    fn test_reduction_to_narrowest() {
        // int64 results demote to int32 when they fit
        let r = i64n(5).add(&i64n(6), None).unwrap();
        assert!(matches!(r, Number::Int32(11)));

        // bigint results demote all the way down
        let a = Number::Big(BigInt::parse("1099511627776").unwrap());
        let b = Number::Big(BigInt::parse("1099511627775").unwrap());
        let r = a.subtract(&b, None).unwrap();
        assert!(matches!(r, Number::Int32(1)));
    }

    #[test]
    fn test_integer_divide_to_rational() {
        let r = i32n(7).divide(&i32n(2), None).unwrap();
        match r {
            Number::Ratio(q) => assert_eq!(q.to_string(), "7/2"),
            other => panic!("expected Ratio, got {:?}", other),
        }

        // even division demotes to an integer
        let r = i32n(6).divide(&i32n(2), None).unwrap();
        assert!(matches!(r, Number::Int32(3)));

        let r = Number::Big(BigInt::from_i64(7))
            .divide(&Number::Big(BigInt::from_i64(2)), None)
            .unwrap();
        assert!(matches!(r, Number::Ratio(_)));

        // sign lands on the numerator
        let r = i32n(-6).divide(&i32n(4), None).unwrap();
        match r {
            Number::Ratio(q) => assert_eq!(q.to_string(), "-3/2"),
            other => panic!("expected Ratio, got {:?}", other),
        }
    }

    #[test]
    fn test_quotient_remainder() {
        assert!(matches!(i32n(7).quotient(&i32n(2), None).unwrap(), Number::Int32(3)));
        assert!(matches!(i32n(7).remainder(&i32n(2), None).unwrap(), Number::Int32(1)));
        assert!(matches!(i32n(-7).quotient(&i32n(2), None).unwrap(), Number::Int32(-3)));
        assert!(matches!(i32n(-7).remainder(&i32n(2), None).unwrap(), Number::Int32(-1)));

        // i32::MIN / -1 overflows the narrow width
        let r = i32n(i32::MIN).quotient(&i32n(-1), None).unwrap();
        assert!(matches!(r, Number::Int64(2147483648)));
        let r = i32n(i32::MIN).remainder(&i32n(-1), None).unwrap();
        assert!(matches!(r, Number::Int32(0)));

        // float quotient truncates
        let r = Number::Float64(7.5).quotient(&Number::Float64(2.0), None).unwrap();
        assert!(matches!(r, Number::Float64(v) if v == 3.0));
        let r = Number::Float64(7.5).remainder(&Number::Float64(2.0), None).unwrap();
        assert!(matches!(r, Number::Float64(v) if v == 1.5));

        // ratio quotient/remainder truncate too
        let r = rat(7, 2).quotient(&i32n(1), None).unwrap();
        assert!(matches!(r, Number::Int32(3)));
        let r = rat(7, 2).remainder(&i32n(1), None).unwrap();
        match r {
            Number::Ratio(q) => assert_eq!(q.to_string(), "1/2"),
            other => panic!("expected Ratio, got {:?}", other),
        }
    }

    #[test]
    fn test_divide_by_zero() {
        assert!(matches!(
            i32n(1).divide(&i32n(0), None).unwrap_err(),
            NumericError::DivisionByZero
        ));
        // zero divisor errors even for floats at the tower level
        assert!(Number::Float64(1.0).divide(&Number::Float64(0.0), None).is_err());
        assert!(i32n(1).quotient(&i32n(0), None).is_err());
        assert!(i32n(1).remainder(&i32n(0), None).is_err());
    }

    #[test]
    fn test_divide_nan_passthrough() {
        let r = Number::Float64(f64::NAN).divide(&i32n(2), None).unwrap();
        assert!(matches!(r, Number::Float64(v) if v.is_nan()));
        let r = i32n(2).divide(&Number::Float64(f64::NAN), None).unwrap();
        assert!(matches!(r, Number::Float64(v) if v.is_nan()));
    }

    #[test]
    fn test_mixed_promotion() {
        // int + decimal runs in the decimal category
        let r = i32n(1).add(&dec("1.5"), None).unwrap();
        match r {
            Number::Decimal(d) => assert_eq!(d.to_string(), "2.5"),
            other => panic!("expected Decimal, got {:?}", other),
        }

        // int + ratio runs in the ratio category
        let r = rat(1, 2).add(&i32n(1), None).unwrap();
        match r {
            Number::Ratio(q) => assert_eq!(q.to_string(), "3/2"),
            other => panic!("expected Ratio, got {:?}", other),
        }

        // ratio + ratio collapsing to an integer demotes
        let r = rat(1, 2).add(&rat(1, 2), None).unwrap();
        assert!(matches!(r, Number::Int32(1)));

        // a float operand forces float semantics
        let r = i32n(1).add(&Number::Float64(0.5), None).unwrap();
        assert!(matches!(r, Number::Float64(v) if v == 1.5));
        let r = Number::Float32(0.5).multiply(&i64n(4), None).unwrap();
        assert!(matches!(r, Number::Float64(v) if v == 2.0));

        // ratio + decimal stays exact in the ratio category
        let r = rat(1, 2).add(&dec("0.5"), None).unwrap();
        assert!(matches!(r, Number::Int32(1)));
    }

    #[test]
    fn test_ambient_context_threading() {
        let c = Context::with_mode(5, RoundingMode::HalfUp);

        // without a context, decimal division must be exact
        assert!(dec("1").divide(&dec("3"), None).is_err());

        let r = dec("1").divide(&dec("3"), Some(&c)).unwrap();
        match r {
            Number::Decimal(d) => assert_eq!(d.to_string(), "0.33333"),
            other => panic!("expected Decimal, got {:?}", other),
        }

        // integer operands are untouched by the context: exact rational
        let r = i32n(1).divide(&i32n(3), Some(&c)).unwrap();
        assert!(matches!(r, Number::Ratio(_)));
    }

    #[test]
    fn test_equiv_and_compare() {
        assert!(i32n(1).equiv(&Number::Float64(1.0)));
        assert!(i64n(42).equiv(&i32n(42)));
        assert!(!i32n(1).equiv(&i32n(2)));

        // decimals compare numerically in the tower
        assert!(dec("1.0").equiv(&dec("1.00")));
        assert!(dec("1.0").equiv(&i32n(1)));

        assert!(rat(1, 3).lt(&Number::Float64(0.5)));
        assert!(i32n(1).lt(&rat(3, 2)));
        assert_eq!(i32n(3).compare(&i32n(3)), Ordering::Equal);
        assert_eq!(dec("1.5").compare(&i32n(2)), Ordering::Less);
        assert_eq!(
            Number::Big(BigInt::parse("100000000000000000000").unwrap()).compare(&i64n(1)),
            Ordering::Greater
        );

        assert!(i32n(2).gt(&dec("1.5")));
        assert!(i32n(2).le(&i32n(2)));
        assert!(dec("1.0").ge(&i32n(1)));

        // NaN is incomparable: compare yields Equal, every ordering is false
        let nan = Number::Float64(f64::NAN);
        assert_eq!(nan.compare(&i32n(1)), Ordering::Equal);
        assert!(!nan.equiv(&nan));
        assert!(!nan.le(&i32n(1)));
        assert!(!nan.ge(&i32n(1)));
    }

    #[test]
    fn test_ratio_decimal_compare_extreme_exponent() {
        // exponents far beyond any power of ten worth building
        let huge = Number::Decimal(BigDecimal::new(BigInt::one(), 1_000_000_001));
        assert!(rat(1, 2).lt(&huge));
        assert!(!rat(1, 2).equiv(&huge));
        assert_eq!(rat(1, 2).compare(&huge), Ordering::Less);
        assert_eq!(huge.compare(&rat(1, 2)), Ordering::Greater);

        let tiny = Number::Decimal(BigDecimal::new(BigInt::one(), -1_000_000_001));
        assert!(tiny.lt(&rat(1, 2)));
        assert_eq!(rat(1, 2).compare(&tiny), Ordering::Greater);

        let huge_neg = Number::Decimal(BigDecimal::new(BigInt::from_i64(-1), 1_000_000_001));
        assert!(huge_neg.lt(&rat(-1, 2)));

        // overlapping magnitudes still compare exactly
        assert!(rat(1, 2).equiv(&dec("0.5")));
        assert!(rat(1, 3).gt(&dec("0.333")));
        assert!(rat(1, 3).lt(&dec("0.334")));
        assert!(rat(25, 2).equiv(&dec("1.25E+1")));
    }

    #[test]
    fn test_predicates() {
        assert!(i32n(0).is_zero());
        assert!(dec("0.00").is_zero());
        assert!(rat(-1, 2).is_negative());
        assert!(Number::Big(BigInt::from_i64(5)).is_positive());
        assert!(!Number::Float64(-0.0).is_negative());
    }

    #[test]
    fn test_negate_abs_inc_dec() {
        let r = i32n(i32::MIN).negate(None).unwrap();
        assert!(matches!(r, Number::Int64(2147483648)));
        let r = i64n(i64::MIN).negate(None).unwrap();
        assert!(matches!(r, Number::Big(_)));

        let r = rat(-1, 2).abs(None).unwrap();
        match r {
            Number::Ratio(q) => assert_eq!(q.to_string(), "1/2"),
            other => panic!("expected Ratio, got {:?}", other),
        }

        let r = i32n(i32::MAX).inc(None).unwrap();
        assert!(matches!(r, Number::Int64(v) if v == i32::MAX as i64 + 1));
        let r = i32n(5).dec(None).unwrap();
        assert!(matches!(r, Number::Int32(4)));
    }

    #[test]
    fn test_bit_ops_promotion() {
        let r = i32n(0b1100).bit_and(&i32n(0b1010)).unwrap();
        assert!(matches!(r, Number::Int32(0b1000)));

        // mixed widths promote to the wider integer strategy
        let r = i32n(0b1100).bit_or(&i64n(0b0011)).unwrap();
        assert!(matches!(r, Number::Int64(0b1111)));

        let big = Number::Big(BigInt::parse("123456789012345678901234567890").unwrap());
        let r = big.bit_and(&i32n(-1)).unwrap();
        match r {
            Number::Big(b) => assert_eq!(b.to_string(), "123456789012345678901234567890"),
            other => panic!("expected Big, got {:?}", other),
        }

        assert!(matches!(i32n(0b0110).bit_xor(&i32n(0b0011)).unwrap(), Number::Int32(0b0101)));
        assert!(matches!(i32n(0b0110).bit_and_not(&i32n(0b0011)).unwrap(), Number::Int32(0b0100)));
        assert!(matches!(i32n(0).bit_not().unwrap(), Number::Int32(-1)));
    }

    #[test]
    fn test_bit_ops_domain_errors() {
        assert!(matches!(
            Number::Float64(1.0).bit_and(&i32n(1)).unwrap_err(),
            NumericError::Domain(_)
        ));
        assert!(rat(1, 2).bit_or(&i32n(1)).is_err());
        assert!(dec("1.5").bit_not().is_err());
        assert!(i32n(1).bit_xor(&Number::Float32(1.0)).is_err());
    }

    #[test]
    fn test_shifts_and_single_bits() {
        assert!(matches!(i32n(1).shift_left(4).unwrap(), Number::Int32(16)));
        assert!(matches!(i32n(-16).shift_right(2).unwrap(), Number::Int32(-4)));
        assert!(matches!(i64n(1).shift_left(40).unwrap(), Number::Int64(0x100_0000_0000)));

        let r = Number::Big(BigInt::one()).shift_left(100).unwrap();
        match r {
            Number::Big(b) => assert_eq!(b.to_string(), "1267650600228229401496703205376"),
            other => panic!("expected Big, got {:?}", other),
        }

        assert!(i32n(0b100).test_bit(2).unwrap());
        assert!(!i32n(0b100).test_bit(1).unwrap());
        assert!(matches!(i32n(0).set_bit(3).unwrap(), Number::Int32(8)));
        assert!(matches!(i32n(8).clear_bit(3).unwrap(), Number::Int32(0)));
        assert!(matches!(i32n(0).flip_bit(0).unwrap(), Number::Int32(1)));

        // negative index only errors for bigints (machine widths mask)
        assert!(Number::Big(BigInt::one()).test_bit(-1).is_err());
    }

    #[test]
    fn test_division_identity() {
        for (x, y) in [(17, 5), (-17, 5), (17, -5), (-17, -5)] {
            let nx = i32n(x);
            let ny = i32n(y);
            let q = nx.quotient(&ny, None).unwrap();
            let r = nx.remainder(&ny, None).unwrap();
            let back = q.multiply(&ny, None).unwrap().add(&r, None).unwrap();
            assert!(back.equiv(&nx), "{}/{}", x, y);
        }
    }
}
