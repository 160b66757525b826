//! Crate-wide error type.
//!
//! Every failure is raised synchronously at the point of detection and
//! propagated unchanged; there is no partial-result mode.

use thiserror::Error;

pub type NumericResult<T> = Result<T, NumericError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    /// Division by zero, including 0/0 (undefined result).
    #[error("division by zero")]
    DivisionByZero,

    /// Malformed parse input: bad sign placement, missing digits,
    /// malformed exponent, trailing garbage.
    #[error("invalid number format: {0}")]
    Format(String),

    /// Argument outside the operation's domain: radix out of [2,36],
    /// negative exponent, NaN/Infinity, negative bit index, bit operation
    /// on a non-integer.
    #[error("{0}")]
    Domain(String),

    /// Exponent arithmetic left the 32-bit range with a non-zero
    /// coefficient.
    #[error("overflow/underflow in scale")]
    ExponentOverflow,

    /// Rounding mode `Unnecessary` but the operation was inexact.
    #[error("rounding necessary: {0}")]
    RoundingRequired(String),

    /// A value did not fit the requested machine type.
    #[error("value does not fit in {0}")]
    ConversionOverflow(&'static str),
}
