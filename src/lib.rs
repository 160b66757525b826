//! # numtower
//!
//! An arbitrary-precision numeric tower: exact big integers, scaled
//! decimals with context-directed rounding control, rationals, and a
//! dispatch layer that performs arithmetic, comparison and bit operations
//! uniformly over seven runtime numeric variants with automatic
//! promotion and demotion.
//!
//! All values are immutable; arithmetic always builds new values, which
//! makes everything here trivially thread-safe.

pub mod bigint;
pub mod decimal;
pub mod error;
pub mod rational;
pub mod tower;

pub use bigint::{BigInt, Sign};
pub use decimal::{BigDecimal, Context, RoundingMode};
pub use error::{NumericError, NumericResult};
pub use rational::Rational;
pub use tower::Number;
