//! Lossless decimal numeric type backed by rust_decimal.
//!
//! Every monetary quantity in the engine is a [`Decimal`]. Division and
//! square roots have checked variants so callers can guard the
//! zero-divisor cases explicitly instead of panicking.

use rust_decimal::prelude::MathematicalOps;
use rust_decimal::Decimal as RustDecimal;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lossless decimal numeric type for financial calculations.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to JSON number (not string) by default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Largest representable value.
    pub const MAX: Decimal = Decimal(RustDecimal::MAX);

    /// Create a Decimal from a RustDecimal.
    pub const fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Get the underlying RustDecimal.
    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub const fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// The multiplicative identity (1).
    pub const fn one() -> Self {
        Decimal(RustDecimal::ONE)
    }

    /// Returns the value 100.
    pub const fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    pub fn checked_add(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    pub fn checked_sub(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_sub(rhs.0).map(Decimal)
    }

    /// Division that yields `None` for a zero divisor or on overflow.
    pub fn checked_div(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }

    pub fn checked_mul(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }

    /// Square root; `None` for negative input.
    pub fn sqrt(&self) -> Option<Decimal> {
        self.0.sqrt().map(Decimal)
    }

    /// `e^self`; `None` on overflow.
    pub fn checked_exp(&self) -> Option<Decimal> {
        self.0.checked_exp().map(Decimal)
    }

    /// `self^exp` for an integer exponent; `None` on overflow.
    pub fn checked_powi(&self, exp: i64) -> Option<Decimal> {
        let magnitude = self.0.checked_powu(exp.unsigned_abs())?;
        if exp >= 0 {
            Some(Decimal(magnitude))
        } else {
            RustDecimal::ONE.checked_div(magnitude).map(Decimal)
        }
    }

    /// Round to `dp` decimal places, midpoints away from zero.
    pub fn round_dp(&self, dp: u32) -> Decimal {
        Decimal(
            self.0
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    pub fn min(self, other: Decimal) -> Decimal {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Decimal) -> Decimal {
        if self >= other {
            self
        } else {
            other
        }
    }

    /// Negative values collapse to zero.
    pub fn clamp_non_negative(self) -> Decimal {
        self.max(Decimal::zero())
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

// Arithmetic operations
impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

/// Panics on a zero divisor; use [`Decimal::checked_div`] where the divisor
/// may be zero.
impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Decimal {
    fn sub_assign(&mut self, rhs: Decimal) {
        self.0 -= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_decimal_canonical_no_exponent() {
        let decimal = d("123.4500");
        let formatted = decimal.to_canonical_string();
        assert!(!formatted.contains('e'));
        assert_eq!(formatted, "123.45");
    }

    #[test]
    fn test_decimal_arithmetic() {
        let a = d("10.5");
        let b = d("2.5");

        assert_eq!((a + b).to_canonical_string(), "13");
        assert_eq!((a - b).to_canonical_string(), "8");
        assert_eq!((a * b).to_canonical_string(), "26.25");
        assert_eq!((a / b).to_canonical_string(), "4.2");
    }

    #[test]
    fn test_checked_div_zero_divisor() {
        assert_eq!(d("1").checked_div(Decimal::zero()), None);
        assert_eq!(d("1").checked_div(d("4")), Some(d("0.25")));
    }

    #[test]
    fn test_checked_ops_report_overflow() {
        assert_eq!(Decimal::MAX.checked_mul(d("2")), None);
        assert_eq!(Decimal::MAX.checked_add(d("1")), None);
        assert_eq!((-Decimal::MAX).checked_sub(d("1")), None);
        assert_eq!(d("1").checked_div(d("0.0000000000000000000000000001")), Some(d("10000000000000000000000000000")));
        assert_eq!(d("10").checked_div(d("0.0000000000000000000000000001")), None);
        assert_eq!(d("2").checked_add(d("3")), Some(d("5")));
    }

    #[test]
    fn test_sqrt() {
        let root = d("4").sqrt().unwrap();
        assert!((root - d("2")).abs() < d("0.000000001"));
        assert_eq!(d("-1").sqrt(), None);
    }

    #[test]
    fn test_round_dp_half_up() {
        assert_eq!(d("1499.95").round_dp(1), d("1500.0"));
        assert_eq!(d("12.34").round_dp(1), d("12.3"));
        assert_eq!(d("-0.05").round_dp(1), d("-0.1"));
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(d("-3").clamp_non_negative(), Decimal::zero());
        assert_eq!(d("3").clamp_non_negative(), d("3"));
    }

    #[test]
    fn test_decimal_json_serialization() {
        let decimal = d("123.456");
        let json = serde_json::to_value(decimal).unwrap();
        assert!(json.is_number());
        assert_eq!(json.to_string(), "123.456");
    }

    #[test]
    fn test_sign_predicates() {
        assert!(d("0.1").is_positive());
        assert!(d("-0.1").is_negative());
        assert!(!Decimal::zero().is_positive());
        assert!(!Decimal::zero().is_negative());
    }
}
