//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A cancelled sale must give back EXACTLY what it added to the drawer.  │
//! │  With floats, sale + cancel can leave a residue of 0.0000001.          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every amount is an i64 of cents. Rounding happens once per line     │
//! │    (price × quantity) and the stored result is reused by compensation. │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::Money;
//! use till_core::quantity::Quantity;
//!
//! let price = Money::from_cents(1099); // $10.99
//!
//! let doubled = price * 2;                        // $21.98
//! let total = price + Money::from_cents(500);     // $15.99
//! let weighed = price.checked_mul_quantity(Quantity::from_milli(1_250)); // 1.25 kg
//! assert_eq!(weighed.map(|m| m.cents()), Some(1374));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::quantity::{Quantity, MILLI_PER_UNIT};
use crate::MAX_AMOUNT_CENTS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for balance deltas and
///   cash differences
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  Product.price_cents ──► SaleItem.unit_price ──► SaleItem.subtotal     │
/// │                                                                         │
/// │  Sale.total ──► Tender reconciliation ──► cash contribution            │
/// │                                               │                         │
/// │                                               ▼                         │
/// │                                  CashSession.expected_amount            │
/// │                                                                         │
/// │  EVERY monetary value in the engine flows through this type            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts, only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -$5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// The product is rounded half away from zero to the cent, once.
    /// `None` when the result falls outside `±MAX_AMOUNT_CENTS`.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    /// use till_core::quantity::Quantity;
    ///
    /// // 1.5 kg at $12.99/kg = $19.485 → $19.49
    /// let line = Money::from_cents(1299).checked_mul_quantity(Quantity::from_milli(1_500));
    /// assert_eq!(line, Some(Money::from_cents(1949)));
    /// ```
    ///
    /// ## User Workflow
    /// ```text
    /// Product: Rib eye $12.99/kg
    /// Scale: 1.500 kg
    ///      │
    ///      ▼
    /// checked_mul_quantity(1.500) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line Total: $19.49
    /// ```
    pub fn checked_mul_quantity(&self, qty: Quantity) -> Option<Money> {
        let raw = self.0 as i128 * qty.milli() as i128;
        let half = (MILLI_PER_UNIT / 2) as i128;
        let rounded = if raw >= 0 {
            (raw + half) / MILLI_PER_UNIT as i128
        } else {
            (raw - half) / MILLI_PER_UNIT as i128
        };
        i64::try_from(rounded).ok().and_then(Money::bounded)
    }

    /// Addition that stays within `±MAX_AMOUNT_CENTS`.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).and_then(Money::bounded)
    }

    /// Subtraction that stays within `±MAX_AMOUNT_CENTS`.
    #[inline]
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).and_then(Money::bounded)
    }

    fn bounded(cents: i64) -> Option<Money> {
        (cents.unsigned_abs() <= MAX_AMOUNT_CENTS as u64).then_some(Money(cents))
    }

    /// True when the two amounts differ by at most `tolerance`.
    #[inline]
    pub fn within(&self, other: Money, tolerance: Money) -> bool {
        (self.0 as i128 - other.0 as i128).abs() <= tolerance.0 as i128
    }
}

/// A computed amount (line, total, tender sum) left the accepted range.
pub(crate) fn amount_out_of_range(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: MAX_AMOUNT_CENTS,
    }
    .into()
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as `$12.34` for logs and error messages.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a whole count.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_mul_quantity_whole_units() {
        let price = Money::from_cents(1500);
        assert_eq!(price.checked_mul_quantity(Quantity::from_units(3)).map(|m| m.cents()), Some(4500));
    }

    #[test]
    fn test_mul_quantity_rounds_half_away_from_zero() {
        // 0.5 cent exactly → rounds up
        let price = Money::from_cents(1);
        assert_eq!(price.checked_mul_quantity(Quantity::from_milli(500)).map(|m| m.cents()), Some(1));
        // 0.499 cent → rounds down
        assert_eq!(price.checked_mul_quantity(Quantity::from_milli(499)).map(|m| m.cents()), Some(0));
        // negative side mirrors
        let neg = Money::from_cents(-1);
        assert_eq!(neg.checked_mul_quantity(Quantity::from_milli(500)).map(|m| m.cents()), Some(-1));
    }

    #[test]
    fn test_mul_quantity_weight() {
        // 0.750 kg at $18.90/kg = $14.175 → $14.18
        let price = Money::from_cents(1890);
        assert_eq!(price.checked_mul_quantity(Quantity::from_milli(750)).map(|m| m.cents()), Some(1418));
    }

    #[test]
    fn test_checked_arithmetic_stays_in_range() {
        let max = Money::from_cents(MAX_AMOUNT_CENTS);
        assert_eq!(max.checked_add(Money::zero()), Some(max));
        assert!(max.checked_add(Money::from_cents(1)).is_none());
        assert!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)).is_none());
        assert!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)).is_none());
        assert!(max
            .checked_mul_quantity(Quantity::from_milli(1_001))
            .is_none());
        assert!(Money::from_cents(i64::MAX)
            .checked_mul_quantity(Quantity::from_units(999))
            .is_none());
    }

    #[test]
    fn test_within_tolerance() {
        let total = Money::from_cents(27500);
        assert!(total.within(Money::from_cents(27501), Money::from_cents(1)));
        assert!(total.within(Money::from_cents(27499), Money::from_cents(1)));
        assert!(!total.within(Money::from_cents(27400), Money::from_cents(1)));
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-100).abs().cents(), 100);
    }
}
