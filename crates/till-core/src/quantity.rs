//! # Quantity Module
//!
//! Fixed-point quantities in thousandths.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One type for counted and weighed goods                                 │
//! │                                                                         │
//! │  UNIT product:   3 pieces      → Quantity(3_000)                       │
//! │  WEIGHT product: 1.250 kg      → Quantity(1_250)                       │
//! │                                                                         │
//! │  Stock, sale lines and order lines all store `*_milli` integers, so    │
//! │  restoring stock is exact integer arithmetic.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

/// Thousandths per whole unit (or per kilogram).
pub const MILLI_PER_UNIT: i64 = 1_000;

/// A quantity in thousandths of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * MILLI_PER_UNIT)
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    /// Raw thousandths, as persisted in `*_milli` columns.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    /// Whole units, truncated toward zero.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / MILLI_PER_UNIT
    }

    /// True when the quantity has no fractional part (required for UNIT lines).
    #[inline]
    pub const fn is_whole(&self) -> bool {
        self.0 % MILLI_PER_UNIT == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

/// Whole quantities print as integers (`7`), fractional ones with three
/// decimals (`1.250`).
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_whole() {
            write!(f, "{}", self.units())
        } else {
            let sign = if self.0 < 0 { "-" } else { "" };
            write!(
                f,
                "{}{}.{:03}",
                sign,
                (self.0 / MILLI_PER_UNIT).abs(),
                (self.0 % MILLI_PER_UNIT).abs()
            )
        }
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_and_milli() {
        let q = Quantity::from_units(3);
        assert_eq!(q.milli(), 3_000);
        assert_eq!(q.units(), 3);
        assert!(q.is_whole());

        let w = Quantity::from_milli(1_250);
        assert_eq!(w.units(), 1);
        assert!(!w.is_whole());
    }

    #[test]
    fn test_display() {
        assert_eq!(Quantity::from_units(7).to_string(), "7");
        assert_eq!(Quantity::from_milli(1_250).to_string(), "1.250");
        assert_eq!(Quantity::from_milli(5).to_string(), "0.005");
        assert_eq!(Quantity::from_milli(-1_500).to_string(), "-1.500");
    }

    #[test]
    fn test_arithmetic() {
        let mut q = Quantity::from_units(10);
        q += Quantity::from_units(2);
        assert_eq!((q - Quantity::from_units(5)).units(), 7);
        assert_eq!((q + Quantity::from_milli(500)).milli(), 12_500);
    }
}
