//! # Line Pricing
//!
//! Pure pricing shared by sales and orders.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Line:   unit_price = override ?? product.effective_price()            │
//! │          gross      = round(unit_price × quantity)   (once, to cent)    │
//! │          subtotal   = gross - line discount                             │
//! │                                                                         │
//! │  Ticket: subtotal   = Σ line subtotals                                  │
//! │          total      = subtotal - ticket discount   (never negative)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stored line subtotal is the value every later total and every
//! compensation reads back; nothing is re-priced after the fact.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{amount_out_of_range, Money};
use crate::quantity::Quantity;
use crate::types::Product;

/// A priced line, ready to be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedLine {
    pub unit_price: Money,
    pub quantity: Quantity,
    pub discount: Money,
    pub subtotal: Money,
}

/// Ticket-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

/// Unit price for a line: the explicit override when given, otherwise the
/// product's effective (possibly promotional) price.
pub fn unit_price_for(product: &Product, override_cents: Option<i64>) -> Money {
    override_cents
        .map(Money::from_cents)
        .unwrap_or_else(|| product.effective_price())
}

/// Prices one line.
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::pricing::price_line;
/// use till_core::quantity::Quantity;
///
/// let line = price_line(Money::from_cents(1500), Quantity::from_units(3), Money::zero()).unwrap();
/// assert_eq!(line.subtotal.cents(), 4500);
/// ```
///
/// ## Errors
/// - `DiscountExceedsSubtotal` when the line discount is larger than the
///   line's gross amount
/// - `Validation` when the gross amount exceeds `MAX_AMOUNT_CENTS`
pub fn price_line(unit_price: Money, quantity: Quantity, discount: Money) -> CoreResult<PricedLine> {
    let gross = unit_price
        .checked_mul_quantity(quantity)
        .ok_or_else(|| amount_out_of_range("line_total"))?;
    if discount > gross {
        return Err(CoreError::DiscountExceedsSubtotal {
            subtotal: gross,
            discount,
        });
    }

    Ok(PricedLine {
        unit_price,
        quantity,
        discount,
        subtotal: gross - discount,
    })
}

/// Sums line subtotals and applies the ticket discount.
///
/// ## Errors
/// - `DiscountExceedsSubtotal` when the total would be negative
/// - `Validation` when the subtotal exceeds `MAX_AMOUNT_CENTS`
pub fn compute_totals<'a, I>(lines: I, discount: Money) -> CoreResult<Totals>
where
    I: IntoIterator<Item = &'a PricedLine>,
{
    let subtotal = lines
        .into_iter()
        .try_fold(Money::zero(), |acc, l| acc.checked_add(l.subtotal))
        .ok_or_else(|| amount_out_of_range("subtotal"))?;
    let total = subtotal
        .checked_sub(discount)
        .ok_or_else(|| amount_out_of_range("discount_cents"))?;

    if total.is_negative() {
        return Err(CoreError::DiscountExceedsSubtotal { subtotal, discount });
    }

    Ok(Totals {
        subtotal,
        discount,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleType;
    use chrono::Utc;

    fn chorizo() -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            sku: "CHZ-01".to_string(),
            name: "Chorizo".to_string(),
            description: None,
            sale_type: SaleType::Unit,
            unit: "pz".to_string(),
            price_cents: 1500,
            cost_cents: None,
            discount_price_cents: Some(1300),
            discount_active: true,
            stock_quantity_milli: 10_000,
            min_stock_milli: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_unit_price_prefers_override() {
        let p = chorizo();
        assert_eq!(unit_price_for(&p, Some(1000)).cents(), 1000);
        assert_eq!(unit_price_for(&p, None).cents(), 1300);
    }

    #[test]
    fn test_price_line_with_discount() {
        let line = price_line(
            Money::from_cents(1500),
            Quantity::from_units(3),
            Money::from_cents(500),
        )
        .unwrap();
        assert_eq!(line.subtotal.cents(), 4000);
    }

    #[test]
    fn test_price_line_weight_rounds_once() {
        // 0.333 kg at $10.00 = $3.33
        let line = price_line(Money::from_cents(1000), Quantity::from_milli(333), Money::zero())
            .unwrap();
        assert_eq!(line.subtotal.cents(), 333);
    }

    #[test]
    fn test_line_discount_larger_than_gross_rejected() {
        let err = price_line(Money::from_cents(100), Quantity::from_units(1), Money::from_cents(101))
            .unwrap_err();
        assert!(matches!(err, CoreError::DiscountExceedsSubtotal { .. }));
    }

    #[test]
    fn test_totals() {
        let a = price_line(Money::from_cents(1500), Quantity::from_units(3), Money::zero()).unwrap();
        let b = price_line(Money::from_cents(18900), Quantity::from_milli(1_250), Money::zero())
            .unwrap();
        let totals = compute_totals([&a, &b], Money::from_cents(625)).unwrap();
        assert_eq!(totals.subtotal.cents(), 4500 + 23625);
        assert_eq!(totals.total.cents(), 4500 + 23625 - 625);
    }

    #[test]
    fn test_negative_total_rejected() {
        let a = price_line(Money::from_cents(100), Quantity::from_units(1), Money::zero()).unwrap();
        let err = compute_totals([&a], Money::from_cents(101)).unwrap_err();
        assert!(matches!(err, CoreError::DiscountExceedsSubtotal { .. }));
        assert!(compute_totals([&a], Money::from_cents(100)).unwrap().total.is_zero());
    }

    #[test]
    fn test_oversized_amounts_are_validation_errors() {
        let err = price_line(Money::from_cents(i64::MAX), Quantity::from_units(2), Money::zero())
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);

        let big = price_line(
            Money::from_cents(crate::MAX_AMOUNT_CENTS),
            Quantity::from_units(1),
            Money::zero(),
        )
        .unwrap();
        let err = compute_totals([&big, &big], Money::zero()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
