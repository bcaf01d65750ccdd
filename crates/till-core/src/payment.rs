//! # Payment Reconciliation
//!
//! Turns what the customer handed over (a [`Tender`]) into what the sale
//! records (a [`Settlement`]).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Tender                      Rule                       Change         │
//! │  ─────────────────────────   ────────────────────────   ────────────   │
//! │  CASH { cash }               cash >= total              cash - total   │
//! │  CARD                        none (records total)       0              │
//! │  TRANSFER                    none (records total)       0              │
//! │  MIXED { cash, card, xfer }  |sum - total| <= 1 cent    0              │
//! │                                                                         │
//! │  Cash contribution to the drawer = cash - change (CASH / MIXED only)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{amount_out_of_range, Money};
use crate::types::PaymentMethod;
use crate::validation::validate_non_negative_cents;

/// Allowed difference between MIXED parts and the total.
pub const MIXED_TOLERANCE: Money = Money::from_cents(1);

// =============================================================================
// Tender
// =============================================================================

/// How the customer paid, as declared by the register.
///
/// Serialized with a `method` tag:
/// `{"method":"MIXED","cash_cents":10000,"transfer_cents":17500}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tender {
    Cash {
        cash_cents: i64,
    },
    Card,
    Transfer,
    Mixed {
        #[serde(default)]
        cash_cents: i64,
        #[serde(default)]
        card_cents: i64,
        #[serde(default)]
        transfer_cents: i64,
    },
}

impl Tender {
    pub fn method(&self) -> PaymentMethod {
        match self {
            Tender::Cash { .. } => PaymentMethod::Cash,
            Tender::Card => PaymentMethod::Card,
            Tender::Transfer => PaymentMethod::Transfer,
            Tender::Mixed { .. } => PaymentMethod::Mixed,
        }
    }

    /// Rejects negative or out-of-range declared amounts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let parts: &[(&str, i64)] = match self {
            Tender::Cash { cash_cents } => &[("cash_cents", *cash_cents)],
            Tender::Card | Tender::Transfer => &[],
            Tender::Mixed {
                cash_cents,
                card_cents,
                transfer_cents,
            } => &[
                ("cash_cents", *cash_cents),
                ("card_cents", *card_cents),
                ("transfer_cents", *transfer_cents),
            ],
        };
        for (field, value) in parts {
            validate_non_negative_cents(field, *value)?;
        }
        Ok(())
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// The amounts persisted on a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    pub method: PaymentMethod,
    pub cash: Money,
    pub card: Money,
    pub transfer: Money,
    pub change: Money,
}

impl Settlement {
    /// What the drawer gains: `cash - change` for CASH / MIXED, zero otherwise.
    pub fn cash_contribution(&self) -> Money {
        if self.method.handles_cash() {
            self.cash - self.change
        } else {
            Money::zero()
        }
    }
}

/// Reconciles a tender against the sale total.
///
/// ## Errors
/// - `InsufficientCash` when a CASH tender does not cover the total
/// - `PaymentMismatch` when MIXED parts miss the total by more than one cent
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::payment::{reconcile, Tender};
///
/// let s = reconcile(&Tender::Cash { cash_cents: 10000 }, Money::from_cents(4500)).unwrap();
/// assert_eq!(s.change.cents(), 5500);
/// assert_eq!(s.cash_contribution().cents(), 4500);
/// ```
pub fn reconcile(tender: &Tender, total: Money) -> CoreResult<Settlement> {
    let zero = Money::zero();
    let settlement = match *tender {
        Tender::Cash { cash_cents } => {
            let cash = Money::from_cents(cash_cents);
            if cash < total {
                return Err(CoreError::InsufficientCash {
                    required: total,
                    received: cash,
                });
            }
            Settlement {
                method: PaymentMethod::Cash,
                cash,
                card: zero,
                transfer: zero,
                change: cash - total,
            }
        }
        Tender::Card => Settlement {
            method: PaymentMethod::Card,
            cash: zero,
            card: total,
            transfer: zero,
            change: zero,
        },
        Tender::Transfer => Settlement {
            method: PaymentMethod::Transfer,
            cash: zero,
            card: zero,
            transfer: total,
            change: zero,
        },
        Tender::Mixed {
            cash_cents,
            card_cents,
            transfer_cents,
        } => {
            let cash = Money::from_cents(cash_cents);
            let card = Money::from_cents(card_cents);
            let transfer = Money::from_cents(transfer_cents);
            let paid = cash
                .checked_add(card)
                .and_then(|sum| sum.checked_add(transfer))
                .ok_or_else(|| amount_out_of_range("tender"))?;
            if !paid.within(total, MIXED_TOLERANCE) {
                return Err(CoreError::PaymentMismatch {
                    required: total,
                    paid,
                });
            }
            Settlement {
                method: PaymentMethod::Mixed,
                cash,
                card,
                transfer,
                change: zero,
            }
        }
    };
    Ok(settlement)
}
