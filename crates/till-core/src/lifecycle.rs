//! # Lifecycle Guards
//!
//! Pure state and authorization checks the engine runs inside each
//! transaction, after loading the rows it is about to change.
//!
//! ## Order State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   PENDING ──mark_ready──► READY ──mark_delivered──► DELIVERED           │
//! │      │                      │                          ▲                │
//! │      │                      │                          │                │
//! │      ├──────── pay via sale (PENDING or READY) ────────┘                │
//! │      │                      │                                           │
//! │      └────── cancel ────────┴──────────────► CANCELLED                  │
//! │                                                                         │
//! │   DELIVERED / CANCELLED are final: no update, no cancel.               │
//! │   Deleting a paid order's sale sends it back to READY.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Who May Do What
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────────┐
//! │ Operation                    │ Allowed                                  │
//! ├──────────────────────────────┼──────────────────────────────────────────┤
//! │ Open session                 │ any operator                             │
//! │ Close session / movement     │ owner, ADMIN, MANAGER                    │
//! │ Create sale                  │ owner, ADMIN, MANAGER                    │
//! │ Cancel sale                  │ ADMIN, MANAGER                           │
//! │ Delete session/sale/order    │ ADMIN                                    │
//! └──────────────────────────────┴──────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CashSession, Order, OrderStatus, Principal, Sale};

// =============================================================================
// Authorization
// =============================================================================

/// Session owner, or ADMIN / MANAGER.
pub fn authorize_session_access(
    session: &CashSession,
    principal: &Principal,
    action: &str,
) -> CoreResult<()> {
    if session.user_id == principal.user_id || principal.is_privileged() {
        return Ok(());
    }
    Err(CoreError::forbidden(format!(
        "only the session owner, an admin or a manager may {action}"
    )))
}

pub fn require_privileged(principal: &Principal, action: &str) -> CoreResult<()> {
    if principal.is_privileged() {
        return Ok(());
    }
    Err(CoreError::forbidden(format!(
        "only an admin or a manager may {action}"
    )))
}

pub fn require_admin(principal: &Principal, action: &str) -> CoreResult<()> {
    if principal.is_admin() {
        return Ok(());
    }
    Err(CoreError::forbidden(format!("only an admin may {action}")))
}

// =============================================================================
// Cash Session
// =============================================================================

pub fn ensure_session_open(session: &CashSession) -> CoreResult<()> {
    if session.is_open() {
        return Ok(());
    }
    Err(CoreError::SessionNotOpen {
        session_id: session.id.clone(),
    })
}

/// Deleting a session requires it to be CLOSED.
pub fn ensure_session_closed(session: &CashSession) -> CoreResult<()> {
    if session.is_open() {
        return Err(CoreError::SessionNotClosed {
            session_id: session.id.clone(),
        });
    }
    Ok(())
}

// =============================================================================
// Sale
// =============================================================================

pub fn ensure_sale_cancellable(sale: &Sale) -> CoreResult<()> {
    if sale.is_cancelled() {
        return Err(CoreError::SaleAlreadyCancelled {
            sale_id: sale.id.clone(),
        });
    }
    Ok(())
}

/// Appends the cancellation reason to whatever notes the sale already has.
///
/// ## Example
/// ```rust
/// use till_core::lifecycle::cancellation_notes;
///
/// assert_eq!(cancellation_notes(None, "wrong item"), "CANCELLED: wrong item");
/// assert_eq!(
///     cancellation_notes(Some("regular"), "wrong item"),
///     "regular\nCANCELLED: wrong item"
/// );
/// ```
pub fn cancellation_notes(existing: Option<&str>, reason: &str) -> String {
    match existing {
        Some(notes) if !notes.is_empty() => format!("{notes}\nCANCELLED: {reason}"),
        _ => format!("CANCELLED: {reason}"),
    }
}

// =============================================================================
// Order
// =============================================================================

/// Transitions the order state machine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    MarkReady,
    MarkDelivered,
    /// Paid (and delivered) by a sale.
    PayWithSale,
    Cancel,
    Update,
}

impl OrderAction {
    fn verb(self) -> &'static str {
        match self {
            OrderAction::MarkReady => "be marked ready",
            OrderAction::MarkDelivered => "be marked delivered",
            OrderAction::PayWithSale => "be paid by a sale",
            OrderAction::Cancel => "be cancelled",
            OrderAction::Update => "be modified",
        }
    }
}

/// Checks that `action` is legal from the order's current status and
/// returns the status the order moves to.
pub fn order_transition(order: &Order, action: OrderAction) -> CoreResult<OrderStatus> {
    use OrderStatus::*;

    let next = match (action, order.status) {
        (OrderAction::MarkReady, Pending) => Some(Ready),
        (OrderAction::MarkDelivered, Ready) => Some(Delivered),
        (OrderAction::PayWithSale, Pending | Ready) => Some(Delivered),
        (OrderAction::Cancel, Pending | Ready) => Some(Cancelled),
        (OrderAction::Update, Pending | Ready) => Some(order.status),
        _ => None,
    };

    next.ok_or_else(|| CoreError::InvalidOrderTransition {
        order_id: order.id.clone(),
        status: order.status,
        action: action.verb(),
    })
}

/// An order may be paid by at most one sale.
pub fn ensure_order_unpaid(order: &Order) -> CoreResult<()> {
    match &order.sale_id {
        Some(sale_id) => Err(CoreError::OrderAlreadyPaid {
            order_id: order.id.clone(),
            sale_id: sale_id.clone(),
        }),
        None => Ok(()),
    }
}

pub fn ensure_deposit_within_total(deposit: Money, total: Money) -> CoreResult<()> {
    if deposit > total {
        return Err(CoreError::DepositExceedsTotal { deposit, total });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, Role, SaleStatus, SessionStatus};
    use chrono::{NaiveDate, Utc};

    fn session(owner: &str, status: SessionStatus) -> CashSession {
        CashSession {
            id: "s1".to_string(),
            terminal_id: "T1".to_string(),
            user_id: owner.to_string(),
            status,
            opening_amount_cents: 50000,
            expected_amount_cents: 50000,
            closing_amount_cents: None,
            difference_cents: None,
            opening_notes: None,
            closing_notes: None,
            opened_at: Utc::now(),
            closed_at: None,
            closed_by: None,
        }
    }

    fn order(status: OrderStatus, sale_id: Option<&str>) -> Order {
        let now = Utc::now();
        Order {
            id: "o1".to_string(),
            order_number: "ORD2610170001".to_string(),
            customer_id: None,
            customer_name: "Ana".to_string(),
            customer_phone: None,
            customer_email: None,
            status,
            subtotal_cents: 10000,
            discount_cents: 0,
            total_cents: 10000,
            deposit_cents: 0,
            delivery_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            delivery_time: None,
            notes: None,
            internal_notes: None,
            created_by: "u1".to_string(),
            sale_id: sale_id.map(str::to_string),
            stock_deducted: false,
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_session_access() {
        let s = session("owner", SessionStatus::Open);
        assert!(authorize_session_access(&s, &Principal::new("owner", Role::Cashier), "close").is_ok());
        assert!(authorize_session_access(&s, &Principal::new("boss", Role::Manager), "close").is_ok());

        let err = authorize_session_access(&s, &Principal::new("other", Role::Cashier), "close")
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden { .. }));
    }

    #[test]
    fn test_role_requirements() {
        let manager = Principal::new("m", Role::Manager);
        assert!(require_privileged(&manager, "cancel a sale").is_ok());
        assert!(require_admin(&manager, "delete a sale").is_err());
        assert!(require_admin(&Principal::new("a", Role::Admin), "delete a sale").is_ok());
    }

    #[test]
    fn test_session_status_guards() {
        assert!(ensure_session_open(&session("u", SessionStatus::Open)).is_ok());
        assert!(ensure_session_open(&session("u", SessionStatus::Closed)).is_err());
        assert!(ensure_session_closed(&session("u", SessionStatus::Closed)).is_ok());
        assert!(ensure_session_closed(&session("u", SessionStatus::Open)).is_err());
    }

    #[test]
    fn test_sale_cancellable() {
        let now = Utc::now();
        let mut sale = Sale {
            id: "x".to_string(),
            session_id: "s1".to_string(),
            cashier_id: "u".to_string(),
            customer_id: None,
            subtotal_cents: 100,
            discount_cents: 0,
            total_cents: 100,
            payment_method: PaymentMethod::Card,
            cash_amount_cents: 0,
            card_amount_cents: 100,
            transfer_amount_cents: 0,
            change_cents: 0,
            status: SaleStatus::Completed,
            notes: None,
            order_id: None,
            created_at: now,
            updated_at: now,
        };
        assert!(ensure_sale_cancellable(&sale).is_ok());
        sale.status = SaleStatus::Cancelled;
        assert!(matches!(
            ensure_sale_cancellable(&sale),
            Err(CoreError::SaleAlreadyCancelled { .. })
        ));
    }

    #[test]
    fn test_order_state_machine() {
        use OrderStatus::*;

        assert_eq!(order_transition(&order(Pending, None), OrderAction::MarkReady).unwrap(), Ready);
        assert!(order_transition(&order(Ready, None), OrderAction::MarkReady).is_err());

        assert_eq!(
            order_transition(&order(Ready, None), OrderAction::MarkDelivered).unwrap(),
            Delivered
        );
        assert!(order_transition(&order(Pending, None), OrderAction::MarkDelivered).is_err());

        assert_eq!(
            order_transition(&order(Pending, None), OrderAction::PayWithSale).unwrap(),
            Delivered
        );
        assert!(order_transition(&order(Cancelled, None), OrderAction::PayWithSale).is_err());

        assert_eq!(order_transition(&order(Ready, None), OrderAction::Cancel).unwrap(), Cancelled);
        assert!(order_transition(&order(Delivered, None), OrderAction::Cancel).is_err());
        assert!(order_transition(&order(Cancelled, None), OrderAction::Cancel).is_err());

        assert_eq!(order_transition(&order(Pending, None), OrderAction::Update).unwrap(), Pending);
        assert!(order_transition(&order(Delivered, None), OrderAction::Update).is_err());
    }

    #[test]
    fn test_transition_error_message() {
        let err = order_transition(&order(OrderStatus::Delivered, None), OrderAction::Cancel)
            .unwrap_err();
        assert_eq!(err.to_string(), "Order o1 is DELIVERED, cannot be cancelled");
    }

    #[test]
    fn test_order_paid_and_deposit() {
        assert!(ensure_order_unpaid(&order(OrderStatus::Ready, None)).is_ok());
        assert!(ensure_order_unpaid(&order(OrderStatus::Ready, Some("sale"))).is_err());

        assert!(ensure_deposit_within_total(Money::from_cents(100), Money::from_cents(100)).is_ok());
        assert!(ensure_deposit_within_total(Money::from_cents(101), Money::from_cents(100)).is_err());
    }
}
