//! # Compensation Workflow
//!
//! Reverses the side effects a sale or order applied, inside the caller's
//! transaction. Every reversal reads the amounts that were persisted when
//! the effect was applied (line quantities, `cash - change`), never
//! re-derives them from the current catalog.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  remove_session                                                        │
//! │     ├── remove_sale  × every sale of the session                       │
//! │     ├── delete cash_movements                                          │
//! │     └── delete cash_sessions row                                       │
//! │                                                                         │
//! │  remove_order                                                          │
//! │     ├── linked sale?      → remove_sale (missing sale is fine)         │
//! │     ├── stock_deducted?   → release order lines                        │
//! │     └── delete orders row (items cascade)                              │
//! │                                                                         │
//! │  remove_sale                                                           │
//! │     ├── COMPLETED?        → reverse_sale_effects                       │
//! │     ├── paid order?       → order back to READY, sale_id = NULL        │
//! │     └── delete sales row (items cascade)                               │
//! │                                                                         │
//! │  reverse_sale_effects   (also used by cancel)                          │
//! │     ├── release UNIT lines                                             │
//! │     └── expected_amount -= cash - change   (CASH / MIXED)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::engine::error::EngineResult;
use crate::engine::inventory;
use crate::repository::{order, sale, session};
use till_core::{CashSession, CoreError, Order, Sale, SaleItem, SaleStatus};

/// Undoes the inventory and drawer effects of a COMPLETED sale.
pub(crate) async fn reverse_sale_effects(
    conn: &mut SqliteConnection,
    sale: &Sale,
    items: &[SaleItem],
    now: DateTime<Utc>,
) -> EngineResult<()> {
    inventory::release(&mut *conn, items, now).await?;

    let contribution = sale.cash_contribution();
    if !contribution.is_zero() {
        if !session::apply_expected_delta(&mut *conn, &sale.session_id, -contribution.cents()).await? {
            return Err(CoreError::not_found("CashSession", &sale.session_id).into());
        }
        debug!(
            session_id = %sale.session_id,
            delta_cents = -contribution.cents(),
            "Expected amount reversed"
        );
    }

    Ok(())
}

/// Sends any order this sale paid back to READY.
pub(crate) async fn detach_paid_order(
    conn: &mut SqliteConnection,
    sale: &Sale,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let Some(order_id) = &sale.order_id else {
        return Ok(());
    };

    match order::fetch_order(&mut *conn, order_id).await? {
        Some(linked) if linked.sale_id.as_deref() == Some(sale.id.as_str()) => {
            order::detach_sale(&mut *conn, order_id, now).await?;
            info!(order_id = %order_id, sale_id = %sale.id, "Order detached from sale, back to READY");
        }
        _ => {}
    }

    Ok(())
}

/// Compensates (when COMPLETED) and deletes one sale.
pub(crate) async fn remove_sale(
    conn: &mut SqliteConnection,
    sale: &Sale,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    if sale.status == SaleStatus::Completed {
        let items = sale::fetch_items(&mut *conn, &sale.id).await?;
        reverse_sale_effects(&mut *conn, sale, &items, now).await?;
    }

    detach_paid_order(&mut *conn, sale, now).await?;
    sale::delete_sale(&mut *conn, &sale.id).await?;

    debug!(sale_id = %sale.id, status = ?sale.status, "Sale removed");
    Ok(())
}

/// Compensates and deletes one order.
pub(crate) async fn remove_order(
    conn: &mut SqliteConnection,
    target: &Order,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    if let Some(sale_id) = &target.sale_id {
        match sale::fetch_sale(&mut *conn, sale_id).await? {
            Some(linked) => remove_sale(&mut *conn, &linked, now).await?,
            None => debug!(order_id = %target.id, sale_id = %sale_id, "Linked sale already gone"),
        }
    } else if target.stock_deducted {
        let items = order::fetch_items(&mut *conn, &target.id).await?;
        inventory::release(&mut *conn, &items, now).await?;
    }

    // Cancelled sales keep pointing at the order they once paid.
    sale::clear_order_link(&mut *conn, &target.id, now).await?;
    order::delete_order(&mut *conn, &target.id).await?;

    debug!(order_id = %target.id, "Order removed");
    Ok(())
}

/// Compensates every sale of a session, then deletes movements and the
/// session itself.
pub(crate) async fn remove_session(
    conn: &mut SqliteConnection,
    target: &CashSession,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let sales = sale::fetch_for_session(&mut *conn, &target.id).await?;
    for s in &sales {
        remove_sale(&mut *conn, s, now).await?;
    }

    let movements = session::delete_movements(&mut *conn, &target.id).await?;
    session::delete_session(&mut *conn, &target.id).await?;

    debug!(
        session_id = %target.id,
        sales = sales.len(),
        movements,
        "Session removed"
    );
    Ok(())
}
