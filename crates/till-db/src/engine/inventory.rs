//! # Inventory Ledger
//!
//! Reserve and release stock for the lines of a sale or order, inside the
//! caller's transaction. Only UNIT lines move stock; WEIGHT lines pass
//! through untouched.
//!
//! Release uses the sale type frozen on the line, so a product whose
//! catalog entry changed since the sale is restored exactly as it was
//! deducted.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::engine::error::EngineResult;
use crate::repository::product;
use till_core::{CoreError, Quantity, StockLine};

/// Deducts every UNIT line. Fails with `InsufficientStock` on the first
/// line the stock cannot cover; the caller's transaction then rolls back
/// the lines already deducted.
pub(crate) async fn reserve<L: StockLine>(
    conn: &mut SqliteConnection,
    lines: &[L],
    now: DateTime<Utc>,
) -> EngineResult<()> {
    for line in lines.iter().filter(|l| l.sale_type().tracks_stock()) {
        let requested = line.quantity();

        if product::decrement_stock(&mut *conn, line.product_id(), requested.milli(), now).await? {
            debug!(product_id = %line.product_id(), milli = requested.milli(), "Stock reserved");
            continue;
        }

        let current = product::fetch_product(&mut *conn, line.product_id())
            .await?
            .ok_or_else(|| CoreError::not_found("Product", line.product_id()))?;

        warn!(
            product_id = %current.id,
            available_milli = current.stock_quantity_milli,
            requested_milli = requested.milli(),
            "Insufficient stock"
        );
        return Err(CoreError::InsufficientStock {
            available: current.stock(),
            requested,
            product: current.name,
        }
        .into());
    }

    Ok(())
}

/// Puts every UNIT line back.
pub(crate) async fn release<L: StockLine>(
    conn: &mut SqliteConnection,
    lines: &[L],
    now: DateTime<Utc>,
) -> EngineResult<()> {
    for line in lines.iter().filter(|l| l.sale_type().tracks_stock()) {
        let quantity: Quantity = line.quantity();
        if !product::increment_stock(&mut *conn, line.product_id(), quantity.milli(), now).await? {
            return Err(CoreError::not_found("Product", line.product_id()).into());
        }
        debug!(product_id = %line.product_id(), milli = quantity.milli(), "Stock released");
    }

    Ok(())
}
