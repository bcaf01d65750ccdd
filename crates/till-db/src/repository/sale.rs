//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (one transaction, engine::sale)                             │
//! │     └── insert_sale() + insert_sale_item() × n → COMPLETED             │
//! │                                                                         │
//! │  2. (OPTIONAL) CANCEL                                                  │
//! │     └── mark_cancelled() → CANCELLED, notes += "CANCELLED: reason"     │
//! │                                                                         │
//! │  3. (OPTIONAL) DELETE (admin, engine::compensation)                    │
//! │     └── delete_sale() → items cascade                                  │
//! │                                                                         │
//! │  Rows are never edited otherwise: items are immutable snapshots.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use till_core::{Sale, SaleDetail, SaleItem};

const SALE_COLUMNS: &str = "id, session_id, cashier_id, customer_id, subtotal_cents, \
     discount_cents, total_cents, payment_method, cash_amount_cents, card_amount_cents, \
     transfer_amount_cents, change_cents, status, notes, order_id, created_at, updated_at";

const SALE_ITEM_COLUMNS: &str = "id, sale_id, product_id, product_name, product_sku, unit, \
     sale_type, unit_price_cents, quantity_milli, pieces, discount_cents, subtotal_cents, created_at";

/// Read access to sales.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        fetch_sale(&self.pool, id).await
    }

    /// Gets a sale together with its lines.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let Some(sale) = fetch_sale(&self.pool, id).await? else {
            return Ok(None);
        };
        let items = fetch_items(&self.pool, id).await?;

        Ok(Some(SaleDetail { sale, items }))
    }

    /// Sales of a session, oldest first.
    pub async fn list_for_session(&self, session_id: &str) -> DbResult<Vec<Sale>> {
        debug!(session_id = %session_id, "Listing sales");
        fetch_for_session(&self.pool, session_id).await
    }
}

// =============================================================================
// Transaction-scoped helpers
// =============================================================================

pub(crate) async fn fetch_sale<'e, E>(executor: E, id: &str) -> DbResult<Option<Sale>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(sale)
}

pub(crate) async fn fetch_items<'e, E>(executor: E, sale_id: &str) -> DbResult<Vec<SaleItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid");
    let items = sqlx::query_as::<_, SaleItem>(&sql)
        .bind(sale_id)
        .fetch_all(executor)
        .await?;

    Ok(items)
}

pub(crate) async fn fetch_for_session<'e, E>(executor: E, session_id: &str) -> DbResult<Vec<Sale>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE session_id = ?1 ORDER BY created_at, rowid"
    );
    let sales = sqlx::query_as::<_, Sale>(&sql)
        .bind(session_id)
        .fetch_all(executor)
        .await?;

    Ok(sales)
}

pub(crate) async fn insert_sale<'e, E>(executor: E, sale: &Sale) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, session_id, cashier_id, customer_id,
            subtotal_cents, discount_cents, total_cents,
            payment_method, cash_amount_cents, card_amount_cents, transfer_amount_cents, change_cents,
            status, notes, order_id, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7,
            ?8, ?9, ?10, ?11, ?12,
            ?13, ?14, ?15, ?16, ?17
        )
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.session_id)
    .bind(&sale.cashier_id)
    .bind(&sale.customer_id)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(sale.cash_amount_cents)
    .bind(sale.card_amount_cents)
    .bind(sale.transfer_amount_cents)
    .bind(sale.change_cents)
    .bind(sale.status)
    .bind(&sale.notes)
    .bind(&sale.order_id)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn insert_item<'e, E>(executor: E, item: &SaleItem) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, product_name, product_sku, unit, sale_type,
            unit_price_cents, quantity_milli, pieces, discount_cents, subtotal_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(&item.product_sku)
    .bind(&item.unit)
    .bind(item.sale_type)
    .bind(item.unit_price_cents)
    .bind(item.quantity_milli)
    .bind(item.pieces)
    .bind(item.discount_cents)
    .bind(item.subtotal_cents)
    .bind(item.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// COMPLETED → CANCELLED. Returns `false` if the sale was not COMPLETED.
pub(crate) async fn mark_cancelled<'e, E>(
    executor: E,
    id: &str,
    notes: &str,
    now: DateTime<Utc>,
) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE sales
        SET status = 'CANCELLED', notes = ?2, updated_at = ?3
        WHERE id = ?1 AND status = 'COMPLETED'
        "#,
    )
    .bind(id)
    .bind(notes)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Clears `sales.order_id` on every sale pointing at the order.
pub(crate) async fn clear_order_link<'e, E>(
    executor: E,
    order_id: &str,
    now: DateTime<Utc>,
) -> DbResult<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE sales SET order_id = NULL, updated_at = ?2 WHERE order_id = ?1")
        .bind(order_id)
        .bind(now)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Deletes the sale; its items go with it (ON DELETE CASCADE).
pub(crate) async fn delete_sale<'e, E>(executor: E, id: &str) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Helper to generate a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Helper to generate a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}
