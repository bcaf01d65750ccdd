//! # Order Repository
//!
//! Advance / pickup orders and their lines.
//!
//! Order numbers are `ORD` + `yymmdd` + a four digit daily sequence
//! (`ORD2610170003`). The next number is derived from the highest number
//! already issued for the day, inside the creating transaction; the UNIQUE
//! index on `order_number` rejects a duplicate from a racing writer.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use till_core::{Order, OrderDetail, OrderFilter, OrderItem};

const ORDER_COLUMNS: &str = "id, order_number, customer_id, customer_name, customer_phone, \
     customer_email, status, subtotal_cents, discount_cents, total_cents, deposit_cents, \
     delivery_date, delivery_time, notes, internal_notes, created_by, sale_id, stock_deducted, \
     delivered_at, cancelled_at, cancellation_reason, created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, product_sku, unit, \
     sale_type, unit_price_cents, quantity_milli, pieces, discount_cents, subtotal_cents, notes";

const ORDER_NUMBER_PREFIX: &str = "ORD";

/// Read access to orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        fetch_order(&self.pool, id).await
    }

    /// Gets an order together with its lines.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<OrderDetail>> {
        let Some(order) = fetch_order(&self.pool, id).await? else {
            return Ok(None);
        };
        let items = fetch_items(&self.pool, id).await?;

        Ok(Some(OrderDetail { order, items }))
    }

    /// Orders by delivery date, optionally restricted to one status.
    pub async fn list(&self, filter: &OrderFilter) -> DbResult<Vec<Order>> {
        debug!(status = ?filter.status, "Listing orders");

        let orders = match filter.status {
            Some(status) => {
                let sql = format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ?1 \
                     ORDER BY delivery_date, delivery_time, order_number"
                );
                sqlx::query_as::<_, Order>(&sql)
                    .bind(status)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {ORDER_COLUMNS} FROM orders \
                     ORDER BY delivery_date, delivery_time, order_number"
                );
                sqlx::query_as::<_, Order>(&sql).fetch_all(&self.pool).await?
            }
        };

        Ok(orders)
    }
}

// =============================================================================
// Transaction-scoped helpers
// =============================================================================

pub(crate) async fn fetch_order<'e, E>(executor: E, id: &str) -> DbResult<Option<Order>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(order)
}

pub(crate) async fn fetch_items<'e, E>(executor: E, order_id: &str) -> DbResult<Vec<OrderItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql =
        format!("SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY rowid");
    let items = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(executor)
        .await?;

    Ok(items)
}

/// Next free order number for `day`.
///
/// The sequence is zero-padded to four digits but may grow past 9999, so
/// the highest number is the longest one first.
pub(crate) async fn next_order_number<'e, E>(executor: E, day: NaiveDate) -> DbResult<String>
where
    E: Executor<'e, Database = Sqlite>,
{
    let prefix = order_number_prefix(day);

    let last: Option<String> = sqlx::query_scalar(
        "SELECT order_number FROM orders WHERE order_number LIKE ?1 \
         ORDER BY length(order_number) DESC, order_number DESC LIMIT 1",
    )
    .bind(format!("{prefix}%"))
    .fetch_optional(executor)
    .await?;

    Ok(following_order_number(&prefix, last.as_deref()))
}

pub(crate) fn order_number_prefix(day: NaiveDate) -> String {
    format!("{ORDER_NUMBER_PREFIX}{}", day.format("%y%m%d"))
}

fn following_order_number(prefix: &str, last: Option<&str>) -> String {
    let sequence = last
        .and_then(|n| n.strip_prefix(prefix))
        .and_then(|s| s.parse::<u32>().ok())
        .map_or(1, |s| s + 1);

    format!("{prefix}{sequence:04}")
}

pub(crate) async fn insert_order<'e, E>(executor: E, order: &Order) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_number, customer_id, customer_name, customer_phone, customer_email,
            status, subtotal_cents, discount_cents, total_cents, deposit_cents,
            delivery_date, delivery_time, notes, internal_notes, created_by,
            sale_id, stock_deducted, delivered_at, cancelled_at, cancellation_reason,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15, ?16,
            ?17, ?18, ?19, ?20, ?21,
            ?22, ?23
        )
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.customer_id)
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(&order.customer_email)
    .bind(order.status)
    .bind(order.subtotal_cents)
    .bind(order.discount_cents)
    .bind(order.total_cents)
    .bind(order.deposit_cents)
    .bind(order.delivery_date)
    .bind(&order.delivery_time)
    .bind(&order.notes)
    .bind(&order.internal_notes)
    .bind(&order.created_by)
    .bind(&order.sale_id)
    .bind(order.stock_deducted)
    .bind(order.delivered_at)
    .bind(order.cancelled_at)
    .bind(&order.cancellation_reason)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Writes every mutable column of an existing order.
pub(crate) async fn save_order<'e, E>(executor: E, order: &Order) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE orders SET
            customer_id = ?2,
            customer_name = ?3,
            customer_phone = ?4,
            customer_email = ?5,
            status = ?6,
            subtotal_cents = ?7,
            discount_cents = ?8,
            total_cents = ?9,
            deposit_cents = ?10,
            delivery_date = ?11,
            delivery_time = ?12,
            notes = ?13,
            internal_notes = ?14,
            sale_id = ?15,
            stock_deducted = ?16,
            delivered_at = ?17,
            cancelled_at = ?18,
            cancellation_reason = ?19,
            updated_at = ?20
        WHERE id = ?1
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer_id)
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(&order.customer_email)
    .bind(order.status)
    .bind(order.subtotal_cents)
    .bind(order.discount_cents)
    .bind(order.total_cents)
    .bind(order.deposit_cents)
    .bind(order.delivery_date)
    .bind(&order.delivery_time)
    .bind(&order.notes)
    .bind(&order.internal_notes)
    .bind(&order.sale_id)
    .bind(order.stock_deducted)
    .bind(order.delivered_at)
    .bind(order.cancelled_at)
    .bind(&order.cancellation_reason)
    .bind(order.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn insert_item<'e, E>(executor: E, item: &OrderItem) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_id, product_name, product_sku, unit, sale_type,
            unit_price_cents, quantity_milli, pieces, discount_cents, subtotal_cents, notes
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
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
    .bind(&item.notes)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn delete_items<'e, E>(executor: E, order_id: &str) -> DbResult<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
        .bind(order_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Sends a sale-paid order back to READY with no sale.
pub(crate) async fn detach_sale<'e, E>(executor: E, id: &str, now: DateTime<Utc>) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET sale_id = NULL, status = 'READY', delivered_at = NULL, updated_at = ?2
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Deletes the order; its items go with it (ON DELETE CASCADE).
pub(crate) async fn delete_order<'e, E>(executor: E, id: &str) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub fn generate_order_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn generate_order_item_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_sequence() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let prefix = order_number_prefix(day);
        assert_eq!(prefix, "ORD261017");

        assert_eq!(following_order_number(&prefix, None), "ORD2610170001");
        assert_eq!(
            following_order_number(&prefix, Some("ORD2610170041")),
            "ORD2610170042"
        );
        // Unparseable tail restarts the day
        assert_eq!(
            following_order_number(&prefix, Some("ORD261017XX")),
            "ORD2610170001"
        );
    }

    #[tokio::test]
    async fn test_sequence_continues_past_four_digits() {
        use crate::test_support::{cashier, seed_product, test_db};
        use chrono::Utc;
        use till_core::{CreateOrderRequest, CustomerInfo, OrderLineRequest, SaleType};

        let db = test_db().await;
        let cake = seed_product(&db, "CAKE", SaleType::Unit, 30000, 5).await;
        let request = CreateOrderRequest {
            customer: CustomerInfo {
                customer_id: None,
                name: "Lucia".to_string(),
                phone: None,
                email: None,
            },
            items: vec![OrderLineRequest {
                product_id: cake.id.clone(),
                quantity_milli: 1000,
                discount_cents: 0,
                pieces: None,
                notes: None,
            }],
            discount_cents: 0,
            deposit_cents: 0,
            delivery_date: Utc::now().date_naive(),
            delivery_time: None,
            notes: None,
            internal_notes: None,
        };
        let day = Utc::now().date_naive();
        let prefix = order_number_prefix(day);

        let first = db.orders().create(&cashier("ana"), &request).await.unwrap().order;
        sqlx::query("UPDATE orders SET order_number = ?1 WHERE id = ?2")
            .bind(format!("{prefix}9999"))
            .bind(&first.id)
            .execute(db.pool())
            .await
            .unwrap();

        let second = db.orders().create(&cashier("ana"), &request).await.unwrap().order;
        assert_eq!(second.order_number, format!("{prefix}10000"));

        let next = next_order_number(db.pool(), day).await.unwrap();
        assert_eq!(next, format!("{prefix}10001"));
    }
}
