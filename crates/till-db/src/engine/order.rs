//! # Order Lifecycle
//!
//! Advance / pickup orders: create, edit while open, move through the
//! state machine, and the administrative delete.
//!
//! ## Stock Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create / update      no stock movement                                │
//! │  paid by a sale       the sale deducts its own lines                   │
//! │  mark_delivered       deducts the order lines, sets stock_deducted     │
//! │  delete               restores exactly what the sale / flag recorded   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::engine::compensation;
use crate::engine::error::EngineResult;
use crate::engine::inventory;
use crate::error::{DbError, DbResult};
use crate::repository::order::{
    self as order_rows, generate_order_id, generate_order_item_id, OrderRepository,
};
use crate::repository::product;
use till_core::lifecycle::{ensure_deposit_within_total, order_transition, require_admin, OrderAction};
use till_core::pricing::{compute_totals, price_line, unit_price_for, PricedLine, Totals};
use till_core::{
    CancelOrderRequest, CoreError, CreateOrderRequest, Money, Order, OrderDetail, OrderFilter,
    OrderItem, OrderLineRequest, OrderStatus, Principal, Quantity, UpdateOrderRequest,
    ValidationError,
};

/// Order operations. Obtained from [`crate::Database::orders`].
#[derive(Debug, Clone)]
pub struct OrderService {
    pool: SqlitePool,
}

impl OrderService {
    pub fn new(pool: SqlitePool) -> Self {
        OrderService { pool }
    }

    fn repo(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Creates a PENDING order priced from the catalog.
    pub async fn create(
        &self,
        principal: &Principal,
        request: &CreateOrderRequest,
    ) -> EngineResult<OrderDetail> {
        request.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let now = Utc::now();
        let order_id = generate_order_id();

        let (items, totals) = price_order_lines(
            &mut *tx,
            &order_id,
            &request.items,
            Money::from_cents(request.discount_cents),
        )
        .await?;
        let deposit = Money::from_cents(request.deposit_cents);
        ensure_deposit_within_total(deposit, totals.total)?;

        let order_number = order_rows::next_order_number(&mut *tx, now.date_naive()).await?;

        let order = Order {
            id: order_id,
            order_number,
            customer_id: request.customer.customer_id.clone(),
            customer_name: request.customer.name.trim().to_string(),
            customer_phone: request.customer.phone.clone(),
            customer_email: request.customer.email.clone(),
            status: OrderStatus::Pending,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            total_cents: totals.total.cents(),
            deposit_cents: deposit.cents(),
            delivery_date: request.delivery_date,
            delivery_time: request.delivery_time.clone(),
            notes: request.notes.clone(),
            internal_notes: request.internal_notes.clone(),
            created_by: principal.user_id.clone(),
            sale_id: None,
            stock_deducted: false,
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        order_rows::insert_order(&mut *tx, &order).await?;
        for item in &items {
            order_rows::insert_item(&mut *tx, item).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %totals.total,
            deposit = %deposit,
            created_by = %principal.user_id,
            "Order created"
        );
        Ok(OrderDetail { order, items })
    }

    /// Edits a PENDING or READY order. A given item list replaces every line;
    /// totals are recomputed either way and the deposit rule re-checked.
    pub async fn update(
        &self,
        order_id: &str,
        principal: &Principal,
        request: &UpdateOrderRequest,
    ) -> EngineResult<OrderDetail> {
        request.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let now = Utc::now();

        let mut order = load_order(&mut *tx, order_id).await?;
        order_transition(&order, OrderAction::Update)?;

        if let Some(customer) = &request.customer {
            order.customer_id = customer.customer_id.clone();
            order.customer_name = customer.name.trim().to_string();
            order.customer_phone = customer.phone.clone();
            order.customer_email = customer.email.clone();
        }
        if let Some(date) = request.delivery_date {
            order.delivery_date = date;
        }
        if let Some(time) = &request.delivery_time {
            order.delivery_time = Some(time.clone());
        }
        if let Some(notes) = &request.notes {
            order.notes = Some(notes.clone());
        }
        if let Some(notes) = &request.internal_notes {
            order.internal_notes = Some(notes.clone());
        }

        let discount = Money::from_cents(request.discount_cents.unwrap_or(order.discount_cents));

        let (items, totals) = match &request.items {
            Some(lines) => {
                order_rows::delete_items(&mut *tx, order_id).await?;
                let (items, totals) = price_order_lines(&mut *tx, order_id, lines, discount).await?;
                for item in &items {
                    order_rows::insert_item(&mut *tx, item).await?;
                }
                (items, totals)
            }
            None => {
                let items = order_rows::fetch_items(&mut *tx, order_id).await?;
                let priced: Vec<PricedLine> = items.iter().map(priced_from_item).collect();
                let totals = compute_totals(&priced, discount)?;
                (items, totals)
            }
        };

        let deposit = Money::from_cents(request.deposit_cents.unwrap_or(order.deposit_cents));
        ensure_deposit_within_total(deposit, totals.total)?;

        order.subtotal_cents = totals.subtotal.cents();
        order.discount_cents = totals.discount.cents();
        order.total_cents = totals.total.cents();
        order.deposit_cents = deposit.cents();
        order.updated_at = now;
        order_rows::save_order(&mut *tx, &order).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order.id,
            total = %totals.total,
            lines_replaced = request.items.is_some(),
            updated_by = %principal.user_id,
            "Order updated"
        );
        Ok(OrderDetail { order, items })
    }

    /// PENDING → READY.
    pub async fn mark_ready(&self, order_id: &str, principal: &Principal) -> EngineResult<Order> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let mut order = load_order(&mut *tx, order_id).await?;
        order.status = order_transition(&order, OrderAction::MarkReady)?;
        order.updated_at = Utc::now();
        order_rows::save_order(&mut *tx, &order).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(order_id = %order_id, by = %principal.user_id, "Order ready");
        Ok(order)
    }

    /// READY → DELIVERED without a sale. The order lines are deducted from
    /// stock here and `stock_deducted` records it.
    pub async fn mark_delivered(&self, order_id: &str, principal: &Principal) -> EngineResult<Order> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let now = Utc::now();

        let mut order = load_order(&mut *tx, order_id).await?;
        let next = order_transition(&order, OrderAction::MarkDelivered)?;

        if order.sale_id.is_none() && !order.stock_deducted {
            let items = order_rows::fetch_items(&mut *tx, order_id).await?;
            inventory::reserve(&mut *tx, &items, now).await?;
            order.stock_deducted = true;
        }

        order.status = next;
        order.delivered_at = Some(now);
        order.updated_at = now;
        order_rows::save_order(&mut *tx, &order).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order_id,
            stock_deducted = order.stock_deducted,
            by = %principal.user_id,
            "Order delivered"
        );
        Ok(order)
    }

    /// PENDING / READY → CANCELLED.
    pub async fn cancel(
        &self,
        order_id: &str,
        principal: &Principal,
        request: &CancelOrderRequest,
    ) -> EngineResult<Order> {
        request.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let now = Utc::now();

        let mut order = load_order(&mut *tx, order_id).await?;
        order.status = order_transition(&order, OrderAction::Cancel)?;
        order.cancelled_at = Some(now);
        order.cancellation_reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        order.updated_at = now;
        order_rows::save_order(&mut *tx, &order).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(order_id = %order_id, by = %principal.user_id, "Order cancelled");
        Ok(order)
    }

    /// Hard-deletes an order (ADMIN), compensating whatever it applied.
    pub async fn delete(&self, order_id: &str, principal: &Principal) -> EngineResult<()> {
        require_admin(principal, "delete orders")?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let order = load_order(&mut *tx, order_id).await?;
        compensation::remove_order(&mut *tx, &order, Utc::now()).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order_id,
            order_number = %order.order_number,
            deleted_by = %principal.user_id,
            "Order deleted"
        );
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// An order with its lines.
    pub async fn get(&self, order_id: &str) -> DbResult<Option<OrderDetail>> {
        self.repo().get_detail(order_id).await
    }

    pub async fn list(&self, filter: &OrderFilter) -> DbResult<Vec<Order>> {
        self.repo().list(filter).await
    }
}

async fn load_order(conn: &mut SqliteConnection, order_id: &str) -> EngineResult<Order> {
    order_rows::fetch_order(conn, order_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Order", order_id).into())
}

/// Prices order lines at the catalog's effective price and snapshots the
/// product into each line.
async fn price_order_lines(
    conn: &mut SqliteConnection,
    order_id: &str,
    lines: &[OrderLineRequest],
    discount: Money,
) -> EngineResult<(Vec<OrderItem>, Totals)> {
    let mut priced = Vec::with_capacity(lines.len());
    let mut items = Vec::with_capacity(lines.len());

    for line in lines {
        let item = product::fetch_product(&mut *conn, &line.product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", &line.product_id))?;

        if !item.is_active {
            return Err(CoreError::ProductInactive { name: item.name }.into());
        }

        let quantity = Quantity::from_milli(line.quantity_milli);
        if item.sale_type.tracks_stock() && !quantity.is_whole() {
            return Err(ValidationError::InvalidFormat {
                field: "quantity_milli".to_string(),
                reason: format!("{} is sold by the piece", item.name),
            }
            .into());
        }

        let line_price = price_line(
            unit_price_for(&item, None),
            quantity,
            Money::from_cents(line.discount_cents),
        )?;

        items.push(OrderItem {
            id: generate_order_item_id(),
            order_id: order_id.to_string(),
            product_id: item.id,
            product_name: item.name,
            product_sku: item.sku,
            unit: item.unit,
            sale_type: item.sale_type,
            unit_price_cents: line_price.unit_price.cents(),
            quantity_milli: quantity.milli(),
            pieces: line.pieces,
            discount_cents: line_price.discount.cents(),
            subtotal_cents: line_price.subtotal.cents(),
            notes: line.notes.clone(),
        });
        priced.push(line_price);
    }

    let totals = compute_totals(&priced, discount)?;
    debug!(lines = items.len(), total = %totals.total, "Order lines priced");
    Ok((items, totals))
}

fn priced_from_item(item: &OrderItem) -> PricedLine {
    PricedLine {
        unit_price: Money::from_cents(item.unit_price_cents),
        quantity: Quantity::from_milli(item.quantity_milli),
        discount: Money::from_cents(item.discount_cents),
        subtotal: Money::from_cents(item.subtotal_cents),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::test_support::{
        admin, cashier, line, manager, open_session, sale_request, seed_product, sell,
        stock_milli, test_db,
    };
    use crate::Database;
    use till_core::{CustomerInfo, ErrorKind, Product, SaleType, Tender};

    fn order_line(product: &Product, quantity_milli: i64) -> OrderLineRequest {
        OrderLineRequest {
            product_id: product.id.clone(),
            quantity_milli,
            discount_cents: 0,
            pieces: None,
            notes: None,
        }
    }

    fn order_request(items: Vec<OrderLineRequest>, deposit_cents: i64) -> CreateOrderRequest {
        CreateOrderRequest {
            customer: CustomerInfo {
                customer_id: None,
                name: "  Lucia Perez ".to_string(),
                phone: None,
                email: None,
            },
            items,
            discount_cents: 0,
            deposit_cents,
            delivery_date: Utc::now().date_naive(),
            delivery_time: Some("14:30".to_string()),
            notes: None,
            internal_notes: None,
        }
    }

    async fn place(db: &Database, request: &CreateOrderRequest) -> OrderDetail {
        db.orders().create(&cashier("ana"), request).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_prices_from_catalog() {
        let db = test_db().await;
        let cake = seed_product(&db, "CAKE", SaleType::Unit, 30000, 5).await;
        let cheese = seed_product(&db, "CHEESE", SaleType::Weight, 18000, 0).await;

        let detail = place(
            &db,
            &order_request(vec![order_line(&cake, 2000), order_line(&cheese, 500)], 20000),
        )
        .await;

        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.order.customer_name, "Lucia Perez");
        assert_eq!(detail.order.total_cents, 69000);
        assert_eq!(detail.order.deposit_cents, 20000);
        assert!(!detail.order.stock_deducted);
        assert_eq!(detail.items.len(), 2);

        // Orders do not touch stock until delivery.
        assert_eq!(stock_milli(&db, &cake).await, 5000);
    }

    #[tokio::test]
    async fn test_order_numbers_are_sequential_per_day() {
        let db = test_db().await;
        let cake = seed_product(&db, "CAKE", SaleType::Unit, 30000, 5).await;

        let first = place(&db, &order_request(vec![order_line(&cake, 1000)], 0)).await;
        let second = place(&db, &order_request(vec![order_line(&cake, 1000)], 0)).await;

        let prefix = order_rows::order_number_prefix(Utc::now().date_naive());
        assert_eq!(first.order.order_number, format!("{prefix}0001"));
        assert_eq!(second.order.order_number, format!("{prefix}0002"));
    }

    #[tokio::test]
    async fn test_deposit_cannot_exceed_total() {
        let db = test_db().await;
        let cake = seed_product(&db, "CAKE", SaleType::Unit, 30000, 5).await;

        let err = db
            .orders()
            .create(&cashier("ana"), &order_request(vec![order_line(&cake, 1000)], 30001))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::DepositExceedsTotal { .. })));

        let detail = place(&db, &order_request(vec![order_line(&cake, 2000)], 50000)).await;

        // Shrinking the order below its deposit is rejected too.
        let err = db
            .orders()
            .update(
                &detail.order.id,
                &cashier("ana"),
                &UpdateOrderRequest {
                    items: Some(vec![order_line(&cake, 1000)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let unchanged = db.orders().get(&detail.order.id).await.unwrap().unwrap();
        assert_eq!(unchanged.order.total_cents, 60000);
        assert_eq!(unchanged.items.len(), 1);
        assert_eq!(unchanged.items[0].quantity_milli, 2000);
    }

    #[tokio::test]
    async fn test_update_replaces_items() {
        let db = test_db().await;
        let cake = seed_product(&db, "CAKE", SaleType::Unit, 30000, 5).await;
        let bread = seed_product(&db, "BREAD", SaleType::Unit, 500, 50).await;
        let detail = place(&db, &order_request(vec![order_line(&cake, 1000)], 0)).await;

        let updated = db
            .orders()
            .update(
                &detail.order.id,
                &cashier("ana"),
                &UpdateOrderRequest {
                    items: Some(vec![order_line(&bread, 12000)]),
                    discount_cents: Some(1000),
                    notes: Some("sin azucar".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].product_id, bread.id);
        assert_eq!(updated.order.subtotal_cents, 6000);
        assert_eq!(updated.order.total_cents, 5000);
        assert_eq!(updated.order.notes.as_deref(), Some("sin azucar"));

        let stored = db.orders().get(&detail.order.id).await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.order.total_cents, 5000);
    }

    #[tokio::test]
    async fn test_state_machine() {
        let db = test_db().await;
        let ana = cashier("ana");
        let cake = seed_product(&db, "CAKE", SaleType::Unit, 30000, 5).await;
        let detail = place(&db, &order_request(vec![order_line(&cake, 1000)], 0)).await;
        let id = detail.order.id.as_str();

        // PENDING cannot be delivered directly.
        let err = db.orders().mark_delivered(id, &ana).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidOrderTransition { .. })));

        let ready = db.orders().mark_ready(id, &ana).await.unwrap();
        assert_eq!(ready.status, OrderStatus::Ready);

        let cancelled = db
            .orders()
            .cancel(
                id,
                &ana,
                &CancelOrderRequest {
                    reason: Some("  ".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
        assert!(cancelled.cancellation_reason.is_none());

        // Terminal states refuse every transition and every edit.
        let err = db.orders().mark_ready(id, &ana).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let err = db
            .orders()
            .update(id, &ana, &UpdateOrderRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_delivery_without_sale_deducts_stock() {
        let db = test_db().await;
        let ana = cashier("ana");
        let cake = seed_product(&db, "CAKE", SaleType::Unit, 30000, 5).await;
        let cheese = seed_product(&db, "CHEESE", SaleType::Weight, 18000, 0).await;
        let detail = place(
            &db,
            &order_request(vec![order_line(&cake, 2000), order_line(&cheese, 750)], 0),
        )
        .await;
        let id = detail.order.id.as_str();

        db.orders().mark_ready(id, &ana).await.unwrap();
        let delivered = db.orders().mark_delivered(id, &ana).await.unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(delivered.stock_deducted);
        assert!(delivered.delivered_at.is_some());
        assert_eq!(stock_milli(&db, &cake).await, 3000);
        assert_eq!(stock_milli(&db, &cheese).await, 0);

        let err = db.orders().delete(id, &manager("mara")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        db.orders().delete(id, &admin("root")).await.unwrap();
        assert_eq!(stock_milli(&db, &cake).await, 5000);
        assert!(db.orders().get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delivery_fails_without_stock() {
        let db = test_db().await;
        let ana = cashier("ana");
        let cake = seed_product(&db, "CAKE", SaleType::Unit, 30000, 1).await;
        let detail = place(&db, &order_request(vec![order_line(&cake, 2000)], 0)).await;
        let id = detail.order.id.as_str();

        db.orders().mark_ready(id, &ana).await.unwrap();
        let err = db.orders().mark_delivered(id, &ana).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InsufficientStock { .. })));

        let stored = db.orders().get(id).await.unwrap().unwrap().order;
        assert_eq!(stored.status, OrderStatus::Ready);
        assert!(!stored.stock_deducted);
        assert_eq!(stock_milli(&db, &cake).await, 1000);
    }

    #[tokio::test]
    async fn test_delete_order_removes_paying_sale() {
        let db = test_db().await;
        let ana = cashier("ana");
        let session = open_session(&db, &ana, "T1", 0).await;
        let cake = seed_product(&db, "CAKE", SaleType::Unit, 30000, 5).await;
        let detail = place(&db, &order_request(vec![order_line(&cake, 1000)], 0)).await;

        let mut request = sale_request(
            &session,
            vec![line(&cake, 1000)],
            Tender::Cash { cash_cents: 30000 },
        );
        request.order_id = Some(detail.order.id.clone());
        let sale = sell(&db, &ana, &request).await.sale;
        assert_eq!(stock_milli(&db, &cake).await, 4000);

        db.orders().delete(&detail.order.id, &admin("root")).await.unwrap();

        assert!(db.orders().get(&detail.order.id).await.unwrap().is_none());
        assert!(db.sales().get(&sale.id).await.unwrap().is_none());
        assert_eq!(stock_milli(&db, &cake).await, 5000);
        let drawer = db.cash_sessions().get(&session.id).await.unwrap().unwrap();
        assert_eq!(drawer.expected_amount_cents, 0);
    }

    #[tokio::test]
    async fn test_inactive_product_and_fractional_units() {
        let db = test_db().await;
        let cake = seed_product(&db, "CAKE", SaleType::Unit, 30000, 5).await;
        let old = seed_product(&db, "OLD", SaleType::Unit, 100, 5).await;
        db.products().deactivate(&old.id).await.unwrap();

        let err = db
            .orders()
            .create(&cashier("ana"), &order_request(vec![order_line(&old, 1000)], 0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::ProductInactive { .. })));

        let err = db
            .orders()
            .create(&cashier("ana"), &order_request(vec![order_line(&cake, 500)], 0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(db.orders().list(&OrderFilter::default()).await.unwrap().is_empty());
    }
}
