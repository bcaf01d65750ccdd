//! # Sale Transaction Engine
//!
//! Creates, cancels and deletes sales. Each call is exactly one
//! transaction; any error drops it and nothing is written.
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request                       (before BEGIN)                 │
//! │  BEGIN                                                                 │
//! │   1. session exists, is OPEN, caller is owner / ADMIN / MANAGER        │
//! │   2. per line: product active, UNIT whole + in stock, price snapshot   │
//! │   3. totals = Σ lines − discount (≥ 0)                                 │
//! │   4. reconcile tender → settlement (cash, card, transfer, change)      │
//! │   5. linked order is PENDING/READY and unpaid                          │
//! │   6. INSERT sale + items                                               │
//! │   7. guarded stock decrement per UNIT line                             │
//! │   8. expected_amount += cash − change   (CASH / MIXED)                 │
//! │   9. order → DELIVERED, sale_id = sale                                 │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::engine::compensation;
use crate::engine::error::EngineResult;
use crate::engine::inventory;
use crate::error::{DbError, DbResult};
use crate::repository::sale::{self as sale_rows, generate_sale_id, generate_sale_item_id, SaleRepository};
use crate::repository::{order as order_rows, product, session};
use till_core::lifecycle::{
    authorize_session_access, cancellation_notes, ensure_order_unpaid, ensure_sale_cancellable,
    ensure_session_open, order_transition, require_admin, require_privileged, OrderAction,
};
use till_core::payment::reconcile;
use till_core::pricing::{compute_totals, price_line, unit_price_for, PricedLine};
use till_core::{
    CancelSaleRequest, CoreError, CreateSaleRequest, Money, Principal, Quantity, Sale, SaleDetail,
    SaleItem, SaleStatus, ValidationError,
};

use super::cash_session::load_session;

/// Sale operations. Obtained from [`crate::Database::sales`].
#[derive(Debug, Clone)]
pub struct SaleService {
    pool: SqlitePool,
}

impl SaleService {
    pub fn new(pool: SqlitePool) -> Self {
        SaleService { pool }
    }

    fn repo(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Records a sale and applies its inventory, drawer and order effects.
    ///
    /// ## Errors
    /// - `NotFound`: session, product or linked order
    /// - `Conflict`: session not open, product inactive, insufficient stock,
    ///   discount above subtotal, tender short or mismatched, order not payable
    /// - `Forbidden`: caller neither owns the session nor is ADMIN/MANAGER
    /// - `Validation`: malformed request, fractional quantity on a UNIT line
    pub async fn create(
        &self,
        principal: &Principal,
        request: &CreateSaleRequest,
    ) -> EngineResult<SaleDetail> {
        request.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let now = Utc::now();
        let sale_id = generate_sale_id();

        let drawer = load_session(&mut *tx, &request.session_id).await?;
        ensure_session_open(&drawer)?;
        authorize_session_access(&drawer, principal, "sell on this session")?;

        let mut priced: Vec<PricedLine> = Vec::with_capacity(request.items.len());
        let mut items: Vec<SaleItem> = Vec::with_capacity(request.items.len());

        for line in &request.items {
            let item = product::fetch_product(&mut *tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", &line.product_id))?;

            if !item.is_active {
                return Err(CoreError::ProductInactive { name: item.name }.into());
            }

            let quantity = Quantity::from_milli(line.quantity_milli);
            if item.sale_type.tracks_stock() {
                if !quantity.is_whole() {
                    return Err(ValidationError::InvalidFormat {
                        field: "quantity_milli".to_string(),
                        reason: format!("{} is sold by the piece", item.name),
                    }
                    .into());
                }
                if quantity > item.stock() {
                    warn!(product_id = %item.id, "Sale rejected: insufficient stock");
                    return Err(CoreError::InsufficientStock {
                        available: item.stock(),
                        requested: quantity,
                        product: item.name,
                    }
                    .into());
                }
            }

            let unit_price = unit_price_for(&item, line.unit_price_cents);
            let line_price = price_line(unit_price, quantity, Money::from_cents(line.discount_cents))?;

            items.push(SaleItem {
                id: generate_sale_item_id(),
                sale_id: sale_id.clone(),
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
                created_at: now,
            });
            priced.push(line_price);
        }

        let totals = compute_totals(&priced, Money::from_cents(request.discount_cents))?;
        let settlement = reconcile(&request.tender, totals.total)?;

        let paid_order = match &request.order_id {
            Some(order_id) => {
                let target = order_rows::fetch_order(&mut *tx, order_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("Order", order_id))?;
                order_transition(&target, OrderAction::PayWithSale)?;
                ensure_order_unpaid(&target)?;
                Some(target)
            }
            None => None,
        };

        let sale = Sale {
            id: sale_id,
            session_id: drawer.id.clone(),
            cashier_id: principal.user_id.clone(),
            customer_id: request.customer_id.clone(),
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            total_cents: totals.total.cents(),
            payment_method: settlement.method,
            cash_amount_cents: settlement.cash.cents(),
            card_amount_cents: settlement.card.cents(),
            transfer_amount_cents: settlement.transfer.cents(),
            change_cents: settlement.change.cents(),
            status: SaleStatus::Completed,
            notes: request.notes.clone(),
            order_id: request.order_id.clone(),
            created_at: now,
            updated_at: now,
        };

        sale_rows::insert_sale(&mut *tx, &sale).await?;
        for item in &items {
            sale_rows::insert_item(&mut *tx, item).await?;
        }

        inventory::reserve(&mut *tx, &items, now).await?;

        let contribution = settlement.cash_contribution();
        if !contribution.is_zero() {
            session::apply_expected_delta(&mut *tx, &drawer.id, contribution.cents()).await?;
        }

        if let Some(mut target) = paid_order {
            target.sale_id = Some(sale.id.clone());
            target.status = order_transition(&target, OrderAction::PayWithSale)?;
            target.delivered_at = Some(now);
            target.updated_at = now;
            order_rows::save_order(&mut *tx, &target).await?;
            info!(order_id = %target.id, sale_id = %sale.id, "Order paid and delivered");
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = %sale.id,
            session_id = %sale.session_id,
            total = %totals.total,
            method = ?sale.payment_method,
            change = %settlement.change,
            lines = items.len(),
            "Sale completed"
        );
        Ok(SaleDetail { sale, items })
    }

    /// Cancels a COMPLETED sale: stock and drawer are restored, the sale is
    /// kept with status CANCELLED and the reason appended to its notes.
    ///
    /// An order the sale paid for returns to READY. Sales of a CLOSED
    /// session are rejected with `SessionNotOpen`.
    pub async fn cancel(
        &self,
        sale_id: &str,
        principal: &Principal,
        request: &CancelSaleRequest,
    ) -> EngineResult<SaleDetail> {
        require_privileged(principal, "cancel sales")?;
        request.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let now = Utc::now();

        let sale = sale_rows::fetch_sale(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;
        ensure_sale_cancellable(&sale)?;

        // A closed drawer is settled; only administrative deletion may touch it.
        let drawer = load_session(&mut *tx, &sale.session_id).await?;
        ensure_session_open(&drawer)?;

        let items = sale_rows::fetch_items(&mut *tx, sale_id).await?;
        compensation::reverse_sale_effects(&mut *tx, &sale, &items, now).await?;
        compensation::detach_paid_order(&mut *tx, &sale, now).await?;

        let notes = cancellation_notes(sale.notes.as_deref(), request.reason.trim());
        if !sale_rows::mark_cancelled(&mut *tx, sale_id, &notes, now).await? {
            return Err(CoreError::SaleAlreadyCancelled {
                sale_id: sale_id.to_string(),
            }
            .into());
        }

        let cancelled = sale_rows::fetch_sale(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = %sale_id,
            cancelled_by = %principal.user_id,
            restored_cash = %sale.cash_contribution(),
            "Sale cancelled"
        );
        Ok(SaleDetail {
            sale: cancelled,
            items,
        })
    }

    /// Hard-deletes a sale (ADMIN). A COMPLETED sale is compensated first;
    /// a paid order returns to READY.
    pub async fn delete(&self, sale_id: &str, principal: &Principal) -> EngineResult<()> {
        require_admin(principal, "delete sales")?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let sale = sale_rows::fetch_sale(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        compensation::remove_sale(&mut *tx, &sale, Utc::now()).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(sale_id = %sale_id, deleted_by = %principal.user_id, "Sale deleted");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// A sale with its lines.
    pub async fn get(&self, sale_id: &str) -> DbResult<Option<SaleDetail>> {
        self.repo().get_detail(sale_id).await
    }

    pub async fn list_for_session(&self, session_id: &str) -> DbResult<Vec<Sale>> {
        self.repo().list_for_session(session_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
