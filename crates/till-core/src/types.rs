//! # Domain Types
//!
//! Core domain types used throughout Till POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   CashSession   │◄──│      Sale       │──►│    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  terminal_id    │   │  session_id     │   │  product snap   │       │
//! │  │  user_id        │   │  payment_method │   │  quantity_milli │       │
//! │  │  expected_cents │   │  order_id ──┐   │   │  subtotal_cents │       │
//! │  └────────┬────────┘   └─────────────│───┘   └─────────────────┘       │
//! │           │                    ▲     │                                  │
//! │           ▼                    │     ▼                                  │
//! │  ┌─────────────────┐   ┌───────┴─────────┐   ┌─────────────────┐       │
//! │  │  CashMovement   │   │     Order       │──►│   OrderItem     │       │
//! │  │  DEPOSIT        │   │  sale_id        │   │  product snap   │       │
//! │  │  WITHDRAWAL     │   │  status         │   │  notes          │       │
//! │  │  ADJUSTMENT     │   │  deposit_cents  │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  Sale.order_id and Order.sale_id are independent nullable links,       │
//! │  written only by the engine in till-db.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage Convention
//! Every amount is an `*_cents: i64` column and every quantity a
//! `*_milli: i64` column. Accessors wrap them in [`Money`] and [`Quantity`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Principal
// =============================================================================

/// Operator role, as issued by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

/// The authenticated caller of an engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Principal {
            user_id: user_id.into(),
            role,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// ADMIN or MANAGER.
    #[inline]
    pub fn is_privileged(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Manager)
    }
}

// =============================================================================
// Product
// =============================================================================

/// How a product is sold.
///
/// Only UNIT products carry a stock invariant. WEIGHT products are sold by
/// measured quantity and never touch `stock_quantity_milli`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleType {
    Unit,
    Weight,
}

impl SaleType {
    #[inline]
    pub const fn tracks_stock(self) -> bool {
        matches!(self, SaleType::Unit)
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    pub description: Option<String>,

    pub sale_type: SaleType,

    /// Unit label shown next to quantities ("pz", "kg").
    pub unit: String,

    /// Catalog price in cents (per piece or per kilogram).
    pub price_cents: i64,

    /// Cost in cents (for margin reports).
    pub cost_cents: Option<i64>,

    /// Promotional price, applied only while `discount_active` is set.
    pub discount_price_cents: Option<i64>,

    pub discount_active: bool,

    /// Current stock in thousandths. Always >= 0; only UNIT products move it.
    pub stock_quantity_milli: i64,

    /// Threshold for the low-stock report.
    pub min_stock_milli: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Price charged when the line carries no override: the discount price
    /// while the promotion is active, otherwise the catalog price.
    pub fn effective_price(&self) -> Money {
        match (self.discount_active, self.discount_price_cents) {
            (true, Some(cents)) => Money::from_cents(cents),
            _ => self.price(),
        }
    }

    #[inline]
    pub fn stock(&self) -> Quantity {
        Quantity::from_milli(self.stock_quantity_milli)
    }

    #[inline]
    pub fn min_stock(&self) -> Quantity {
        Quantity::from_milli(self.min_stock_milli)
    }

    pub fn is_low_stock(&self) -> bool {
        self.sale_type.tracks_stock() && self.stock_quantity_milli <= self.min_stock_milli
    }
}

// =============================================================================
// Cash Session
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Open,
    Closed,
}

/// A drawer session: one operator accountable for one terminal's cash.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashSession {
    pub id: String,
    pub terminal_id: String,
    /// Operator who opened (and owns) the session.
    pub user_id: String,
    pub status: SessionStatus,
    pub opening_amount_cents: i64,
    /// Opening + deposits - withdrawals + cash contributions of sales.
    pub expected_amount_cents: i64,
    pub closing_amount_cents: Option<i64>,
    /// closing - expected, set at close time.
    pub difference_cents: Option<i64>,
    pub opening_notes: Option<String>,
    pub closing_notes: Option<String>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
}

impl CashSession {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    #[inline]
    pub fn opening_amount(&self) -> Money {
        Money::from_cents(self.opening_amount_cents)
    }

    #[inline]
    pub fn expected_amount(&self) -> Money {
        Money::from_cents(self.expected_amount_cents)
    }

    pub fn difference(&self) -> Option<Money> {
        self.difference_cents.map(Money::from_cents)
    }
}

// =============================================================================
// Cash Movement
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// Cash put into the drawer.
    Deposit,
    /// Cash taken out of the drawer.
    Withdrawal,
    /// Record-only entry; does not move the expected amount.
    Adjustment,
}

impl MovementKind {
    /// Effect of a movement of `amount` on the session's expected amount.
    pub fn balance_delta(self, amount: Money) -> Money {
        match self {
            MovementKind::Deposit => amount,
            MovementKind::Withdrawal => -amount,
            MovementKind::Adjustment => Money::zero(),
        }
    }
}

/// A manual drawer movement. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashMovement {
    pub id: String,
    pub session_id: String,
    pub kind: MovementKind,
    pub amount_cents: i64,
    pub reason: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CashMovement {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Mixed,
}

impl PaymentMethod {
    /// Methods whose cash part lands in the drawer.
    #[inline]
    pub const fn handles_cash(self) -> bool {
        matches!(self, PaymentMethod::Cash | PaymentMethod::Mixed)
    }
}

/// A point-of-sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub session_id: String,
    pub cashier_id: String,
    pub customer_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub cash_amount_cents: i64,
    pub card_amount_cents: i64,
    pub transfer_amount_cents: i64,
    pub change_cents: i64,
    pub status: SaleStatus,
    pub notes: Option<String>,
    /// Order this sale paid for, if any.
    pub order_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == SaleStatus::Cancelled
    }

    /// Cash that stayed in the drawer: `cash - change` for CASH and MIXED,
    /// zero otherwise. Compensation reverses exactly this amount.
    pub fn cash_contribution(&self) -> Money {
        if self.payment_method.handles_cash() {
            Money::from_cents(self.cash_amount_cents - self.change_cents)
        } else {
            Money::zero()
        }
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// What the inventory ledger needs to know about a line.
pub trait StockLine {
    fn product_id(&self) -> &str;
    fn sale_type(&self) -> SaleType;
    fn quantity(&self) -> Quantity;
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// SKU at time of sale (frozen).
    pub product_sku: String,
    pub unit: String,
    /// Sale type at time of sale; compensation restores by this, not by the
    /// current catalog entry.
    pub sale_type: SaleType,
    pub unit_price_cents: i64,
    pub quantity_milli: i64,
    /// Piece count for weighed goods ("3 steaks, 1.2 kg").
    pub pieces: Option<i64>,
    pub discount_cents: i64,
    /// round(unit_price × quantity) - discount.
    pub subtotal_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

impl StockLine for SaleItem {
    fn product_id(&self) -> &str {
        &self.product_id
    }

    fn sale_type(&self) -> SaleType {
        self.sale_type
    }

    fn quantity(&self) -> Quantity {
        Quantity::from_milli(self.quantity_milli)
    }
}

/// A sale together with its lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Order
// =============================================================================

/// Order lifecycle.
///
/// ```text
/// PENDING ──► READY ──► DELIVERED
///    │          │
///    └──────────┴──► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// DELIVERED and CANCELLED orders accept no further changes.
    #[inline]
    pub const fn is_final(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An advance / pickup order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human-readable number, `ORDyymmddNNNN`.
    pub order_number: String,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    /// Paid in advance. Never exceeds `total_cents`.
    pub deposit_cents: i64,
    #[ts(as = "String")]
    pub delivery_date: NaiveDate,
    /// Optional `HH:MM`.
    pub delivery_time: Option<String>,
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
    pub created_by: String,
    /// Sale that paid for this order, if any.
    pub sale_id: Option<String>,
    /// Inventory was deducted directly at delivery (no sale involved).
    pub stock_deducted: bool,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn deposit(&self) -> Money {
        Money::from_cents(self.deposit_cents)
    }

    /// Amount still owed at pickup.
    pub fn balance_due(&self) -> Money {
        self.total() - self.deposit()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_sku: String,
    pub unit: String,
    pub sale_type: SaleType,
    pub unit_price_cents: i64,
    pub quantity_milli: i64,
    pub pieces: Option<i64>,
    pub discount_cents: i64,
    pub subtotal_cents: i64,
    /// Preparation notes ("thin cut").
    pub notes: Option<String>,
}

impl StockLine for OrderItem {
    fn product_id(&self) -> &str {
        &self.product_id
    }

    fn sale_type(&self) -> SaleType {
        self.sale_type
    }

    fn quantity(&self) -> Quantity {
        Quantity::from_milli(self.quantity_milli)
    }
}

/// An order together with its lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(discount_active: bool) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            sku: "CHZ-01".to_string(),
            name: "Chorizo".to_string(),
            description: None,
            sale_type: SaleType::Unit,
            unit: "pz".to_string(),
            price_cents: 1500,
            cost_cents: Some(900),
            discount_price_cents: Some(1200),
            discount_active,
            stock_quantity_milli: 7_000,
            min_stock_milli: 7_000,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_effective_price() {
        assert_eq!(product(false).effective_price().cents(), 1500);
        assert_eq!(product(true).effective_price().cents(), 1200);

        let mut no_discount = product(true);
        no_discount.discount_price_cents = None;
        assert_eq!(no_discount.effective_price().cents(), 1500);
    }

    #[test]
    fn test_low_stock_only_for_unit_products() {
        let mut p = product(false);
        assert!(p.is_low_stock());
        p.sale_type = SaleType::Weight;
        assert!(!p.is_low_stock());
    }

    #[test]
    fn test_movement_balance_delta() {
        let amount = Money::from_cents(20000);
        assert_eq!(MovementKind::Deposit.balance_delta(amount).cents(), 20000);
        assert_eq!(MovementKind::Withdrawal.balance_delta(amount).cents(), -20000);
        assert!(MovementKind::Adjustment.balance_delta(amount).is_zero());
    }

    #[test]
    fn test_principal_roles() {
        assert!(Principal::new("u", Role::Admin).is_privileged());
        assert!(Principal::new("u", Role::Manager).is_privileged());
        assert!(!Principal::new("u", Role::Manager).is_admin());
        assert!(!Principal::new("u", Role::Cashier).is_privileged());
    }

    #[test]
    fn test_enum_wire_format() {
        assert_eq!(serde_json::to_string(&SaleType::Weight).unwrap(), "\"WEIGHT\"");
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Transfer).unwrap(),
            "\"TRANSFER\""
        );
        assert_eq!(OrderStatus::Ready.to_string(), "READY");
        assert!(OrderStatus::Cancelled.is_final());
        assert!(!OrderStatus::Ready.is_final());
    }
}
