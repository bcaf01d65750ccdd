//! # Request Types
//!
//! Structured input for every engine operation. The controller layer
//! deserializes these; the engine calls `validate()` before it opens a
//! transaction, so a malformed request never touches the database.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::payment::Tender;
use crate::types::{MovementKind, OrderStatus};
use crate::validation::{
    validate_delivery_time, validate_email, validate_line_count, validate_name,
    validate_non_negative_cents, validate_phone, validate_pieces, validate_positive_cents,
    validate_quantity_milli, validate_required, validate_text, validate_uuid, ValidationResult,
    MAX_NOTES_LEN, MAX_REASON_LEN,
};

const MAX_CUSTOMER_NAME_LEN: usize = 200;

// =============================================================================
// Cash Sessions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OpenSessionRequest {
    pub terminal_id: String,
    pub opening_amount_cents: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl OpenSessionRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("terminal_id", &self.terminal_id)?;
        validate_non_negative_cents("opening_amount_cents", self.opening_amount_cents)?;
        validate_text("notes", self.notes.as_deref(), MAX_NOTES_LEN)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CloseSessionRequest {
    pub closing_amount_cents: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CloseSessionRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_non_negative_cents("closing_amount_cents", self.closing_amount_cents)?;
        validate_text("notes", self.notes.as_deref(), MAX_NOTES_LEN)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AddMovementRequest {
    pub kind: MovementKind,
    pub amount_cents: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AddMovementRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_positive_cents("amount_cents", self.amount_cents)?;
        validate_text("reason", self.reason.as_deref(), MAX_REASON_LEN)
    }
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineRequest {
    pub product_id: String,
    pub quantity_milli: i64,
    /// Overrides the catalog price for this line.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub pieces: Option<i64>,
}

impl SaleLineRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_uuid("product_id", &self.product_id)?;
        validate_quantity_milli("quantity_milli", self.quantity_milli)?;
        if let Some(price) = self.unit_price_cents {
            validate_non_negative_cents("unit_price_cents", price)?;
        }
        validate_non_negative_cents("discount_cents", self.discount_cents)?;
        validate_pieces(self.pieces)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateSaleRequest {
    pub session_id: String,
    pub items: Vec<SaleLineRequest>,
    #[serde(default)]
    pub discount_cents: i64,
    pub tender: Tender,
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Order this sale pays for; the order is delivered with the sale.
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateSaleRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("session_id", &self.session_id)?;
        validate_line_count(self.items.len())?;
        for item in &self.items {
            item.validate()?;
        }
        validate_non_negative_cents("discount_cents", self.discount_cents)?;
        self.tender.validate()?;
        if let Some(customer_id) = &self.customer_id {
            validate_uuid("customer_id", customer_id)?;
        }
        if let Some(order_id) = &self.order_id {
            validate_uuid("order_id", order_id)?;
        }
        validate_text("notes", self.notes.as_deref(), MAX_NOTES_LEN)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CancelSaleRequest {
    pub reason: String,
}

impl CancelSaleRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("reason", &self.reason)?;
        validate_text("reason", Some(self.reason.as_str()), MAX_REASON_LEN)
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity_milli: i64,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub pieces: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl OrderLineRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_uuid("product_id", &self.product_id)?;
        validate_quantity_milli("quantity_milli", self.quantity_milli)?;
        validate_non_negative_cents("discount_cents", self.discount_cents)?;
        validate_pieces(self.pieces)?;
        validate_text("notes", self.notes.as_deref(), MAX_REASON_LEN)
    }
}

/// Customer contact snapshot carried by an order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerInfo {
    #[serde(default)]
    pub customer_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl CustomerInfo {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(id) = &self.customer_id {
            validate_uuid("customer_id", id)?;
        }
        validate_name("customer_name", &self.name, MAX_CUSTOMER_NAME_LEN)?;
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateOrderRequest {
    pub customer: CustomerInfo,
    pub items: Vec<OrderLineRequest>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub deposit_cents: i64,
    #[ts(as = "String")]
    pub delivery_date: NaiveDate,
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub internal_notes: Option<String>,
}

impl CreateOrderRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        self.customer.validate()?;
        validate_line_count(self.items.len())?;
        for item in &self.items {
            item.validate()?;
        }
        validate_non_negative_cents("discount_cents", self.discount_cents)?;
        validate_non_negative_cents("deposit_cents", self.deposit_cents)?;
        if let Some(time) = &self.delivery_time {
            validate_delivery_time(time)?;
        }
        validate_text("notes", self.notes.as_deref(), MAX_NOTES_LEN)?;
        validate_text("internal_notes", self.internal_notes.as_deref(), MAX_NOTES_LEN)
    }
}

/// Partial update of an open order. Absent fields keep their value; a
/// present `items` list replaces every line and re-prices the order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub customer: Option<CustomerInfo>,
    #[serde(default)]
    pub items: Option<Vec<OrderLineRequest>>,
    #[serde(default)]
    pub discount_cents: Option<i64>,
    #[serde(default)]
    pub deposit_cents: Option<i64>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub internal_notes: Option<String>,
}

impl UpdateOrderRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(customer) = &self.customer {
            customer.validate()?;
        }
        if let Some(items) = &self.items {
            validate_line_count(items.len())?;
            for item in items {
                item.validate()?;
            }
        }
        if let Some(discount) = self.discount_cents {
            validate_non_negative_cents("discount_cents", discount)?;
        }
        if let Some(deposit) = self.deposit_cents {
            validate_non_negative_cents("deposit_cents", deposit)?;
        }
        if let Some(time) = &self.delivery_time {
            validate_delivery_time(time)?;
        }
        validate_text("notes", self.notes.as_deref(), MAX_NOTES_LEN)?;
        validate_text("internal_notes", self.internal_notes.as_deref(), MAX_NOTES_LEN)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CancelOrderRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

impl CancelOrderRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_text("reason", self.reason.as_deref(), MAX_REASON_LEN)
    }
}

/// Filter for order listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderFilter {
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

// =============================================================================
// Catalog
// =============================================================================

/// Manual stock correction (receiving goods, shrinkage).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdjustStockRequest {
    /// Signed change in thousandths.
    pub delta_milli: i64,
}

impl AdjustStockRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.delta_milli == 0 {
            return Err(ValidationError::Required {
                field: "delta_milli".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT: &str = "550e8400-e29b-41d4-a716-446655440000";
    const SESSION: &str = "6fa459ea-ee8a-4ca4-894e-db77e160355e";

    fn sale_request() -> CreateSaleRequest {
        CreateSaleRequest {
            session_id: SESSION.to_string(),
            items: vec![SaleLineRequest {
                product_id: PRODUCT.to_string(),
                quantity_milli: 3_000,
                unit_price_cents: None,
                discount_cents: 0,
                pieces: None,
            }],
            discount_cents: 0,
            tender: Tender::Cash { cash_cents: 10000 },
            customer_id: None,
            order_id: None,
            notes: None,
        }
    }

    #[test]
    fn test_create_sale_request_valid() {
        assert!(sale_request().validate().is_ok());
    }

    #[test]
    fn test_create_sale_request_rejects_empty_items() {
        let mut req = sale_request();
        req.items.clear();
        assert!(matches!(req.validate(), Err(ValidationError::Required { .. })));
    }

    #[test]
    fn test_create_sale_request_rejects_bad_lines() {
        let mut req = sale_request();
        req.items[0].quantity_milli = 0;
        assert!(req.validate().is_err());

        let mut req = sale_request();
        req.items[0].product_id = "nope".to_string();
        assert!(req.validate().is_err());

        let mut req = sale_request();
        req.tender = Tender::Cash { cash_cents: -5 };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_sale_request_json_shape() {
        let json = format!(
            r#"{{"session_id":"{SESSION}","items":[{{"product_id":"{PRODUCT}","quantity_milli":1250}}],
                "tender":{{"method":"CARD"}}}}"#
        );
        let req: CreateSaleRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req.items[0].discount_cents, 0);
        assert_eq!(req.tender, Tender::Card);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_movement_request() {
        let ok = AddMovementRequest {
            kind: MovementKind::Deposit,
            amount_cents: 20000,
            reason: None,
        };
        assert!(ok.validate().is_ok());

        let zero = AddMovementRequest {
            amount_cents: 0,
            ..ok
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_order_request_customer_rules() {
        let mut req = CreateOrderRequest {
            customer: CustomerInfo {
                customer_id: None,
                name: "Ana".to_string(),
                phone: Some("555-1234".to_string()),
                email: None,
            },
            items: vec![OrderLineRequest {
                product_id: PRODUCT.to_string(),
                quantity_milli: 2_000,
                discount_cents: 0,
                pieces: None,
                notes: Some("thin cut".to_string()),
            }],
            discount_cents: 0,
            deposit_cents: 5000,
            delivery_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            delivery_time: Some("10:30".to_string()),
            notes: None,
            internal_notes: None,
        };
        assert!(req.validate().is_ok());

        req.delivery_time = Some("25:00".to_string());
        assert!(req.validate().is_err());

        req.delivery_time = None;
        req.customer.name = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_cancel_sale_requires_reason() {
        assert!(CancelSaleRequest { reason: " ".to_string() }.validate().is_err());
        assert!(CancelSaleRequest { reason: "duplicate".to_string() }.validate().is_ok());
    }
}
