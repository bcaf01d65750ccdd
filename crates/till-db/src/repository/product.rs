//! # Product Repository
//!
//! Catalog rows and the stock column the inventory ledger moves.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read, compute, write back                                   │
//! │     SELECT stock ...;  UPDATE products SET stock = 7 WHERE id = ?      │
//! │     (two registers selling the last unit both see stock = 1)           │
//! │                                                                         │
//! │  ✅ CORRECT: guarded delta                                              │
//! │     UPDATE products                                                     │
//! │        SET stock_quantity_milli = stock_quantity_milli - ?2            │
//! │      WHERE id = ?1 AND stock_quantity_milli >= ?2                      │
//! │                                                                         │
//! │  rows_affected = 0  →  not enough stock (or no such product)           │
//! │  CHECK (stock_quantity_milli >= 0) backs the guard up.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::error::EngineResult;
use crate::error::{DbError, DbResult};
use till_core::validation::{validate_name, validate_non_negative_cents, validate_sku, validate_text};
use till_core::{AdjustStockRequest, CoreError, Product, Quantity, SaleType, ValidationError};

const PRODUCT_COLUMNS: &str = "id, sku, name, description, sale_type, unit, price_cents, \
     cost_cents, discount_price_cents, discount_active, stock_quantity_milli, min_stock_milli, \
     is_active, created_at, updated_at";

const MAX_PRODUCT_NAME_LEN: usize = 200;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.get_by_sku("CHZ-01").await?;
/// let low = repo.low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        fetch_product(&self.pool, id).await
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Active UNIT products at or below their minimum stock.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND sale_type = 'UNIT' \
               AND stock_quantity_milli <= min_stock_milli \
             ORDER BY stock_quantity_milli, name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Low stock products");
        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(Validation)` - Bad SKU, name, price or stock
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &Product) -> EngineResult<Product> {
        validate_sku(&product.sku)?;
        validate_name("name", &product.name, MAX_PRODUCT_NAME_LEN)?;
        validate_text("description", product.description.as_deref(), 1000)?;
        validate_non_negative_cents("price_cents", product.price_cents)?;
        if let Some(discount) = product.discount_price_cents {
            validate_non_negative_cents("discount_price_cents", discount)?;
        }
        if product.stock_quantity_milli < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "stock_quantity_milli".to_string(),
            }
            .into());
        }

        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, sale_type, unit,
                price_cents, cost_cents, discount_price_cents, discount_active,
                stock_quantity_milli, min_stock_milli, is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.sale_type)
        .bind(&product.unit)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.discount_price_cents)
        .bind(product.discount_active)
        .bind(product.stock_quantity_milli)
        .bind(product.min_stock_milli)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(product.clone())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical sale and order lines keep referencing it.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Manual stock correction for a UNIT product.
    ///
    /// Negative deltas go through the same guard as a sale, so stock never
    /// drops below zero.
    pub async fn adjust_stock(&self, id: &str, request: &AdjustStockRequest) -> EngineResult<Product> {
        request.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let product = fetch_product(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", id))?;

        if product.sale_type != SaleType::Unit {
            return Err(ValidationError::InvalidFormat {
                field: "delta_milli".to_string(),
                reason: "weight products carry no stock".to_string(),
            }
            .into());
        }
        let delta = Quantity::from_milli(request.delta_milli);
        if !delta.is_whole() {
            return Err(ValidationError::InvalidFormat {
                field: "delta_milli".to_string(),
                reason: "unit products move in whole units".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        if request.delta_milli < 0 {
            let requested = Quantity::from_milli(-request.delta_milli);
            if !decrement_stock(&mut *tx, id, requested.milli(), now).await? {
                return Err(CoreError::InsufficientStock {
                    available: product.stock(),
                    requested,
                    product: product.name,
                }
                .into());
            }
        } else {
            increment_stock(&mut *tx, id, request.delta_milli, now).await?;
        }

        let updated = fetch_product(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", id))?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            product_id = %id,
            delta_milli = request.delta_milli,
            stock_milli = updated.stock_quantity_milli,
            "Stock adjusted"
        );
        Ok(updated)
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-scoped helpers
// =============================================================================

pub(crate) async fn fetch_product<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(product)
}

/// Guarded decrement. Returns `false` when the row is missing or holds less
/// than `milli`; nothing is written in that case.
pub(crate) async fn decrement_stock<'e, E>(
    executor: E,
    id: &str,
    milli: i64,
    now: DateTime<Utc>,
) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity_milli = stock_quantity_milli - ?2,
            updated_at = ?3
        WHERE id = ?1 AND stock_quantity_milli >= ?2
        "#,
    )
    .bind(id)
    .bind(milli)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Returns `false` when the product row is missing.
pub(crate) async fn increment_stock<'e, E>(
    executor: E,
    id: &str,
    milli: i64,
    now: DateTime<Utc>,
) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE products SET stock_quantity_milli = stock_quantity_milli + ?2, updated_at = ?3 WHERE id = ?1",
    )
    .bind(id)
    .bind(milli)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_product, test_db};
    use till_core::ErrorKind;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = test_db().await;
        let product = seed_product(&db, "CHZ-01", SaleType::Unit, 1500, 10).await;

        let by_id = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(by_id.sku, "CHZ-01");
        assert_eq!(by_id.stock(), Quantity::from_units(10));

        let by_sku = db.products().get_by_sku("CHZ-01").await.unwrap().unwrap();
        assert_eq!(by_sku.id, product.id);

        assert!(db.products().get_by_sku("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_conflict() {
        let db = test_db().await;
        let product = seed_product(&db, "CHZ-01", SaleType::Unit, 1500, 10).await;

        let mut dup = product.clone();
        dup.id = generate_product_id();
        let err = db.products().insert(&dup).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_adjust_stock_never_negative() {
        let db = test_db().await;
        let product = seed_product(&db, "CHZ-01", SaleType::Unit, 1500, 3).await;

        let up = db
            .products()
            .adjust_stock(&product.id, &AdjustStockRequest { delta_milli: 2_000 })
            .await
            .unwrap();
        assert_eq!(up.stock(), Quantity::from_units(5));

        let err = db
            .products()
            .adjust_stock(&product.id, &AdjustStockRequest { delta_milli: -6_000 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock(), Quantity::from_units(5));
    }

    #[tokio::test]
    async fn test_adjust_stock_rejects_weight_products() {
        let db = test_db().await;
        let steak = seed_product(&db, "RIB-KG", SaleType::Weight, 32000, 0).await;

        let err = db
            .products()
            .adjust_stock(&steak.id, &AdjustStockRequest { delta_milli: 1_000 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_low_stock_and_deactivate() {
        let db = test_db().await;
        let low = seed_product(&db, "CHZ-01", SaleType::Unit, 1500, 0).await;
        seed_product(&db, "LNG-01", SaleType::Unit, 2000, 50).await;

        let report = db.products().low_stock().await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].id, low.id);

        db.products().deactivate(&low.id).await.unwrap();
        assert!(db.products().low_stock().await.unwrap().is_empty());
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_guarded_decrement() {
        let db = test_db().await;
        let product = seed_product(&db, "CHZ-01", SaleType::Unit, 1500, 2).await;

        assert!(decrement_stock(db.pool(), &product.id, 2_000, Utc::now()).await.unwrap());
        assert!(!decrement_stock(db.pool(), &product.id, 1_000, Utc::now()).await.unwrap());
        assert!(increment_stock(db.pool(), &product.id, 1_000, Utc::now()).await.unwrap());
        assert!(!increment_stock(db.pool(), "missing", 1_000, Utc::now()).await.unwrap());
    }
}
