//! Fixtures shared by the `#[cfg(test)]` modules of this crate.

use std::path::PathBuf;

use chrono::Utc;
use uuid::Uuid;

use crate::repository::product::generate_product_id;
use crate::{Database, DbConfig};
use till_core::{
    CashSession, CreateSaleRequest, OpenSessionRequest, Principal, Product, Role, SaleDetail,
    SaleLineRequest, SaleType, Tender,
};

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A WAL database file under the temp dir with a real multi-connection
/// pool. The file and its `-wal` / `-shm` siblings are removed on drop.
pub(crate) struct FileDb {
    pub(crate) db: Database,
    path: PathBuf,
}

impl Drop for FileDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", self.path.display()));
        }
    }
}

pub(crate) async fn file_db(max_connections: u32) -> FileDb {
    let path = std::env::temp_dir().join(format!("till-test-{}.db", Uuid::new_v4()));
    let db = Database::new(DbConfig::new(path.clone()).max_connections(max_connections))
        .await
        .unwrap();
    FileDb { db, path }
}

pub(crate) fn admin(id: &str) -> Principal {
    Principal::new(id, Role::Admin)
}

pub(crate) fn manager(id: &str) -> Principal {
    Principal::new(id, Role::Manager)
}

pub(crate) fn cashier(id: &str) -> Principal {
    Principal::new(id, Role::Cashier)
}

/// Inserts an active product. `stock_units` is whole units (ignored by
/// WEIGHT products in practice, stored as given).
pub(crate) async fn seed_product(
    db: &Database,
    sku: &str,
    sale_type: SaleType,
    price_cents: i64,
    stock_units: i64,
) -> Product {
    let now = Utc::now();
    let product = Product {
        id: generate_product_id(),
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        description: None,
        sale_type,
        unit: match sale_type {
            SaleType::Unit => "pz".to_string(),
            SaleType::Weight => "kg".to_string(),
        },
        price_cents,
        cost_cents: None,
        discount_price_cents: None,
        discount_active: false,
        stock_quantity_milli: stock_units * 1_000,
        min_stock_milli: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap()
}

pub(crate) async fn open_session(
    db: &Database,
    principal: &Principal,
    terminal_id: &str,
    opening_cents: i64,
) -> CashSession {
    db.cash_sessions()
        .open(
            principal,
            &OpenSessionRequest {
                terminal_id: terminal_id.to_string(),
                opening_amount_cents: opening_cents,
                notes: None,
            },
        )
        .await
        .unwrap()
}

pub(crate) fn line(product: &Product, quantity_milli: i64) -> SaleLineRequest {
    SaleLineRequest {
        product_id: product.id.clone(),
        quantity_milli,
        unit_price_cents: None,
        discount_cents: 0,
        pieces: None,
    }
}

pub(crate) fn sale_request(
    session: &CashSession,
    items: Vec<SaleLineRequest>,
    tender: Tender,
) -> CreateSaleRequest {
    CreateSaleRequest {
        session_id: session.id.clone(),
        items,
        discount_cents: 0,
        tender,
        customer_id: None,
        order_id: None,
        notes: None,
    }
}

pub(crate) async fn sell(
    db: &Database,
    principal: &Principal,
    request: &CreateSaleRequest,
) -> SaleDetail {
    db.sales().create(principal, request).await.unwrap()
}

pub(crate) async fn stock_milli(db: &Database, product: &Product) -> i64 {
    db.products()
        .get_by_id(&product.id)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity_milli
}

pub(crate) async fn expected_cents(db: &Database, session: &CashSession) -> i64 {
    db.cash_sessions()
        .get(&session.id)
        .await
        .unwrap()
        .unwrap()
        .expected_amount_cents
}
