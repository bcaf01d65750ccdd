//! # till-db: Persistence and Transaction Engine for Till POS
//!
//! SQLite storage (sqlx) plus the services that keep cash sessions, sales,
//! inventory and customer orders consistent with each other.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Data Flow                               │
//! │                                                                         │
//! │  Register / back office (create_sale, close_session, ...)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     till-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │    Engine     │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │───►│ CashSession   │    │  (embedded)  │   │   │
//! │  │   │               │    │ Sale, Order   │    │              │   │   │
//! │  │   │ SqlitePool    │    │ Compensation  │    │ 001_initial  │   │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘   │   │
//! │  │                                ▼                                │   │
//! │  │                        ┌───────────────┐                        │   │
//! │  │                        │ Repositories  │                        │   │
//! │  │                        └───────────────┘                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (till.db)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Layered runtime configuration (file + `TILL_*` env)
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Row mapping and single-table reads/writes
//! - [`engine`] - Transactional commands across tables
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_db::{Database, DbConfig};
//! use till_core::{OpenSessionRequest, Principal, Role};
//!
//! let db = Database::new(DbConfig::new("till.db")).await?;
//!
//! let cashier = Principal::new("ana", Role::Cashier);
//! let session = db
//!     .cash_sessions()
//!     .open(&cashier, &OpenSessionRequest {
//!         terminal_id: "T1".into(),
//!         opening_amount_cents: 50_000,
//!         notes: None,
//!     })
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, TillConfig};
pub use engine::{CashSessionService, EngineError, EngineResult, OrderService, SaleService};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::session::CashSessionRepository;
