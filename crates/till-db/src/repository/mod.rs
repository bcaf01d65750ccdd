//! # Repository Module
//!
//! Row-level database access for Till POS.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Read paths (pool)                  Write paths (inside a transaction) │
//! │  ──────────────────                 ────────────────────────────────── │
//! │  SaleRepository::get_detail         sale::insert_sale(&mut *tx, ..)    │
//! │  OrderRepository::list              product::decrement_stock(..)       │
//! │  CashSessionRepository::movements   session::apply_expected_delta(..)  │
//! │                                                                         │
//! │  Repositories hold a SqlitePool.    Helpers are generic over Executor  │
//! │                                     and only the engine calls them, so │
//! │                                     every write lands in the caller's  │
//! │                                     transaction.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalog, stock levels
//! - [`CashSessionRepository`] - Sessions and movements
//! - [`SaleRepository`] - Sales and sale items
//! - [`OrderRepository`] - Orders and order items

pub mod order;
pub mod product;
pub mod sale;
pub mod session;

pub use order::OrderRepository;
pub use product::ProductRepository;
pub use sale::SaleRepository;
pub use session::CashSessionRepository;
