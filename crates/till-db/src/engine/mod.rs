//! # Transactional Engine
//!
//! The command side of Till POS. Every public method on the services below
//! opens one sqlx transaction, runs its guards and writes, and commits; an
//! error anywhere drops the transaction and rolls everything back.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   CashSessionService      SaleService           OrderService           │
//! │   open / close            create / cancel       create / update        │
//! │   add_movement            delete                mark_ready / delivered │
//! │   delete                                        cancel / delete        │
//! │        │                      │                       │                 │
//! │        └──────────┬───────────┴───────────┬───────────┘                 │
//! │                   ▼                       ▼                             │
//! │             compensation              inventory                         │
//! │       (reverse sale / order /     (reserve / release                   │
//! │        session effects)             UNIT lines)                        │
//! │                   │                       │                             │
//! │                   └───────────┬───────────┘                             │
//! │                               ▼                                         │
//! │                  repository helpers (&mut SqliteConnection)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lock contention surfaces as [`EngineError`] with
//! [`ErrorKind::Concurrency`](till_core::ErrorKind::Concurrency); the
//! engine never retries on its own.

pub mod cash_session;
pub(crate) mod compensation;
pub mod error;
pub(crate) mod inventory;
pub mod order;
pub mod sale;

pub use cash_session::CashSessionService;
pub use error::{EngineError, EngineResult};
pub use order::OrderService;
pub use sale::SaleService;
