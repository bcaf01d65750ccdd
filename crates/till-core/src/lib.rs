//! # till-core: Pure Business Logic for Till POS
//!
//! This crate holds the rules of the cash-drawer / sale / order engine as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Controller layer (HTTP, auth)                   │   │
//! │  │    open session ──► sell ──► cancel ──► orders ──► close        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Principal + request types              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  types   │ │  money   │ │ payment  │ │ lifecycle        │  │   │
//! │  │   │ Session  │ │  Money   │ │  Tender  │ │ guards + roles   │  │   │
//! │  │   │ Sale     │ │ Quantity │ │ reconcile│ │ order machine    │  │   │
//! │  │   │ Order    │ │ pricing  │ │          │ │ validation       │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          till-db (SQLite + transactional engine)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (CashSession, Sale, Order, Product, ...)
//! - [`money`] / [`quantity`] - Integer money and fixed-point quantities
//! - [`pricing`] - Line and ticket totals
//! - [`payment`] - Tender reconciliation
//! - [`lifecycle`] - State machine and authorization guards
//! - [`requests`] - Validated input for every engine operation
//! - [`validation`] - Field-level checks
//! - [`error`] - Domain error types and the `ErrorKind` taxonomy
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::money::Money;
//! use till_core::payment::{reconcile, Tender};
//! use till_core::pricing::{compute_totals, price_line};
//! use till_core::quantity::Quantity;
//!
//! // 3 chorizos at $15.00, paid with $100.00 cash
//! let line = price_line(Money::from_cents(1500), Quantity::from_units(3), Money::zero()).unwrap();
//! let totals = compute_totals([&line], Money::zero()).unwrap();
//! let settlement = reconcile(&Tender::Cash { cash_cents: 10000 }, totals.total).unwrap();
//!
//! assert_eq!(settlement.change.cents(), 5500);
//! assert_eq!(settlement.cash_contribution().cents(), 4500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod money;
pub mod payment;
pub mod pricing;
pub mod quantity;
pub mod requests;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use payment::{Settlement, Tender};
pub use quantity::Quantity;
pub use requests::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single sale or order.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity on one line, in thousandths (999 units or 999 kg).
pub const MAX_LINE_QUANTITY_MILLI: i64 = 999_000;

/// Largest accepted amount in cents ($1,000,000,000.00), for inputs and
/// for every computed line, total and tender sum.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;
