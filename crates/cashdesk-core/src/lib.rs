//! # cashdesk-core: Pure Business Logic for Cashdesk
//!
//! Everything the checkout, cancellation and reporting paths agree on,
//! expressed as pure types and functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cashdesk Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                apps/cashdesk (request layer)                    │   │
//! │  │   create_transaction, cancel_transaction, daily_revenue, ...   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                cashdesk-db (units of work)                      │   │
//! │  │   InventoryLedger ─► TransactionStore ─► ReportingEngine        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ cashdesk-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  report   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ DayWindow │  │   rules   │  │   │
//! │  │   │Transaction│  │  TaxRate  │  │ SalesRow  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Transaction, TransactionItem, ShopSettings)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`report`] - Date windows and report aggregation
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use cashdesk_core::money::Money;
//!
//! let unit_price = Money::parse_decimal("10.00").unwrap();
//! let line_total = unit_price.multiply_quantity(3).unwrap();
//! assert_eq!(line_total.to_decimal_string(), "30.00");
//! ```

pub mod error;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use report::{
    CostBasis, DailyRevenue, DayWindow, ProfitReport, ReportRange, ReportTransaction,
    SalesReportRow,
};
pub use types::*;

/// Maximum line items accepted in a single checkout.
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest unit price or header amount accepted at checkout (1,000,000,000.00).
///
/// With [`MAX_ITEM_QUANTITY`] and [`MAX_TRANSACTION_ITEMS`] this keeps every
/// basket subtotal well inside `i64` cents.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Prefix of every generated transaction number.
pub const TRANSACTION_NUMBER_PREFIX: &str = "TXN";
