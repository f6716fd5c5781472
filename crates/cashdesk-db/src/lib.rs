//! # cashdesk-db: Database Layer for Cashdesk
//!
//! SQLite persistence through sqlx, and every unit of work that touches
//! stock or transaction state.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cashdesk Data Flow                               │
//! │                                                                         │
//! │  PosService::create_transaction                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   cashdesk-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │    │ InventoryLedger    │  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ TransactionStore   │  │ 001_init   │  │   │
//! │  │   │ StoreOptions  │    │ ReportingEngine    │  │            │  │   │
//! │  │   │               │    │ Product / Settings │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cashdesk_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("cashdesk.db")).await?;
//! let sale = db.transactions().create_transaction(&header, &items).await?;
//! db.transactions().cancel_transaction(&sale.transaction.id).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod timestamp;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, StoreOptions};

pub use repository::inventory::{InventoryLedger, Reservation};
pub use repository::product::ProductRepository;
pub use repository::report::ReportingEngine;
pub use repository::settings::ShopSettingsRepository;
pub use repository::transaction::{generate_transaction_number, NumberGenerator, TransactionStore};
