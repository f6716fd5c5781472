//! # Database Pool Management
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  DbConfig::new(path)          StoreOptions { timeout, offset, ... }     │
//! │       │                                │                                │
//! │       ▼                                ▼                                │
//! │  Database::new(config).await ─► .with_options(options)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                            │
//! │  │            SqlitePool (WAL)              │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                            │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)         │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                            │
//! │  └─────────────────────────────────────────┘                            │
//! │       │                                                                 │
//! │       ├── inventory()     InventoryLedger                              │
//! │       ├── transactions()  TransactionStore                             │
//! │       ├── reports()       ReportingEngine                              │
//! │       ├── products()      ProductRepository                            │
//! │       └── settings()      ShopSettingsRepository                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! WAL lets readers run beside the single writer. Writers queue on SQLite's
//! lock for up to `busy_timeout` before failing with a retryable
//! [`DbError::Busy`].

use cashdesk_core::report::CostBasis;
use chrono::{FixedOffset, Offset, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::inventory::InventoryLedger;
use crate::repository::product::ProductRepository;
use crate::repository::report::ReportingEngine;
use crate::repository::settings::ShopSettingsRepository;
use crate::repository::transaction::TransactionStore;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Connection pool configuration.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/cashdesk/cashdesk.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// Default: 1
    pub min_connections: u32,

    /// How long to wait for a pooled connection. Default: 30 seconds
    pub connect_timeout: Duration,

    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long SQLite waits on a locked database before giving up.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Isolated in-memory database for tests.
    ///
    /// The database lives as long as its single connection, so the pool is
    /// pinned to exactly one connection that never idles out.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY)
    }
}

/// Behaviour of the units of work built on top of the pool.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Upper bound on a single checkout, cancellation or report.
    pub unit_of_work_timeout: Duration,

    /// Leading segment of generated transaction numbers.
    pub transaction_number_prefix: String,

    /// Reference time zone for calendar-day reports.
    pub utc_offset: FixedOffset,

    /// Unit cost used for profit figures.
    pub cost_basis: CostBasis,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            unit_of_work_timeout: Duration::from_secs(10),
            transaction_number_prefix: cashdesk_core::TRANSACTION_NUMBER_PREFIX.to_string(),
            utc_offset: Utc.fix(),
            cost_basis: CostBasis::Current,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing access to the ledger, store and reports.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    options: StoreOptions,
}

impl Database {
    /// Opens the pool and, if configured, runs migrations.
    ///
    /// File databases are opened in WAL mode with NORMAL synchronous and
    /// foreign keys on. The file is created if missing.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        }
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

        debug!("Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout);
        pool_options = if config.is_in_memory() {
            pool_options.idle_timeout(None).max_lifetime(None)
        } else {
            pool_options.idle_timeout(Some(config.idle_timeout))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            options: StoreOptions::default(),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Replaces the unit-of-work options.
    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// For queries not covered by a repository.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn inventory(&self) -> InventoryLedger {
        InventoryLedger::new(self.pool.clone())
    }

    pub fn transactions(&self) -> TransactionStore {
        TransactionStore::new(self.pool.clone(), &self.options)
    }

    pub fn reports(&self) -> ReportingEngine {
        ReportingEngine::new(self.pool.clone(), &self.options)
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn settings(&self) -> ShopSettingsRepository {
        ShopSettingsRepository::new(self.pool.clone())
    }

    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
