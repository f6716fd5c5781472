//! # Cashdesk
//!
//! Request layer of the Cashdesk point-of-sale backend.
//!
//! ## Module Organization
//! ```text
//! cashdesk/
//! ├── lib.rs          ◄─── You are here (logging and database bootstrap)
//! ├── config.rs       ◄─── Layered configuration (defaults, TOML, env)
//! ├── service.rs      ◄─── PosService: checkout, cancellation, reports
//! ├── error.rs        ◄─── ApiError returned by every operation
//! └── main.rs         ◄─── `cashdesk` CLI
//! ```

pub mod config;
pub mod error;
pub mod service;

use cashdesk_db::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::CashdeskConfig;

pub use error::{ApiError, ErrorCode};
pub use service::PosService;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=cashdesk_db=trace` - Trace the database layer only
/// - Default: the `[logging] filter` setting
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Opens the configured database and wraps it in a [`PosService`].
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Resolve database path (config, else platform data directory)       │
/// │  2. Create the parent directory if missing                             │
/// │  3. Connect (WAL, foreign keys, busy timeout) and run migrations       │
/// │  4. Apply checkout and reporting options                               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn connect(config: &CashdeskConfig) -> anyhow::Result<PosService> {
    let db_config = config.db_config();
    if let Some(parent) = db_config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    info!(path = %db_config.database_path.display(), "Opening database");
    let db = Database::new(db_config)
        .await?
        .with_options(config.store_options()?);

    Ok(PosService::new(db))
}
