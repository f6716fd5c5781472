//! # Repositories
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   TransactionStore ─────uses────► inventory::{reserve, restore}        │
//! │   (units of work)                 (same SQLite transaction)            │
//! │          │                                                              │
//! │          ▼ committed rows                                               │
//! │   ReportingEngine (read-only)                                          │
//! │                                                                         │
//! │   ProductRepository, ShopSettingsRepository (catalog and settings)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`InventoryLedger`] - the only writer of `products.stock_quantity` during sales
//! - [`TransactionStore`] - checkout, cancellation, line items, status machine
//! - [`ReportingEngine`] - daily revenue, sales and profit reports
//! - [`ProductRepository`] - catalog CRUD
//! - [`ShopSettingsRepository`] - singleton shop settings row

pub mod inventory;
pub mod product;
pub mod report;
pub mod settings;
pub mod transaction;

pub use inventory::InventoryLedger;
pub use product::ProductRepository;
pub use report::ReportingEngine;
pub use settings::ShopSettingsRepository;
pub use transaction::TransactionStore;

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{DbError, DbResult};

/// Runs one unit of work with an upper time bound.
///
/// On expiry the future is dropped, which rolls back any open SQLite
/// transaction it holds, and a retryable [`DbError::Timeout`] is returned.
pub(crate) async fn bounded<T, F>(limit: Duration, operation: &'static str, work: F) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => {
            let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            warn!(operation, millis, "Unit of work timed out");
            Err(DbError::Timeout { millis })
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: DbResult<()> = bounded(Duration::from_millis(10), "sleep", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, DbError::Timeout { millis: 10 }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let value = bounded(Duration::from_secs(1), "ready", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
