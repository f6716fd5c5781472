//! # Inventory Ledger
//!
//! Sole owner of stock mutation during sales.
//!
//! ## Compare-and-Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve(COKE-330, 5)                                                   │
//! │                                                                         │
//! │  UPDATE products                                                        │
//! │     SET stock_quantity = stock_quantity - 5                             │
//! │   WHERE id = ? AND stock_quantity >= 5      ◄── guard and write are     │
//! │  RETURNING ...                                  one statement           │
//! │       │                                                                 │
//! │       ├── 1 row  → reserved                                             │
//! │       └── 0 rows → look the product up:                                 │
//! │                     missing  → ProductNotFound                          │
//! │                     present  → InsufficientStock { available, ... }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite serialises writers, so two concurrent reservations on the same
//! product can never both pass the guard when their sum exceeds stock.
//!
//! The free functions take the caller's connection so checkout and
//! cancellation can join their own transaction. [`InventoryLedger`] wraps
//! them for standalone use.

use cashdesk_core::validation::validate_quantity;
use cashdesk_core::CoreError;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::timestamp;

/// Result of a successful reservation.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Reservation {
    pub product_id: String,
    pub sku: String,
    /// Stock left after the decrement.
    pub stock_quantity: i64,
    /// Product cost at the moment of reservation.
    pub cost_cents: i64,
}

/// Atomically takes `quantity` units of `product_id` out of stock.
pub async fn reserve(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> DbResult<Reservation> {
    validate_quantity(quantity)?;

    let reserved: Option<Reservation> = sqlx::query_as(
        r#"
        UPDATE products
           SET stock_quantity = stock_quantity - ?2,
               updated_at = ?3
         WHERE id = ?1 AND stock_quantity >= ?2
        RETURNING id AS product_id, sku, stock_quantity, cost_cents
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(timestamp::encode(timestamp::now()))
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(reservation) = reserved {
        debug!(
            product_id,
            quantity,
            remaining = reservation.stock_quantity,
            "Stock reserved"
        );
        return Ok(reservation);
    }

    let current: Option<(String, i64)> =
        sqlx::query_as("SELECT sku, stock_quantity FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    match current {
        None => Err(CoreError::ProductNotFound(product_id.to_string()).into()),
        Some((sku, available)) => {
            debug!(product_id, sku = %sku, available, quantity, "Reservation refused");
            Err(CoreError::insufficient_stock(product_id, sku, available, quantity).into())
        }
    }
}

/// Atomically puts `quantity` units of `product_id` back into stock.
///
/// Callers only restore quantities previously reserved for a specific line
/// item; this function does not check that.
pub async fn restore(conn: &mut SqliteConnection, product_id: &str, quantity: i64) -> DbResult<i64> {
    validate_quantity(quantity)?;

    let restored: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
           SET stock_quantity = stock_quantity + ?2,
               updated_at = ?3
         WHERE id = ?1
        RETURNING stock_quantity
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(timestamp::encode(timestamp::now()))
    .fetch_optional(&mut *conn)
    .await?;

    match restored {
        Some(stock) => {
            debug!(product_id, quantity, stock, "Stock restored");
            Ok(stock)
        }
        None => Err(CoreError::ProductNotFound(product_id.to_string()).into()),
    }
}

/// Pool-backed ledger for stock operations outside a checkout.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLedger { pool }
    }

    pub async fn reserve(&self, product_id: &str, quantity: i64) -> DbResult<Reservation> {
        let mut conn = self.pool.acquire().await?;
        reserve(&mut *conn, product_id, quantity).await
    }

    pub async fn restore(&self, product_id: &str, quantity: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        restore(&mut *conn, product_id, quantity).await
    }

    /// Current stock, or `ProductNotFound`.
    pub async fn stock_of(&self, product_id: &str) -> DbResult<i64> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        stock.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
