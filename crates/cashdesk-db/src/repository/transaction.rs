//! # Transaction Store
//!
//! Checkout and cancellation as single SQLite transactions.
//!
//! ## Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    INSERT transactions (status = completed)   ◄── first statement is a  │
//! │       │  number taken? new number, retry once     write: lock acquired  │
//! │       ▼                                                                 │
//! │    for each item:                                                       │
//! │       reserve(product, qty) ── InsufficientStock ──► ROLLBACK           │
//! │       INSERT transaction_items (price + cost snapshot)                  │
//! │       ▼                                                                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cancellation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE transactions SET status = cancelled                           │
//! │     WHERE id = ? AND status != cancelled     ◄── exactly-once guard     │
//! │       │ 0 rows → NotFound | AlreadyCancelled → ROLLBACK                 │
//! │       ▼                                                                 │
//! │    restore(product, qty) for every item                                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error, or the unit-of-work timeout, drops the open transaction and
//! SQLite rolls every statement back. A cancelled transaction can never be
//! restored twice because a retry finds the guard already tripped.

use cashdesk_core::validation::{validate_header, validate_item, validate_items};
use cashdesk_core::{
    CheckoutTotals, CoreError, NewTransaction, NewTransactionItem, Transaction,
    TransactionItem, TransactionStatus, TransactionWithItems,
};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::StoreOptions;
use crate::repository::{bounded, inventory};
use crate::timestamp;

const TRANSACTION_COLUMNS: &str = "id, transaction_number, customer_id, user_id, total_cents, \
     discount_cents, tax_cents, payment_type, status, notes, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, transaction_id, product_id, quantity, unit_price_cents, \
     total_price_cents, unit_cost_cents, created_at";

/// Fresh numbers tried after the first one collides.
const NUMBER_RETRIES: u32 = 1;

/// Produces transaction numbers from a prefix.
pub type NumberGenerator = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Owns transactions, their line items and the status state machine.
#[derive(Clone)]
pub struct TransactionStore {
    pool: SqlitePool,
    timeout: Duration,
    prefix: String,
    next_number: NumberGenerator,
}

impl fmt::Debug for TransactionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionStore")
            .field("timeout", &self.timeout)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl TransactionStore {
    pub fn new(pool: SqlitePool, options: &StoreOptions) -> Self {
        TransactionStore {
            pool,
            timeout: options.unit_of_work_timeout,
            prefix: options.transaction_number_prefix.clone(),
            next_number: Arc::new(|prefix: &str| generate_transaction_number(prefix, Utc::now())),
        }
    }

    /// Replaces the transaction-number source.
    pub fn with_number_generator(mut self, generator: NumberGenerator) -> Self {
        self.next_number = generator;
        self
    }

    // =========================================================================
    // Units of work
    // =========================================================================

    /// Records a completed sale, reserving stock for every item.
    ///
    /// All or nothing: if any reservation fails, no header, no item and no
    /// stock decrement is committed and the first failure is returned.
    pub async fn create_transaction(
        &self,
        header: &NewTransaction,
        items: &[NewTransactionItem],
    ) -> DbResult<TransactionWithItems> {
        validate_header(header)?;
        validate_items(items)?;

        if !CheckoutTotals::reconciles(items, header)? {
            let subtotal = CheckoutTotals::subtotal(items)?;
            warn!(
                user_id = %header.user_id,
                subtotal = %subtotal,
                tax = header.tax_cents,
                discount = header.discount_cents,
                total = header.total_cents,
                "Header total does not reconcile with items"
            );
        }

        let created = bounded(self.timeout, "create_transaction", async {
            let mut tx = self.pool.begin().await?;

            let transaction = self
                .insert_header(&mut tx, header, TransactionStatus::Completed)
                .await?;

            let mut persisted = Vec::with_capacity(items.len());
            for item in items {
                let reservation = inventory::reserve(&mut tx, &item.product_id, item.quantity).await?;
                let line =
                    insert_item(&mut tx, &transaction.id, item, reservation.cost_cents).await?;
                persisted.push(line);
            }

            tx.commit().await?;

            Ok(TransactionWithItems {
                transaction,
                items: persisted,
            })
        })
        .await;

        match &created {
            Ok(created) => info!(
                transaction_id = %created.transaction.id,
                transaction_number = %created.transaction.transaction_number,
                items = created.items.len(),
                total = created.transaction.total_cents,
                "Transaction completed"
            ),
            Err(e) => warn!(user_id = %header.user_id, error = %e, "Checkout rolled back"),
        }
        created
    }

    /// Cancels a transaction and puts every item's quantity back in stock.
    ///
    /// Fails with `TransactionNotFound` or `AlreadyCancelled`; in both cases
    /// nothing is written.
    pub async fn cancel_transaction(&self, id: &str) -> DbResult<()> {
        let result = bounded(self.timeout, "cancel_transaction", async {
            let mut tx = self.pool.begin().await?;

            let flipped = sqlx::query(
                r#"
                UPDATE transactions
                   SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status != ?1
                "#,
            )
            .bind(TransactionStatus::Cancelled)
            .bind(timestamp::encode(timestamp::now()))
            .bind(id)
            .execute(&mut *tx)
            .await?;

            if flipped.rows_affected() == 0 {
                return Err(self
                    .rejected_transition(&mut tx, id, TransactionStatus::Cancelled)
                    .await);
            }

            let items = fetch_items(&mut tx, id).await?;
            for item in &items {
                inventory::restore(&mut tx, &item.product_id, item.quantity).await?;
            }

            tx.commit().await?;
            Ok(items.len())
        })
        .await;

        match result {
            Ok(restored) => {
                info!(transaction_id = id, restored_items = restored, "Transaction cancelled");
                Ok(())
            }
            Err(e) => {
                warn!(transaction_id = id, error = %e, "Cancellation rejected");
                Err(e)
            }
        }
    }

    /// Appends a line item to an existing, non-cancelled transaction.
    ///
    /// Stock is reserved in the same unit of work, so cancellation restores
    /// items added this way exactly like checkout items.
    pub async fn add_item(
        &self,
        transaction_id: &str,
        item: &NewTransactionItem,
    ) -> DbResult<TransactionItem> {
        validate_item(item)?;

        bounded(self.timeout, "add_item", async {
            let mut tx = self.pool.begin().await?;

            let touched = sqlx::query(
                "UPDATE transactions SET updated_at = ?1 WHERE id = ?2 AND status != ?3",
            )
            .bind(timestamp::encode(timestamp::now()))
            .bind(transaction_id)
            .bind(TransactionStatus::Cancelled)
            .execute(&mut *tx)
            .await?;

            if touched.rows_affected() == 0 {
                let status = fetch_status(&mut tx, transaction_id).await?;
                return Err(match status {
                    None => CoreError::TransactionNotFound(transaction_id.to_string()),
                    Some(_) => CoreError::AlreadyCancelled(transaction_id.to_string()),
                }
                .into());
            }

            let reservation = inventory::reserve(&mut tx, &item.product_id, item.quantity).await?;
            let line = insert_item(&mut tx, transaction_id, item, reservation.cost_cents).await?;

            tx.commit().await?;

            debug!(
                transaction_id,
                product_id = %item.product_id,
                quantity = item.quantity,
                "Item added"
            );
            Ok(line)
        })
        .await
    }

    /// Inserts a header in `pending` status with no items and no stock effect.
    pub async fn create_pending(&self, header: &NewTransaction) -> DbResult<Transaction> {
        validate_header(header)?;

        bounded(self.timeout, "create_pending", async {
            let mut tx = self.pool.begin().await?;
            let transaction = self
                .insert_header(&mut tx, header, TransactionStatus::Pending)
                .await?;
            tx.commit().await?;

            info!(transaction_id = %transaction.id, "Pending transaction recorded");
            Ok(transaction)
        })
        .await
    }

    /// Moves a `pending` transaction to `completed`.
    pub async fn complete(&self, id: &str) -> DbResult<Transaction> {
        bounded(self.timeout, "complete", async {
            let mut tx = self.pool.begin().await?;

            let moved = sqlx::query(
                "UPDATE transactions SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
            )
            .bind(TransactionStatus::Completed)
            .bind(timestamp::encode(timestamp::now()))
            .bind(id)
            .bind(TransactionStatus::Pending)
            .execute(&mut *tx)
            .await?;

            if moved.rows_affected() == 0 {
                return Err(self
                    .rejected_transition(&mut tx, id, TransactionStatus::Completed)
                    .await);
            }

            let transaction = fetch_transaction(&mut tx, id)
                .await?
                .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;
            tx.commit().await?;

            info!(transaction_id = id, "Transaction completed");
            Ok(transaction)
        })
        .await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let mut conn = self.pool.acquire().await?;
        fetch_transaction(&mut conn, id).await
    }

    /// Line items in insertion order.
    pub async fn get_items(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, transaction_id).await
    }

    pub async fn get_with_items(&self, id: &str) -> DbResult<Option<TransactionWithItems>> {
        let mut conn = self.pool.acquire().await?;
        let Some(transaction) = fetch_transaction(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = fetch_items(&mut conn, id).await?;
        Ok(Some(TransactionWithItems { transaction, items }))
    }

    /// Most recent transactions first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             ORDER BY created_at DESC, id DESC LIMIT ?1"
        );
        let transactions = sqlx::query_as::<_, Transaction>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(transactions)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Inserts a header under a generated number, retrying on collision.
    ///
    /// A failed INSERT only aborts its own statement, so the retry runs in
    /// the same SQLite transaction.
    async fn insert_header(
        &self,
        conn: &mut SqliteConnection,
        header: &NewTransaction,
        status: TransactionStatus,
    ) -> DbResult<Transaction> {
        let mut retries = 0;
        loop {
            let number = (self.next_number)(&self.prefix);
            match insert_header_row(conn, &number, header, status).await {
                Ok(transaction) => return Ok(transaction),
                Err(e) if e.is_unique_violation_on("transaction_number") => {
                    if retries >= NUMBER_RETRIES {
                        return Err(CoreError::TransactionNumberCollision(number).into());
                    }
                    retries += 1;
                    warn!(transaction_number = %number, "Transaction number taken, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Explains why a guarded status update matched no row.
    async fn rejected_transition(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        target: TransactionStatus,
    ) -> DbError {
        match fetch_status(conn, id).await {
            Err(e) => e,
            Ok(None) => CoreError::TransactionNotFound(id.to_string()).into(),
            Ok(Some(current)) => match current.transition(id, target) {
                Err(e) => e.into(),
                Ok(_) => DbError::Internal(format!(
                    "status guard for {id} matched no row while {current} -> {target} is allowed"
                )),
            },
        }
    }
}

async fn insert_header_row(
    conn: &mut SqliteConnection,
    number: &str,
    header: &NewTransaction,
    status: TransactionStatus,
) -> DbResult<Transaction> {
    let now = timestamp::now();
    let transaction = Transaction {
        id: Uuid::new_v4().to_string(),
        transaction_number: number.to_string(),
        customer_id: header.customer_id.clone(),
        user_id: header.user_id.trim().to_string(),
        total_cents: header.total_cents,
        discount_cents: header.discount_cents,
        tax_cents: header.tax_cents,
        payment_type: header.payment_type,
        status,
        notes: header.notes.clone(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, transaction_number, customer_id, user_id,
            total_cents, discount_cents, tax_cents,
            payment_type, status, notes, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.transaction_number)
    .bind(&transaction.customer_id)
    .bind(&transaction.user_id)
    .bind(transaction.total_cents)
    .bind(transaction.discount_cents)
    .bind(transaction.tax_cents)
    .bind(transaction.payment_type)
    .bind(transaction.status)
    .bind(&transaction.notes)
    .bind(timestamp::encode(transaction.created_at))
    .bind(timestamp::encode(transaction.updated_at))
    .execute(&mut *conn)
    .await?;

    debug!(
        transaction_id = %transaction.id,
        transaction_number = %transaction.transaction_number,
        %status,
        "Header inserted"
    );
    Ok(transaction)
}

async fn insert_item(
    conn: &mut SqliteConnection,
    transaction_id: &str,
    item: &NewTransactionItem,
    unit_cost_cents: i64,
) -> DbResult<TransactionItem> {
    let total_price_cents = item.line_total()?.cents();
    let line = TransactionItem {
        id: Uuid::new_v4().to_string(),
        transaction_id: transaction_id.to_string(),
        product_id: item.product_id.clone(),
        quantity: item.quantity,
        unit_price_cents: item.unit_price_cents,
        total_price_cents,
        unit_cost_cents,
        created_at: timestamp::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO transaction_items (
            id, transaction_id, product_id, quantity,
            unit_price_cents, total_price_cents, unit_cost_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&line.id)
    .bind(&line.transaction_id)
    .bind(&line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price_cents)
    .bind(line.total_price_cents)
    .bind(line.unit_cost_cents)
    .bind(timestamp::encode(line.created_at))
    .execute(&mut *conn)
    .await?;

    Ok(line)
}

async fn fetch_transaction(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Transaction>> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");
    let transaction = sqlx::query_as::<_, Transaction>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(transaction)
}

async fn fetch_items(conn: &mut SqliteConnection, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE transaction_id = ?1 \
         ORDER BY created_at, rowid"
    );
    let items = sqlx::query_as::<_, TransactionItem>(&sql)
        .bind(transaction_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(items)
}

async fn fetch_status(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<TransactionStatus>> {
    let status = sqlx::query_scalar("SELECT status FROM transactions WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(status)
}

/// `<prefix>-<UTC yyyymmddHHMMSSmmm>-<9 base-36 chars>`.
///
/// The suffix carries about 46 random bits, so two numbers minted in the
/// same millisecond collide with negligible probability.
pub fn generate_transaction_number(prefix: &str, at: DateTime<Utc>) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut random = Uuid::new_v4().as_u128();
    let suffix: String = (0..9)
        .map(|_| {
            let c = ALPHABET[(random % 36) as usize] as char;
            random /= 36;
            c
        })
        .collect();

    format!("{prefix}-{}-{suffix}", at.format("%Y%m%d%H%M%S%3f"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{product, test_db};
    use cashdesk_core::{PaymentType, ValidationError};

    fn header(total_cents: i64) -> NewTransaction {
        NewTransaction {
            customer_id: None,
            user_id: "cashier-1".to_string(),
            total_cents,
            discount_cents: 0,
            tax_cents: 0,
            payment_type: PaymentType::Card,
            notes: None,
        }
    }

    #[test]
    fn test_transaction_number_format() {
        let at = DateTime::parse_from_rfc3339("2024-03-10T14:05:09.042Z")
            .unwrap()
            .with_timezone(&Utc);
        let number = generate_transaction_number("TXN", at);

        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TXN");
        assert_eq!(parts[1], "20240310140509042");
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(number, generate_transaction_number("TXN", at));
    }

    #[tokio::test]
    async fn test_checkout_snapshots_price_and_cost() {
        let db = test_db().await;
        let p = product(&db, "COFFEE", 10, 350, 120).await;
        let store = db.transactions();

        let created = store
            .create_transaction(&header(700), &[NewTransactionItem::new(&p.id, 2, 350)])
            .await
            .unwrap();

        assert_eq!(created.transaction.status, TransactionStatus::Completed);
        assert!(created.transaction.transaction_number.starts_with("TXN-"));
        assert_eq!(created.items.len(), 1);
        assert_eq!(created.items[0].total_price_cents, 700);
        assert_eq!(created.items[0].unit_cost_cents, 120);

        let stored = store.get_with_items(&created.transaction.id).await.unwrap().unwrap();
        assert_eq!(stored, created);
        assert_eq!(db.inventory().stock_of(&p.id).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_checkout_rejects_invalid_input() {
        let db = test_db().await;
        let p = product(&db, "TEA", 10, 200, 50).await;
        let store = db.transactions();

        let err = store
            .create_transaction(&header(200), &[NewTransactionItem::new(&p.id, 0, 200)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

        let err = store.create_transaction(&header(200), &[]).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
        assert!(store.list(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_rejects_amounts_past_the_cap() {
        let db = test_db().await;
        let p = product(&db, "GOLD", 100, 200, 50).await;
        let store = db.transactions();

        let huge_price = NewTransactionItem::new(&p.id, 2, 5_000_000_000_000_000_00);
        let err = store
            .create_transaction(&header(200), &[huge_price])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let err = store
            .create_transaction(
                &header(cashdesk_core::MAX_AMOUNT_CENTS + 1),
                &[NewTransactionItem::new(&p.id, 1, 200)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

        assert!(store.list(10).await.unwrap().is_empty());
        assert_eq!(db.inventory().stock_of(&p.id).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_unreconciled_total_is_accepted() {
        let db = test_db().await;
        let p = product(&db, "CAKE", 3, 500, 200).await;

        let created = db
            .transactions()
            .create_transaction(&header(123), &[NewTransactionItem::new(&p.id, 1, 500)])
            .await
            .unwrap();
        assert_eq!(created.transaction.total_cents, 123);
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back() {
        let db = test_db().await;
        let p = product(&db, "JAM", 5, 300, 100).await;
        let store = db.transactions();

        let items = [
            NewTransactionItem::new(&p.id, 1, 300),
            NewTransactionItem::new("no-such-product", 1, 300),
        ];
        let err = store.create_transaction(&header(600), &items).await.unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::ProductNotFound(_))));
        assert_eq!(db.inventory().stock_of(&p.id).await.unwrap(), 5);
        assert!(store.list(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_number_collision_retries_once() {
        let db = test_db().await;
        let p = product(&db, "PEN", 10, 100, 30).await;

        let fixed = db
            .transactions()
            .with_number_generator(Arc::new(|_: &str| "TXN-FIXED".to_string()));
        fixed
            .create_transaction(&header(100), &[NewTransactionItem::new(&p.id, 1, 100)])
            .await
            .unwrap();

        // both attempts collide
        let err = fixed
            .create_transaction(&header(100), &[NewTransactionItem::new(&p.id, 1, 100)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::TransactionNumberCollision(_))
        ));
        assert_eq!(db.inventory().stock_of(&p.id).await.unwrap(), 9);

        // first attempt collides, the regenerated number succeeds
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let flaky = db.transactions().with_number_generator(Arc::new(move |_: &str| {
            if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                "TXN-FIXED".to_string()
            } else {
                "TXN-FRESH".to_string()
            }
        }));
        let created = flaky
            .create_transaction(&header(100), &[NewTransactionItem::new(&p.id, 1, 100)])
            .await
            .unwrap();
        assert_eq!(created.transaction.transaction_number, "TXN-FRESH");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancel_missing_and_twice() {
        let db = test_db().await;
        let p = product(&db, "SALT", 4, 90, 20).await;
        let store = db.transactions();

        assert!(matches!(
            store.cancel_transaction("missing").await,
            Err(DbError::Core(CoreError::TransactionNotFound(_)))
        ));

        let created = store
            .create_transaction(&header(180), &[NewTransactionItem::new(&p.id, 2, 90)])
            .await
            .unwrap();
        store.cancel_transaction(&created.transaction.id).await.unwrap();
        assert!(matches!(
            store.cancel_transaction(&created.transaction.id).await,
            Err(DbError::Core(CoreError::AlreadyCancelled(_)))
        ));
        assert_eq!(db.inventory().stock_of(&p.id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_add_item_reserves_and_cancel_restores_it() {
        let db = test_db().await;
        let a = product(&db, "RICE", 10, 400, 250).await;
        let b = product(&db, "BEANS", 10, 300, 150).await;
        let store = db.transactions();

        let created = store
            .create_transaction(&header(400), &[NewTransactionItem::new(&a.id, 1, 400)])
            .await
            .unwrap();
        let added = store
            .add_item(&created.transaction.id, &NewTransactionItem::new(&b.id, 3, 300))
            .await
            .unwrap();
        assert_eq!(added.total_price_cents, 900);
        assert_eq!(added.unit_cost_cents, 150);
        assert_eq!(db.inventory().stock_of(&b.id).await.unwrap(), 7);
        assert_eq!(store.get_items(&created.transaction.id).await.unwrap().len(), 2);

        store.cancel_transaction(&created.transaction.id).await.unwrap();
        assert_eq!(db.inventory().stock_of(&a.id).await.unwrap(), 10);
        assert_eq!(db.inventory().stock_of(&b.id).await.unwrap(), 10);

        assert!(matches!(
            store
                .add_item(&created.transaction.id, &NewTransactionItem::new(&b.id, 1, 300))
                .await,
            Err(DbError::Core(CoreError::AlreadyCancelled(_)))
        ));
        assert!(matches!(
            store
                .add_item("missing", &NewTransactionItem::new(&b.id, 1, 300))
                .await,
            Err(DbError::Core(CoreError::TransactionNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_add_item_insufficient_stock_leaves_nothing() {
        let db = test_db().await;
        let p = product(&db, "OIL", 1, 800, 500).await;
        let store = db.transactions();

        let pending = store.create_pending(&header(800)).await.unwrap();
        let err = store
            .add_item(&pending.id, &NewTransactionItem::new(&p.id, 2, 800))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 1, requested: 2, .. })
        ));
        assert!(store.get_items(&pending.id).await.unwrap().is_empty());
        assert_eq!(db.inventory().stock_of(&p.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_pending_lifecycle() {
        let db = test_db().await;
        let store = db.transactions();

        let pending = store.create_pending(&header(500)).await.unwrap();
        assert_eq!(pending.status, TransactionStatus::Pending);

        let completed = store.complete(&pending.id).await.unwrap();
        assert_eq!(completed.status, TransactionStatus::Completed);

        let err = store.complete(&pending.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InvalidStatusTransition {
                from: TransactionStatus::Completed,
                to: TransactionStatus::Completed,
                ..
            })
        ));

        let other = store.create_pending(&header(500)).await.unwrap();
        store.cancel_transaction(&other.id).await.unwrap();
        assert!(matches!(
            store.complete(&other.id).await,
            Err(DbError::Core(CoreError::InvalidStatusTransition { .. }))
        ));
        assert!(matches!(
            store.complete("missing").await,
            Err(DbError::Core(CoreError::TransactionNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let db = test_db().await;
        let store = db.transactions();

        let first = store.create_pending(&header(100)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = store.create_pending(&header(200)).await.unwrap();

        let listed = store.list(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert_eq!(store.list(1).await.unwrap().len(), 1);
    }
}
