//! End-to-end stock consistency across checkout, cancellation and reports,
//! run against a file-backed database with several pooled connections.

use std::collections::HashSet;

use cashdesk_core::{
    CoreError, NewProduct, NewTransaction, NewTransactionItem, PaymentType, Product, ReportRange,
    TransactionStatus,
};
use cashdesk_db::{Database, DbConfig, DbError};
use tempfile::TempDir;

async fn file_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("cashdesk.db")).max_connections(8);
    let db = Database::new(config).await.unwrap();
    (dir, db)
}

async fn stocked(db: &Database, sku: &str, stock: i64, price: i64, cost: i64) -> Product {
    db.products()
        .insert(&NewProduct {
            sku: sku.to_string(),
            name: format!("Item {sku}"),
            description: None,
            barcode: None,
            price_cents: price,
            cost_cents: cost,
            stock_quantity: stock,
            min_stock_level: 0,
            category_id: None,
        })
        .await
        .unwrap()
}

fn header(total_cents: i64) -> NewTransaction {
    NewTransaction {
        customer_id: None,
        user_id: "cashier-1".to_string(),
        total_cents,
        discount_cents: 0,
        tax_cents: 0,
        payment_type: PaymentType::Cash,
        notes: None,
    }
}

async fn stock(db: &Database, product: &Product) -> i64 {
    db.inventory().stock_of(&product.id).await.unwrap()
}

async fn transaction_count(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
        .fetch_one(db.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn sale_then_cancel_restores_stock_exactly_once() {
    let (_dir, db) = file_db().await;
    let widget = stocked(&db, "WIDGET", 10, 1000, 500).await;

    let sale = db
        .transactions()
        .create_transaction(&header(3000), &[NewTransactionItem::new(&widget.id, 3, 1000)])
        .await
        .unwrap();
    assert_eq!(sale.transaction.status, TransactionStatus::Completed);
    assert_eq!(sale.items[0].unit_cost_cents, 500);
    assert_eq!(stock(&db, &widget).await, 7);

    let today = db.reports().daily_revenue(None).await.unwrap();
    assert_eq!(today.revenue.cents(), 3000);

    db.transactions()
        .cancel_transaction(&sale.transaction.id)
        .await
        .unwrap();
    assert_eq!(stock(&db, &widget).await, 10);

    let stored = db
        .transactions()
        .get_by_id(&sale.transaction.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TransactionStatus::Cancelled);

    let again = db.transactions().cancel_transaction(&sale.transaction.id).await;
    assert!(matches!(
        again,
        Err(DbError::Core(CoreError::AlreadyCancelled(_)))
    ));
    assert_eq!(stock(&db, &widget).await, 10);

    let today = db.reports().daily_revenue(None).await.unwrap();
    assert!(today.revenue.is_zero());
}

#[tokio::test]
async fn repeated_product_lines_reserve_their_sum() {
    let (_dir, db) = file_db().await;
    let short = stocked(&db, "SPLIT-SHORT", 6, 100, 40).await;
    let exact = stocked(&db, "SPLIT-EXACT", 7, 100, 40).await;

    // 3 + 4 > 6: the second line fails after the first already reserved.
    let result = db
        .transactions()
        .create_transaction(
            &header(700),
            &[
                NewTransactionItem::new(&short.id, 3, 100),
                NewTransactionItem::new(&short.id, 4, 100),
            ],
        )
        .await;
    assert!(
        matches!(
            result,
            Err(DbError::Core(CoreError::InsufficientStock { requested: 4, .. }))
        ),
        "got {result:?}"
    );
    assert_eq!(stock(&db, &short).await, 6);
    assert_eq!(transaction_count(&db).await, 0);

    let sale = db
        .transactions()
        .create_transaction(
            &header(700),
            &[
                NewTransactionItem::new(&exact.id, 3, 100),
                NewTransactionItem::new(&exact.id, 4, 100),
            ],
        )
        .await
        .unwrap();
    assert_eq!(sale.items.len(), 2);
    let sold: i64 = sale.items.iter().map(|item| item.quantity).sum();
    assert_eq!(sold, 7);
    assert_eq!(stock(&db, &exact).await, 0);

    db.transactions()
        .cancel_transaction(&sale.transaction.id)
        .await
        .unwrap();
    assert_eq!(stock(&db, &exact).await, 7);
}

#[tokio::test]
async fn shortfall_leaves_no_trace() {
    let (_dir, db) = file_db().await;
    let gadget = stocked(&db, "GADGET", 2, 1000, 400).await;

    let result = db
        .transactions()
        .create_transaction(&header(5000), &[NewTransactionItem::new(&gadget.id, 5, 1000)])
        .await;

    match result {
        Err(DbError::Core(CoreError::InsufficientStock {
            sku,
            available,
            requested,
            ..
        })) => {
            assert_eq!(sku, "GADGET");
            assert_eq!(available, 2);
            assert_eq!(requested, 5);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(stock(&db, &gadget).await, 2);
    assert_eq!(transaction_count(&db).await, 0);
}

#[tokio::test]
async fn failing_middle_item_rolls_back_earlier_reservations() {
    let (_dir, db) = file_db().await;
    let a = stocked(&db, "A", 5, 100, 50).await;
    let b = stocked(&db, "B", 1, 100, 50).await;
    let c = stocked(&db, "C", 5, 100, 50).await;

    let items = [
        NewTransactionItem::new(&a.id, 2, 100),
        NewTransactionItem::new(&b.id, 4, 100),
        NewTransactionItem::new(&c.id, 1, 100),
    ];
    let result = db.transactions().create_transaction(&header(700), &items).await;
    assert!(matches!(
        result,
        Err(DbError::Core(CoreError::InsufficientStock { .. }))
    ));

    assert_eq!(stock(&db, &a).await, 5);
    assert_eq!(stock(&db, &b).await, 1);
    assert_eq!(stock(&db, &c).await, 5);
    assert_eq!(transaction_count(&db).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_never_oversell() {
    let (_dir, db) = file_db().await;
    let scarce = stocked(&db, "SCARCE", 10, 250, 100).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let db = db.clone();
        let product_id = scarce.id.clone();
        handles.push(tokio::spawn(async move {
            db.transactions()
                .create_transaction(&header(250), &[NewTransactionItem::new(product_id, 1, 250)])
                .await
        }));
    }

    let mut sold = 0;
    let mut refused = 0;
    let mut numbers = HashSet::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(sale) => {
                sold += 1;
                numbers.insert(sale.transaction.transaction_number);
            }
            Err(DbError::Core(CoreError::InsufficientStock { .. })) => refused += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(sold, 10);
    assert_eq!(refused, 10);
    assert_eq!(numbers.len(), 10);
    assert_eq!(stock(&db, &scarce).await, 0);
    assert_eq!(transaction_count(&db).await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_cancellations_restore_once() {
    let (_dir, db) = file_db().await;
    let item = stocked(&db, "RACE", 10, 500, 200).await;

    let sale = db
        .transactions()
        .create_transaction(&header(2000), &[NewTransactionItem::new(&item.id, 4, 500)])
        .await
        .unwrap();
    assert_eq!(stock(&db, &item).await, 6);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let db = db.clone();
        let id = sale.transaction.id.clone();
        handles.push(tokio::spawn(async move {
            db.transactions().cancel_transaction(&id).await
        }));
    }

    let mut accepted = 0;
    let mut already = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => accepted += 1,
            Err(DbError::Core(CoreError::AlreadyCancelled(_))) => already += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(already, 3);
    assert_eq!(stock(&db, &item).await, 10);
}

#[tokio::test]
async fn profit_excludes_cancelled_sales() {
    let (_dir, db) = file_db().await;
    let p = stocked(&db, "PROFIT", 50, 1000, 600).await;

    let kept = db
        .transactions()
        .create_transaction(&header(2000), &[NewTransactionItem::new(&p.id, 2, 1000)])
        .await
        .unwrap();
    let voided = db
        .transactions()
        .create_transaction(&header(5000), &[NewTransactionItem::new(&p.id, 5, 1000)])
        .await
        .unwrap();
    db.transactions()
        .cancel_transaction(&voided.transaction.id)
        .await
        .unwrap();

    let today = db.reports().daily_revenue(None).await.unwrap();
    let range = ReportRange::new(today.date, today.date).unwrap();

    let profit = db.reports().profit_report(range).await.unwrap();
    assert_eq!(profit.total_cost.cents(), 1200);
    assert_eq!(profit.total_profit.cents(), 800);
    assert!((profit.profit_margin - 0.4).abs() < 1e-9);

    let rows = db.reports().sales_report(range).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_transactions, 1);
    assert_eq!(rows[0].total_sales.cents(), kept.transaction.total_cents);
    assert_eq!(stock(&db, &p).await, 48);
}
