//! # Product Repository
//!
//! Catalog maintenance. Stock changes made here are corrections only;
//! sales go through the inventory ledger.
//!
//! ## History Rules
//! ```text
//!   product has transaction items?
//!        │
//!        ├── no  → SKU editable, delete removes the row
//!        └── yes → SKU locked, delete deactivates (is_active = 0)
//! ```

use cashdesk_core::validation::{
    validate_cost_cents, validate_min_stock_level, validate_new_product, validate_price_cents,
    validate_product_name, validate_sku, validate_stock_quantity,
};
use cashdesk_core::{CoreError, DeleteOutcome, NewProduct, Product, ProductPatch, ValidationError};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::timestamp;

const PRODUCT_COLUMNS: &str = "id, sku, name, description, barcode, price_cents, cost_cents, \
     stock_quantity, min_stock_level, category_id, is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Validates and inserts a product. A taken SKU is a validation error.
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_new_product(new)?;

        let now = timestamp::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: new.sku.trim().to_string(),
            name: new.name.trim().to_string(),
            description: new.description.clone(),
            barcode: new.barcode.clone(),
            price_cents: new.price_cents,
            cost_cents: new.cost_cents,
            stock_quantity: new.stock_quantity,
            min_stock_level: new.min_stock_level,
            category_id: new.category_id.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, barcode,
                price_cents, cost_cents, stock_quantity, min_stock_level,
                category_id, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.barcode)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock_quantity)
        .bind(product.min_stock_level)
        .bind(&product.category_id)
        .bind(product.is_active)
        .bind(timestamp::encode(product.created_at))
        .bind(timestamp::encode(product.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_sku(e.into(), &product.sku))?;

        info!(id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Active products matching by name substring, exact SKU or exact barcode.
    ///
    /// An empty query matches nothing.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        debug!(query, limit, "Searching products");

        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
             WHERE is_active = 1
               AND (name LIKE ?1 ESCAPE '\' OR sku = ?2 OR barcode = ?2)
             ORDER BY name
             LIMIT ?3
            "#
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(pattern)
            .bind(query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Active products at or below their reorder threshold.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
             WHERE is_active = 1 AND stock_quantity <= min_stock_level
             ORDER BY stock_quantity, name
            "#
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Applies only the fields present in `patch`.
    ///
    /// Changing the SKU of a product with transaction history fails with
    /// [`CoreError::SkuLocked`].
    pub async fn update(&self, id: &str, patch: &ProductPatch) -> DbResult<Product> {
        validate_patch(patch)?;

        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let existing = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        if patch.is_empty() {
            return Ok(existing);
        }

        let new_sku = patch.sku.as_deref().map(str::trim);
        if let Some(sku) = new_sku {
            if sku != existing.sku && has_history(&mut tx, id).await? {
                return Err(CoreError::SkuLocked(id.to_string()).into());
            }
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE products SET ");
        {
            let mut set = builder.separated(", ");
            if let Some(sku) = new_sku {
                set.push("sku = ").push_bind_unseparated(sku.to_string());
            }
            if let Some(name) = &patch.name {
                set.push("name = ").push_bind_unseparated(name.trim().to_string());
            }
            if let Some(description) = &patch.description {
                set.push("description = ").push_bind_unseparated(description.clone());
            }
            if let Some(barcode) = &patch.barcode {
                set.push("barcode = ").push_bind_unseparated(barcode.clone());
            }
            if let Some(price) = patch.price_cents {
                set.push("price_cents = ").push_bind_unseparated(price);
            }
            if let Some(cost) = patch.cost_cents {
                set.push("cost_cents = ").push_bind_unseparated(cost);
            }
            if let Some(stock) = patch.stock_quantity {
                set.push("stock_quantity = ").push_bind_unseparated(stock);
            }
            if let Some(level) = patch.min_stock_level {
                set.push("min_stock_level = ").push_bind_unseparated(level);
            }
            if let Some(category) = &patch.category_id {
                set.push("category_id = ").push_bind_unseparated(category.clone());
            }
            if let Some(active) = patch.is_active {
                set.push("is_active = ").push_bind_unseparated(active);
            }
            set.push("updated_at = ")
                .push_bind_unseparated(timestamp::encode(timestamp::now()));
        }
        builder.push(" WHERE id = ").push_bind(id);

        builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| duplicate_sku(e.into(), new_sku.unwrap_or_default()))?;

        let updated = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id, "Product updated");
        Ok(updated)
    }

    /// Removes a product, or deactivates it if any transaction references it.
    pub async fn delete(&self, id: &str) -> DbResult<DeleteOutcome> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        let outcome = if has_history(&mut tx, id).await? {
            deactivate(&mut tx, id).await?;
            DeleteOutcome::Deactivated
        } else {
            match sqlx::query("DELETE FROM products WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(DbError::from)
            {
                Ok(_) => DeleteOutcome::Deleted,
                // an item was written between the check and the delete
                Err(DbError::ForeignKeyViolation { .. }) => {
                    deactivate(&mut tx, id).await?;
                    DeleteOutcome::Deactivated
                }
                Err(e) => return Err(e),
            }
        };

        tx.commit().await?;

        info!(id, ?outcome, "Product removed");
        Ok(outcome)
    }
}

async fn has_history(conn: &mut SqliteConnection, product_id: &str) -> DbResult<bool> {
    let referenced: i64 = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM transaction_items WHERE product_id = ?1)",
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(referenced != 0)
}

async fn deactivate(conn: &mut SqliteConnection, product_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
        .bind(product_id)
        .bind(timestamp::encode(timestamp::now()))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn validate_patch(patch: &ProductPatch) -> Result<(), ValidationError> {
    if let Some(sku) = &patch.sku {
        validate_sku(sku)?;
    }
    if let Some(name) = &patch.name {
        validate_product_name(name)?;
    }
    if let Some(price) = patch.price_cents {
        validate_price_cents(price)?;
    }
    if let Some(cost) = patch.cost_cents {
        validate_cost_cents(cost)?;
    }
    if let Some(stock) = patch.stock_quantity {
        validate_stock_quantity(stock)?;
    }
    if let Some(level) = patch.min_stock_level {
        validate_min_stock_level(level)?;
    }
    Ok(())
}

fn duplicate_sku(err: DbError, sku: &str) -> DbError {
    if err.is_unique_violation_on("products.sku") {
        ValidationError::Duplicate {
            field: "sku".to_string(),
            value: sku.to_string(),
        }
        .into()
    } else {
        err
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{new_product, product, test_db};
    use cashdesk_core::{NewTransaction, NewTransactionItem, PaymentType};

    async fn sell(db: &crate::Database, product: &Product, qty: i64) {
        let header = NewTransaction {
            customer_id: None,
            user_id: "cashier".to_string(),
            total_cents: product.price_cents * qty,
            discount_cents: 0,
            tax_cents: 0,
            payment_type: PaymentType::Cash,
            notes: None,
        };
        let items = [NewTransactionItem::new(&product.id, qty, product.price_cents)];
        db.transactions()
            .create_transaction(&header, &items)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = test_db().await;
        let repo = db.products();
        let created = product(&db, "COKE-330", 24, 250, 110).await;

        let by_id = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);

        let by_sku = repo.get_by_sku("COKE-330").await.unwrap().unwrap();
        assert_eq!(by_sku.id, created.id);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_validation_error() {
        let db = test_db().await;
        product(&db, "DUP-1", 1, 100, 50).await;

        let err = db
            .products()
            .insert(&new_product("DUP-1", 1, 100, 50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_product() {
        let db = test_db().await;
        let err = db
            .products()
            .insert(&new_product("FREE", 1, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_search_and_low_stock() {
        let db = test_db().await;
        let repo = db.products();
        let mut low = new_product("ORANGE-1L", 2, 399, 200);
        low.name = "Orange Juice 1L".to_string();
        low.min_stock_level = 5;
        low.barcode = Some("5449000000996".to_string());
        let low = repo.insert(&low).await.unwrap();
        product(&db, "APPLE-1L", 50, 399, 200).await;

        let hits = repo.search("orange", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, low.id);
        assert_eq!(repo.search("5449000000996", 10).await.unwrap().len(), 1);
        assert_eq!(repo.search("APPLE-1L", 10).await.unwrap().len(), 1);
        assert!(repo.search("   ", 10).await.unwrap().is_empty());
        assert!(repo.search("100%", 10).await.unwrap().is_empty());

        let low_stock = repo.list_low_stock().await.unwrap();
        assert_eq!(low_stock.len(), 1);
        assert_eq!(low_stock[0].id, low.id);
    }

    #[tokio::test]
    async fn test_patch_only_touches_given_fields() {
        let db = test_db().await;
        let repo = db.products();
        let mut p = new_product("SOAP", 5, 299, 120);
        p.description = Some("Lavender".to_string());
        let p = repo.insert(&p).await.unwrap();

        let patch = ProductPatch {
            price_cents: Some(349),
            description: Some(None),
            ..Default::default()
        };
        let updated = repo.update(&p.id, &patch).await.unwrap();

        assert_eq!(updated.price_cents, 349);
        assert_eq!(updated.description, None);
        assert_eq!(updated.name, p.name);
        assert_eq!(updated.cost_cents, 120);
        assert_eq!(updated.stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let db = test_db().await;
        let patch = ProductPatch {
            name: Some("Ghost".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            db.products().update("missing", &patch).await,
            Err(DbError::Core(CoreError::ProductNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_sku_locked_after_sale() {
        let db = test_db().await;
        let p = product(&db, "BREAD", 10, 250, 100).await;

        let rename = ProductPatch {
            sku: Some("BREAD-WHITE".to_string()),
            ..Default::default()
        };
        // no history yet: allowed
        let renamed = db.products().update(&p.id, &rename).await.unwrap();
        assert_eq!(renamed.sku, "BREAD-WHITE");

        sell(&db, &renamed, 1).await;

        let rename_again = ProductPatch {
            sku: Some("BREAD-W".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            db.products().update(&p.id, &rename_again).await,
            Err(DbError::Core(CoreError::SkuLocked(_)))
        ));

        // other fields stay editable
        let reprice = ProductPatch {
            price_cents: Some(275),
            ..Default::default()
        };
        assert_eq!(
            db.products().update(&p.id, &reprice).await.unwrap().price_cents,
            275
        );
    }

    #[tokio::test]
    async fn test_delete_without_history_removes_row() {
        let db = test_db().await;
        let p = product(&db, "TEMP", 1, 100, 10).await;

        assert_eq!(
            db.products().delete(&p.id).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert!(db.products().get_by_id(&p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_with_history_deactivates() {
        let db = test_db().await;
        let p = product(&db, "MILK", 10, 129, 80).await;
        sell(&db, &p, 2).await;

        assert_eq!(
            db.products().delete(&p.id).await.unwrap(),
            DeleteOutcome::Deactivated
        );
        let kept = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert!(!kept.is_active);
        assert!(db.products().list_active(10).await.unwrap().is_empty());

        assert!(matches!(
            db.products().delete("missing").await,
            Err(DbError::Core(CoreError::ProductNotFound(_)))
        ));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
