//! # Shop Settings
//!
//! One process-wide row with explicit get-or-create semantics. The row is
//! keyed by a fixed id, so concurrent first reads race on `INSERT OR IGNORE`
//! and all end up with the same row.

use cashdesk_core::validation::validate_tax_rate_bps;
use cashdesk_core::{PrinterType, ShopSettings, ShopSettingsPatch, ValidationError, DEFAULT_SHOP_NAME};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::timestamp;

const SETTINGS_ID: &str = "default";

const SETTINGS_COLUMNS: &str = "id, shop_name, shop_address, shop_phone, shop_email, \
     tax_rate_bps, printer_type, receipt_header, receipt_footer, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ShopSettingsRepository {
    pool: SqlitePool,
}

impl ShopSettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShopSettingsRepository { pool }
    }

    /// Returns the settings row, creating it with defaults on first use.
    pub async fn get_or_create(&self) -> DbResult<ShopSettings> {
        if let Some(settings) = self.fetch().await? {
            return Ok(settings);
        }

        let now = timestamp::encode(timestamp::now());
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO shop_settings (
                id, shop_name, tax_rate_bps, printer_type, created_at, updated_at
            ) VALUES (?1, ?2, 0, ?3, ?4, ?4)
            "#,
        )
        .bind(SETTINGS_ID)
        .bind(DEFAULT_SHOP_NAME)
        .bind(PrinterType::default())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            info!("Default shop settings created");
        }

        let sql = format!("SELECT {SETTINGS_COLUMNS} FROM shop_settings WHERE id = ?1");
        let settings = sqlx::query_as::<_, ShopSettings>(&sql)
            .bind(SETTINGS_ID)
            .fetch_one(&self.pool)
            .await?;
        Ok(settings)
    }

    /// Applies only the fields present in `patch`.
    pub async fn update(&self, patch: &ShopSettingsPatch) -> DbResult<ShopSettings> {
        validate_patch(patch)?;
        self.get_or_create().await?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE shop_settings SET ");
        {
            let mut set = builder.separated(", ");
            if let Some(name) = &patch.shop_name {
                set.push("shop_name = ").push_bind_unseparated(name.trim().to_string());
            }
            if let Some(address) = &patch.shop_address {
                set.push("shop_address = ").push_bind_unseparated(address.clone());
            }
            if let Some(phone) = &patch.shop_phone {
                set.push("shop_phone = ").push_bind_unseparated(phone.clone());
            }
            if let Some(email) = &patch.shop_email {
                set.push("shop_email = ").push_bind_unseparated(email.clone());
            }
            if let Some(bps) = patch.tax_rate_bps {
                set.push("tax_rate_bps = ").push_bind_unseparated(bps);
            }
            if let Some(printer) = patch.printer_type {
                set.push("printer_type = ").push_bind_unseparated(printer);
            }
            if let Some(header) = &patch.receipt_header {
                set.push("receipt_header = ").push_bind_unseparated(header.clone());
            }
            if let Some(footer) = &patch.receipt_footer {
                set.push("receipt_footer = ").push_bind_unseparated(footer.clone());
            }
            set.push("updated_at = ")
                .push_bind_unseparated(timestamp::encode(timestamp::now()));
        }
        builder.push(" WHERE id = ").push_bind(SETTINGS_ID);
        builder.build().execute(&self.pool).await?;

        info!("Shop settings updated");
        self.get_or_create().await
    }

    async fn fetch(&self) -> DbResult<Option<ShopSettings>> {
        let sql = format!("SELECT {SETTINGS_COLUMNS} FROM shop_settings WHERE id = ?1");
        let settings = sqlx::query_as::<_, ShopSettings>(&sql)
            .bind(SETTINGS_ID)
            .fetch_optional(&self.pool)
            .await?;
        Ok(settings)
    }
}

fn validate_patch(patch: &ShopSettingsPatch) -> Result<(), ValidationError> {
    if let Some(name) = &patch.shop_name {
        if name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "shop_name".to_string(),
            });
        }
    }
    if let Some(bps) = patch.tax_rate_bps {
        validate_tax_rate_bps(bps)?;
    }
    Ok(())
}
