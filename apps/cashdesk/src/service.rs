//! # POS Service
//!
//! The request-facing operations. Every method takes plain strings and
//! numbers the way a request handler receives them, and answers with
//! response DTOs whose amounts are two-digit decimal strings.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_transaction ──► TransactionStore::create_transaction           │
//! │  cancel_transaction ──► TransactionStore::cancel_transaction           │
//! │  add_item           ──► TransactionStore::add_item                     │
//! │  daily_revenue      ──► ReportingEngine::daily_revenue                 │
//! │  sales_report       ──► ReportingEngine::sales_report                  │
//! │  profit_report      ──► ReportingEngine::profit_report                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use cashdesk_core::validation::{parse_report_date, validate_header, validate_items};
use cashdesk_core::{
    CheckoutTotals, DailyRevenue, Money, NewTransaction, NewTransactionItem, PaymentType, ProfitReport,
    ReportRange, SalesReportRow, ShopSettings, ShopSettingsPatch, Transaction, TransactionItem,
    TransactionStatus, TransactionWithItems,
};
use cashdesk_db::Database;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ApiError;

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    pub user_id: String,
    /// Decimal string, e.g. `"30.00"`.
    pub total_amount: String,
    #[serde(default)]
    pub discount_amount: Option<String>,
    #[serde(default)]
    pub tax_amount: Option<String>,
    pub payment_type: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<ItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRequest {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: String,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub id: String,
    pub transaction_number: String,
    pub customer_id: Option<String>,
    pub user_id: String,
    pub total_amount: String,
    pub discount_amount: String,
    pub tax_amount: String,
    pub payment_type: PaymentType,
    pub status: TransactionStatus,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Absent in listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ItemResponse>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: String,
    pub total_price: String,
    pub unit_cost: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRevenueResponse {
    pub revenue: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReportRowResponse {
    pub date: String,
    pub total_sales: String,
    pub total_transactions: i64,
    pub total_discount: String,
    pub total_profit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitReportResponse {
    pub total_profit: String,
    pub total_cost: String,
    pub profit_margin: f64,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decimal(cents: i64) -> String {
    Money::from_cents(cents).to_decimal_string()
}

impl TransactionResponse {
    fn header(t: Transaction) -> Self {
        TransactionResponse {
            total_amount: decimal(t.total_cents),
            discount_amount: decimal(t.discount_cents),
            tax_amount: decimal(t.tax_cents),
            created_at: timestamp(t.created_at),
            updated_at: timestamp(t.updated_at),
            id: t.id,
            transaction_number: t.transaction_number,
            customer_id: t.customer_id,
            user_id: t.user_id,
            payment_type: t.payment_type,
            status: t.status,
            notes: t.notes,
            items: None,
        }
    }
}

impl From<TransactionWithItems> for TransactionResponse {
    fn from(full: TransactionWithItems) -> Self {
        let items = full.items.into_iter().map(ItemResponse::from).collect();
        TransactionResponse {
            items: Some(items),
            ..TransactionResponse::header(full.transaction)
        }
    }
}

impl From<TransactionItem> for ItemResponse {
    fn from(item: TransactionItem) -> Self {
        ItemResponse {
            unit_price: decimal(item.unit_price_cents),
            total_price: decimal(item.total_price_cents),
            unit_cost: decimal(item.unit_cost_cents),
            created_at: timestamp(item.created_at),
            id: item.id,
            transaction_id: item.transaction_id,
            product_id: item.product_id,
            quantity: item.quantity,
        }
    }
}

impl From<DailyRevenue> for DailyRevenueResponse {
    fn from(day: DailyRevenue) -> Self {
        DailyRevenueResponse {
            revenue: day.revenue.to_decimal_string(),
            date: day.date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl From<SalesReportRow> for SalesReportRowResponse {
    fn from(row: SalesReportRow) -> Self {
        SalesReportRowResponse {
            date: row.date.format("%Y-%m-%d").to_string(),
            total_sales: row.total_sales.to_decimal_string(),
            total_transactions: row.total_transactions,
            total_discount: row.total_discount.to_decimal_string(),
            total_profit: row.total_profit.to_decimal_string(),
        }
    }
}

impl From<ProfitReport> for ProfitReportResponse {
    fn from(report: ProfitReport) -> Self {
        ProfitReportResponse {
            total_profit: report.total_profit.to_decimal_string(),
            total_cost: report.total_cost.to_decimal_string(),
            profit_margin: report.profit_margin,
        }
    }
}

/// Parses a request amount, naming the field on failure.
fn amount(field: &str, input: &str) -> Result<i64, ApiError> {
    Money::parse_decimal(input)
        .map(|m| m.cents())
        .map_err(|e| ApiError::validation(format!("{field}: {e}")))
}

fn optional_amount(field: &str, input: Option<&str>) -> Result<i64, ApiError> {
    input.map_or(Ok(0), |value| amount(field, value))
}

fn item(request: &ItemRequest) -> Result<NewTransactionItem, ApiError> {
    Ok(NewTransactionItem::new(
        request.product_id.clone(),
        request.quantity,
        amount("unit_price", &request.unit_price)?,
    ))
}

// =============================================================================
// Service
// =============================================================================

/// Request layer over one [`Database`].
#[derive(Debug, Clone)]
pub struct PosService {
    db: Database,
}

impl PosService {
    pub fn new(db: Database) -> Self {
        PosService { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn create_transaction(
        &self,
        request: CreateTransactionRequest,
    ) -> Result<TransactionResponse, ApiError> {
        debug!(user_id = %request.user_id, items = request.items.len(), "create_transaction");

        let header = NewTransaction {
            customer_id: request.customer_id,
            user_id: request.user_id,
            total_cents: amount("total_amount", &request.total_amount)?,
            discount_cents: optional_amount("discount_amount", request.discount_amount.as_deref())?,
            tax_cents: optional_amount("tax_amount", request.tax_amount.as_deref())?,
            payment_type: request.payment_type.parse::<PaymentType>()?,
            notes: request.notes,
        };
        let items = request
            .items
            .iter()
            .map(item)
            .collect::<Result<Vec<_>, _>>()?;

        validate_header(&header)?;
        validate_items(&items)?;
        self.check_tax(&header, &items).await?;

        let created = self
            .db
            .transactions()
            .create_transaction(&header, &items)
            .await?;
        Ok(created.into())
    }

    /// Warns when the header's tax differs from the shop tax rate applied to
    /// the discounted subtotal. The caller's amounts are still recorded.
    async fn check_tax(
        &self,
        header: &NewTransaction,
        items: &[NewTransactionItem],
    ) -> Result<(), ApiError> {
        let rate = self.db.settings().get_or_create().await?.tax_rate();
        let expected =
            CheckoutTotals::compute(items, rate, Money::from_cents(header.discount_cents))?;
        if expected.tax.cents() != header.tax_cents {
            warn!(
                user_id = %header.user_id,
                tax_rate_bps = rate.bps(),
                expected_tax = %expected.tax,
                tax = header.tax_cents,
                "Header tax does not match the shop tax rate"
            );
        }
        Ok(())
    }

    pub async fn cancel_transaction(&self, id: &str) -> Result<CancelResponse, ApiError> {
        debug!(transaction_id = id, "cancel_transaction");
        self.db.transactions().cancel_transaction(id).await?;
        Ok(CancelResponse { success: true })
    }

    pub async fn add_item(
        &self,
        transaction_id: &str,
        request: ItemRequest,
    ) -> Result<ItemResponse, ApiError> {
        debug!(transaction_id, product_id = %request.product_id, "add_item");
        let new_item = item(&request)?;
        let line = self
            .db
            .transactions()
            .add_item(transaction_id, &new_item)
            .await?;
        Ok(line.into())
    }

    /// Revenue of `date` (`YYYY-MM-DD`), or of today in the reference offset.
    pub async fn daily_revenue(&self, date: Option<&str>) -> Result<DailyRevenueResponse, ApiError> {
        let date = date.map(|d| parse_report_date("date", d)).transpose()?;
        let day = self.db.reports().daily_revenue(date).await?;
        Ok(day.into())
    }

    pub async fn sales_report(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<SalesReportRowResponse>, ApiError> {
        let range = ReportRange::parse(start_date, end_date)?;
        let rows = self.db.reports().sales_report(range).await?;
        Ok(rows.into_iter().map(SalesReportRowResponse::from).collect())
    }

    pub async fn profit_report(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<ProfitReportResponse, ApiError> {
        let range = ReportRange::parse(start_date, end_date)?;
        let report = self.db.reports().profit_report(range).await?;
        Ok(report.into())
    }

    /// Most recent first, without items.
    pub async fn list_transactions(&self, limit: u32) -> Result<Vec<TransactionResponse>, ApiError> {
        let transactions = self.db.transactions().list(limit).await?;
        Ok(transactions
            .into_iter()
            .map(TransactionResponse::header)
            .collect())
    }

    pub async fn get_transaction(&self, id: &str) -> Result<TransactionResponse, ApiError> {
        self.db
            .transactions()
            .get_with_items(id)
            .await?
            .map(TransactionResponse::from)
            .ok_or_else(|| ApiError::not_found("Transaction", id))
    }

    pub async fn settings(&self) -> Result<ShopSettings, ApiError> {
        Ok(self.db.settings().get_or_create().await?)
    }

    pub async fn update_settings(&self, patch: &ShopSettingsPatch) -> Result<ShopSettings, ApiError> {
        let settings = self.db.settings().update(patch).await?;
        info!(shop_name = %settings.shop_name, "Settings saved");
        Ok(settings)
    }
}
