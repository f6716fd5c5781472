//! # Domain Types
//!
//! Core domain types used throughout Cashdesk.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐     │
//! │  │    Product      │   │   Transaction    │   │ TransactionItem  │     │
//! │  │  ─────────────  │   │  ──────────────  │   │  ──────────────  │     │
//! │  │  id (UUID)      │   │  id (UUID)       │   │  transaction_id  │     │
//! │  │  sku (business) │   │  txn number      │   │  product_id      │     │
//! │  │  price_cents    │   │  status          │   │  unit_price snap │     │
//! │  │  cost_cents     │   │  total_cents     │   │  unit_cost snap  │     │
//! │  │  stock_quantity │   │  payment_type    │   │  quantity        │     │
//! │  └─────────────────┘   └──────────────────┘   └──────────────────┘     │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐     │
//! │  │    TaxRate      │   │TransactionStatus │   │   PaymentType    │     │
//! │  │  bps (u32)      │   │  Pending         │   │  Cash / Card     │     │
//! │  │  825 = 8.25%    │   │  Completed       │   │  DigitalWallet   │     │
//! │  └─────────────────┘   │  Cancelled       │   │  BankTransfer    │     │
//! │                        └──────────────────┘   └──────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, transaction_number) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 825 bps = 8.25%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product.
///
/// `stock_quantity` is only ever changed by the inventory ledger during
/// checkout and cancellation, or by an explicit catalog correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - immutable once referenced by a transaction.
    pub sku: String,

    /// Display name.
    pub name: String,

    pub description: Option<String>,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Unit sale price in cents.
    pub price_cents: i64,

    /// Unit acquisition cost in cents.
    pub cost_cents: i64,

    /// Units on hand. Never negative.
    pub stock_quantity: i64,

    /// Reorder threshold for low-stock listings.
    pub min_stock_level: i64,

    /// Category reference (managed outside this system).
    pub category_id: Option<String>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the cost as Money.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    pub category_id: Option<String>,
}

/// Partial product update: only `Some` fields are written.
///
/// Nullable columns use `Option<Option<_>>` so callers can tell
/// "leave alone" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductPatch {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub barcode: Option<Option<String>>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub stock_quantity: Option<i64>,
    pub min_stock_level: Option<i64>,
    pub category_id: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl ProductPatch {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.barcode.is_none()
            && self.price_cents.is_none()
            && self.cost_cents.is_none()
            && self.stock_quantity.is_none()
            && self.min_stock_level.is_none()
            && self.category_id.is_none()
            && self.is_active.is_none()
    }
}

/// What `delete` actually did to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// Row removed; the product had no transaction history.
    Deleted,
    /// Row kept with `is_active = false` because transaction items reference it.
    Deactivated,
}

// =============================================================================
// Transaction Status
// =============================================================================

/// Status of a transaction.
///
/// ## State Machine
/// ```text
///   pending ───────► completed ───────► cancelled (terminal)
///      │                                    ▲
///      └────────────────────────────────────┘
/// ```
/// Checkout inserts straight into `completed`. `pending` is only used for
/// record-keeping inserts and still has to be handled by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    /// Lowercase name, as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    /// True for states with no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Cancelled)
    }

    /// Whether the state machine allows `self → next`.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Completed) | (Pending, Cancelled) | (Completed, Cancelled)
        )
    }

    /// Validates `self → next` for the given transaction.
    ///
    /// Re-cancelling reports [`CoreError::AlreadyCancelled`] so callers can
    /// tell it apart from other illegal moves.
    pub fn transition(
        &self,
        transaction_id: &str,
        next: TransactionStatus,
    ) -> CoreResult<TransactionStatus> {
        if self.can_transition_to(next) {
            return Ok(next);
        }
        if *self == TransactionStatus::Cancelled && next == TransactionStatus::Cancelled {
            return Err(CoreError::AlreadyCancelled(transaction_id.to_string()));
        }
        Err(CoreError::InvalidStatusTransition {
            transaction_id: transaction_id.to_string(),
            from: *self,
            to: next,
        })
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Pending
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["pending".into(), "completed".into(), "cancelled".into()],
            }),
        }
    }
}

// =============================================================================
// Payment Type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Cash,
    Card,
    DigitalWallet,
    BankTransfer,
}

impl FromStr for PaymentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(PaymentType::Cash),
            "card" => Ok(PaymentType::Card),
            "digital_wallet" => Ok(PaymentType::DigitalWallet),
            "bank_transfer" => Ok(PaymentType::BankTransfer),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_type".to_string(),
                allowed: vec![
                    "cash".into(),
                    "card".into(),
                    "digital_wallet".into(),
                    "bank_transfer".into(),
                ],
            }),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A sale header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    /// Human-displayable, globally unique, immutable.
    pub transaction_number: String,
    pub customer_id: Option<String>,
    /// Cashier.
    pub user_id: String,
    /// subtotal + tax − discount, in cents.
    pub total_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub payment_type: PaymentType,
    pub status: TransactionStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }
}

/// Header input for checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTransaction {
    pub customer_id: Option<String>,
    pub user_id: String,
    pub total_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub payment_type: PaymentType,
    pub notes: Option<String>,
}

// =============================================================================
// Transaction Item
// =============================================================================

/// A line item.
///
/// `unit_price_cents` and `unit_cost_cents` are frozen at sale time and
/// never re-derived from the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// quantity × unit_price_cents.
    pub total_price_cents: i64,
    /// Product cost at sale time.
    pub unit_cost_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TransactionItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

/// Line input for checkout and `add_item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTransactionItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl NewTransactionItem {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        NewTransactionItem {
            product_id: product_id.into(),
            quantity,
            unit_price_cents,
        }
    }

    /// quantity × unit price.
    pub fn line_total(&self) -> Result<Money, ValidationError> {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// A transaction together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionWithItems {
    #[serde(flatten)]
    #[ts(flatten)]
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

// =============================================================================
// Checkout Totals
// =============================================================================

/// Header amounts derived from a basket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl CheckoutTotals {
    /// Sum of every line total.
    pub fn subtotal(items: &[NewTransactionItem]) -> Result<Money, ValidationError> {
        let lines = items
            .iter()
            .map(NewTransactionItem::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        Money::try_sum(lines)
    }

    /// Tax is charged on the discounted subtotal.
    pub fn compute(
        items: &[NewTransactionItem],
        tax_rate: TaxRate,
        discount: Money,
    ) -> Result<Self, ValidationError> {
        let subtotal = Self::subtotal(items)?;
        let taxable = if discount > subtotal {
            Money::zero()
        } else {
            subtotal.checked_sub(discount)?
        };
        let tax = taxable.calculate_tax(tax_rate);
        Ok(CheckoutTotals {
            subtotal,
            tax,
            discount,
            total: taxable.checked_add(tax)?,
        })
    }

    /// Whether a header's amounts agree with its items.
    pub fn reconciles(
        items: &[NewTransactionItem],
        header: &NewTransaction,
    ) -> Result<bool, ValidationError> {
        let expected = Self::subtotal(items)?
            .checked_add(Money::from_cents(header.tax_cents))?
            .checked_sub(Money::from_cents(header.discount_cents))?;
        Ok(expected == Money::from_cents(header.total_cents))
    }
}

// =============================================================================
// Shop Settings
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PrinterType {
    #[cfg_attr(feature = "sqlx", sqlx(rename = "thermal_58mm"))]
    #[serde(rename = "thermal_58mm")]
    Thermal58mm,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "thermal_80mm"))]
    #[serde(rename = "thermal_80mm")]
    Thermal80mm,
}

impl Default for PrinterType {
    fn default() -> Self {
        PrinterType::Thermal58mm
    }
}

/// The single, process-wide shop settings row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ShopSettings {
    pub id: String,
    pub shop_name: String,
    pub shop_address: Option<String>,
    pub shop_phone: Option<String>,
    pub shop_email: Option<String>,
    pub tax_rate_bps: u32,
    pub printer_type: PrinterType,
    pub receipt_header: Option<String>,
    pub receipt_footer: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ShopSettings {
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

/// Partial settings update; see [`ProductPatch`] for the `Option<Option<_>>` convention.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShopSettingsPatch {
    pub shop_name: Option<String>,
    pub shop_address: Option<Option<String>>,
    pub shop_phone: Option<Option<String>>,
    pub shop_email: Option<Option<String>>,
    pub tax_rate_bps: Option<u32>,
    pub printer_type: Option<PrinterType>,
    pub receipt_header: Option<Option<String>>,
    pub receipt_footer: Option<Option<String>>,
}

/// Name given to the settings row when it is first created.
pub const DEFAULT_SHOP_NAME: &str = "Default Shop";

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_status_transitions() {
        use TransactionStatus::*;
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Completed.can_transition_to(Cancelled));

        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Completed));
        assert!(!Cancelled.can_transition_to(Completed));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn test_recancel_is_already_cancelled() {
        let err = TransactionStatus::Cancelled
            .transition("t-1", TransactionStatus::Cancelled)
            .unwrap_err();
        assert_eq!(err, CoreError::AlreadyCancelled("t-1".to_string()));

        let err = TransactionStatus::Cancelled
            .transition("t-1", TransactionStatus::Completed)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_status_serde_names() {
        let json = serde_json::to_string(&TransactionStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        let json = serde_json::to_string(&PaymentType::DigitalWallet).unwrap();
        assert_eq!(json, "\"digital_wallet\"");
        let json = serde_json::to_string(&PrinterType::Thermal80mm).unwrap();
        assert_eq!(json, "\"thermal_80mm\"");
    }

    #[test]
    fn test_payment_type_parsing() {
        assert_eq!("card".parse::<PaymentType>().unwrap(), PaymentType::Card);
        assert_eq!(
            "BANK_TRANSFER".parse::<PaymentType>().unwrap(),
            PaymentType::BankTransfer
        );
        assert!("cheque".parse::<PaymentType>().is_err());
    }

    #[test]
    fn test_checkout_totals() {
        let items = vec![
            NewTransactionItem::new("a", 3, 1000),
            NewTransactionItem::new("b", 1, 250),
        ];
        let totals =
            CheckoutTotals::compute(&items, TaxRate::from_bps(1000), Money::from_cents(250))
                .unwrap();
        assert_eq!(totals.subtotal.cents(), 3250);
        assert_eq!(totals.tax.cents(), 300);
        assert_eq!(totals.total.cents(), 3300);
    }

    #[test]
    fn test_reconciles() {
        let items = vec![NewTransactionItem::new("a", 3, 1000)];
        let mut header = NewTransaction {
            customer_id: None,
            user_id: "cashier".to_string(),
            total_cents: 3000,
            discount_cents: 0,
            tax_cents: 0,
            payment_type: PaymentType::Cash,
            notes: None,
        };
        assert!(CheckoutTotals::reconciles(&items, &header).unwrap());
        header.total_cents = 2999;
        assert!(!CheckoutTotals::reconciles(&items, &header).unwrap());
    }

    #[test]
    fn test_subtotal_overflow_is_an_error() {
        let items = vec![
            NewTransactionItem::new("a", 1, i64::MAX - 10),
            NewTransactionItem::new("b", 1, 20),
        ];
        assert!(matches!(
            CheckoutTotals::subtotal(&items),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(NewTransactionItem::new("a", 3, i64::MAX / 2).line_total().is_err());
    }

    #[test]
    fn test_empty_patch() {
        assert!(ProductPatch::default().is_empty());
        let patch = ProductPatch {
            description: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
