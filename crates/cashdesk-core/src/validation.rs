//! # Validation
//!
//! Business-rule checks run before anything touches the database.
//!
//! ```text
//!   request layer ──► validate_*  (this module, caller's fault → ValidationError)
//!                        │
//!                        ▼
//!   cashdesk-db    ──► NOT NULL / UNIQUE / FOREIGN KEY / CHECK (last line)
//! ```
//!
//! Validation failures are never retried.

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::types::{NewProduct, NewTransaction, NewTransactionItem};
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_TRANSACTION_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_SKU_LEN: usize = 50;
const MAX_NAME_LEN: usize = 200;
const MAX_NOTES_LEN: usize = 1000;

// =============================================================================
// Catalog
// =============================================================================

/// Validates a SKU: 1 to 50 characters of `[A-Za-z0-9_-]`.
///
/// ```rust
/// use cashdesk_core::validation::validate_sku;
///
/// assert!(validate_sku("COKE-330").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }
    if sku.len() > MAX_SKU_LEN {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LEN,
        });
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "only letters, digits, '-' and '_' are allowed".to_string(),
        });
    }
    Ok(())
}

/// Validates a product name: 1 to 200 characters after trimming.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

fn positive(field: &str, value: i64) -> ValidationResult<()> {
    if value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn at_most_max_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }
    Ok(())
}

/// Sale price must be strictly positive.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    positive("price", cents)
}

/// Acquisition cost may be zero (free samples) but never negative.
pub fn validate_cost_cents(cents: i64) -> ValidationResult<()> {
    non_negative("cost", cents)
}

pub fn validate_stock_quantity(quantity: i64) -> ValidationResult<()> {
    non_negative("stock_quantity", quantity)
}

pub fn validate_min_stock_level(level: i64) -> ValidationResult<()> {
    non_negative("min_stock_level", level)
}

/// Runs every catalog rule against a product about to be inserted.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_sku(&product.sku)?;
    validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)?;
    validate_cost_cents(product.cost_cents)?;
    validate_stock_quantity(product.stock_quantity)?;
    validate_min_stock_level(product.min_stock_level)?;
    Ok(())
}

/// Tax rate in basis points: 0 to 10000 (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }
    Ok(())
}

// =============================================================================
// Checkout
// =============================================================================

/// Line quantity: 1 to [`MAX_ITEM_QUANTITY`].
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    positive("quantity", qty)?;
    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Unit price: 1 to [`MAX_AMOUNT_CENTS`].
pub fn validate_unit_price(cents: i64) -> ValidationResult<()> {
    positive("unit_price", cents)?;
    at_most_max_amount("unit_price", cents)
}

pub fn validate_item(item: &NewTransactionItem) -> ValidationResult<()> {
    if item.product_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }
    validate_quantity(item.quantity)?;
    validate_unit_price(item.unit_price_cents)
}

/// Every item must be valid; a checkout needs at least one and at most
/// [`MAX_TRANSACTION_ITEMS`].
pub fn validate_items(items: &[NewTransactionItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    if items.len() > MAX_TRANSACTION_ITEMS {
        return Err(ValidationError::TooMany {
            field: "items".to_string(),
            max: MAX_TRANSACTION_ITEMS,
        });
    }
    items.iter().try_for_each(validate_item)
}

/// Header rules: cashier required, total > 0, discount and tax ≥ 0, and
/// no amount above [`MAX_AMOUNT_CENTS`].
pub fn validate_header(header: &NewTransaction) -> ValidationResult<()> {
    if header.user_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "user_id".to_string(),
        });
    }
    positive("total_amount", header.total_cents)?;
    non_negative("discount_amount", header.discount_cents)?;
    non_negative("tax_amount", header.tax_cents)?;
    at_most_max_amount("total_amount", header.total_cents)?;
    at_most_max_amount("discount_amount", header.discount_cents)?;
    at_most_max_amount("tax_amount", header.tax_cents)?;

    if let Some(notes) = &header.notes {
        if notes.chars().count() > MAX_NOTES_LEN {
            return Err(ValidationError::TooLong {
                field: "notes".to_string(),
                max: MAX_NOTES_LEN,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Reporting
// =============================================================================

/// Parses a strict `YYYY-MM-DD` calendar date.
///
/// ```rust
/// use cashdesk_core::validation::parse_report_date;
///
/// assert!(parse_report_date("date", "2024-02-29").is_ok());
/// assert!(parse_report_date("date", "2023-02-29").is_err());
/// assert!(parse_report_date("date", "2024-2-9").is_err());
/// ```
pub fn parse_report_date(field: &str, input: &str) -> ValidationResult<NaiveDate> {
    let input = input.trim();
    let invalid = || ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("'{input}' is not a YYYY-MM-DD date"),
    };

    if input.len() != 10 {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| invalid())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentType;

    fn header(total: i64) -> NewTransaction {
        NewTransaction {
            customer_id: None,
            user_id: "cashier-1".to_string(),
            total_cents: total,
            discount_cents: 0,
            tax_cents: 0,
            payment_type: PaymentType::Cash,
            notes: None,
        }
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("COKE-330").is_ok());
        assert!(validate_sku("snack_01").is_ok());

        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("café").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let mut product = NewProduct {
            sku: "WATER-500".to_string(),
            name: "Still Water 500ml".to_string(),
            description: None,
            barcode: None,
            price_cents: 150,
            cost_cents: 0,
            stock_quantity: 0,
            min_stock_level: 5,
            category_id: None,
        };
        assert!(validate_new_product(&product).is_ok());

        product.price_cents = 0;
        assert!(matches!(
            validate_new_product(&product),
            Err(ValidationError::MustBePositive { .. })
        ));

        product.price_cents = 150;
        product.cost_cents = -1;
        assert!(matches!(
            validate_new_product(&product),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_items() {
        assert!(validate_items(&[]).is_err());
        assert!(validate_items(&[NewTransactionItem::new("p", 1, 100)]).is_ok());
        assert!(validate_items(&[NewTransactionItem::new("p", 1, 0)]).is_err());
        assert!(validate_items(&[NewTransactionItem::new(" ", 1, 100)]).is_err());

        let many = vec![NewTransactionItem::new("p", 1, 100); MAX_TRANSACTION_ITEMS + 1];
        assert!(matches!(
            validate_items(&many),
            Err(ValidationError::TooMany { .. })
        ));
    }

    #[test]
    fn test_validate_header() {
        assert!(validate_header(&header(1000)).is_ok());
        assert!(validate_header(&header(0)).is_err());

        let mut h = header(1000);
        h.user_id = String::new();
        assert!(validate_header(&h).is_err());

        let mut h = header(1000);
        h.discount_cents = -5;
        assert!(validate_header(&h).is_err());

        assert!(validate_header(&header(MAX_AMOUNT_CENTS)).is_ok());
        assert!(matches!(
            validate_header(&header(MAX_AMOUNT_CENTS + 1)),
            Err(ValidationError::OutOfRange { .. })
        ));

        let mut h = header(1000);
        h.tax_cents = MAX_AMOUNT_CENTS + 1;
        assert!(validate_header(&h).is_err());
    }

    #[test]
    fn test_validate_unit_price_upper_bound() {
        assert!(validate_unit_price(MAX_AMOUNT_CENTS).is_ok());
        assert!(matches!(
            validate_unit_price(MAX_AMOUNT_CENTS + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_item(&NewTransactionItem::new("p", 2, 5_000_000_000_000_000_00)).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(10_000).is_ok());
        assert!(validate_tax_rate_bps(10_001).is_err());
    }
}
