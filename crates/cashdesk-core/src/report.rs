//! # Report Windows and Aggregation
//!
//! Pure half of the reporting engine: turning calendar dates into UTC
//! windows and folding per-transaction facts into report rows.
//!
//! ## Day Windows
//! ```text
//!   reference offset +02:00, date 2024-03-10
//!
//!   local   2024-03-10 00:00 ─────────────── 2024-03-11 00:00
//!   UTC     2024-03-09 22:00 ─────────────── 2024-03-10 22:00
//!           [start_utc                        end_utc)
//! ```
//!
//! A transaction belongs to the day whose window contains its `created_at`.
//! The database layer fetches one [`ReportTransaction`] per completed
//! transaction in range; grouping happens here so the same rules are used
//! by every report.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::parse_report_date;

// =============================================================================
// Cost Basis
// =============================================================================

/// Which unit cost profit is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CostBasis {
    /// The product's cost as it is now. Historical profit moves when costs are edited.
    #[default]
    Current,
    /// The cost frozen on the line item at sale time.
    Snapshot,
}

impl fmt::Display for CostBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostBasis::Current => f.write_str("current"),
            CostBasis::Snapshot => f.write_str("snapshot"),
        }
    }
}

impl FromStr for CostBasis {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "current" => Ok(CostBasis::Current),
            "snapshot" => Ok(CostBasis::Snapshot),
            _ => Err(ValidationError::NotAllowed {
                field: "cost_basis".to_string(),
                allowed: vec!["current".into(), "snapshot".into()],
            }),
        }
    }
}

// =============================================================================
// Day Window
// =============================================================================

/// One calendar day in the reference offset, as a half-open UTC interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    date: NaiveDate,
    offset: FixedOffset,
}

impl DayWindow {
    pub fn new(date: NaiveDate, offset: FixedOffset) -> Self {
        DayWindow { date, offset }
    }

    /// The current calendar day in `offset`.
    pub fn today(offset: FixedOffset) -> Self {
        DayWindow::new(local_date(Utc::now(), offset), offset)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Local midnight at the start of the day, in UTC.
    pub fn start_utc(&self) -> DateTime<Utc> {
        local_midnight_utc(self.date, self.offset)
    }

    /// Local midnight at the start of the next day, in UTC. Exclusive.
    pub fn end_utc(&self) -> DateTime<Utc> {
        self.start_utc() + chrono::Duration::days(1)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start_utc() && at < self.end_utc()
    }
}

fn local_midnight_utc(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    let utc = local - chrono::Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc)
}

/// Calendar date of `at` in `offset`.
pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Builds a fixed offset from minutes east of UTC.
pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, ValidationError> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "utc_offset_minutes".to_string(),
            min: -(24 * 60 - 1),
            max: 24 * 60 - 1,
        })
}

// =============================================================================
// Report Range
// =============================================================================

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidFormat {
                field: "end_date".to_string(),
                reason: format!("{end} is before start date {start}"),
            });
        }
        Ok(ReportRange { start, end })
    }

    /// Parses two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        let start = parse_report_date("start_date", start)?;
        let end = parse_report_date("end_date", end)?;
        ReportRange::new(start, end)
    }

    /// `[start 00:00, end + 1 day 00:00)` in the reference offset, as UTC.
    pub fn utc_bounds(&self, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            DayWindow::new(self.start, offset).start_utc(),
            DayWindow::new(self.end, offset).end_utc(),
        )
    }
}

// =============================================================================
// Report Rows
// =============================================================================

/// Facts about one completed transaction, as fetched for reporting.
///
/// `cost_cents` is the summed quantity × unit cost of its items under the
/// configured [`CostBasis`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReportTransaction {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub total_cents: i64,
    pub discount_cents: i64,
    pub cost_cents: i64,
}

/// Revenue of a single calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyRevenue {
    pub revenue: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
}

/// One day of the sales report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReportRow {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub total_sales: Money,
    pub total_transactions: i64,
    pub total_discount: Money,
    pub total_profit: Money,
}

impl SalesReportRow {
    fn empty(date: NaiveDate) -> Self {
        SalesReportRow {
            date,
            total_sales: Money::zero(),
            total_transactions: 0,
            total_discount: Money::zero(),
            total_profit: Money::zero(),
        }
    }
}

/// Groups transactions by local calendar day.
///
/// Days without transactions produce no row. Rows are ascending by date.
pub fn aggregate_sales(rows: &[ReportTransaction], offset: FixedOffset) -> Vec<SalesReportRow> {
    let mut days: BTreeMap<NaiveDate, SalesReportRow> = BTreeMap::new();

    for row in rows {
        let date = local_date(row.created_at, offset);
        let day = days.entry(date).or_insert_with(|| SalesReportRow::empty(date));
        day.total_sales += Money::from_cents(row.total_cents);
        day.total_discount += Money::from_cents(row.discount_cents);
        day.total_profit += Money::from_cents(row.total_cents - row.cost_cents);
        day.total_transactions += 1;
    }

    days.into_values().collect()
}

/// Profit summary over a date range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitReport {
    pub total_profit: Money,
    pub total_cost: Money,
    /// total_profit / revenue, 0 when revenue is zero.
    pub profit_margin: f64,
}

impl ProfitReport {
    pub fn from_totals(revenue: Money, cost: Money) -> Self {
        let profit = revenue - cost;
        ProfitReport {
            total_profit: profit,
            total_cost: cost,
            profit_margin: profit.ratio_of(revenue),
        }
    }

    pub fn from_transactions(rows: &[ReportTransaction]) -> Self {
        let revenue: Money = rows.iter().map(|r| Money::from_cents(r.total_cents)).sum();
        let cost: Money = rows.iter().map(|r| Money::from_cents(r.cost_cents)).sum();
        ProfitReport::from_totals(revenue, cost)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
