//! # Reporting Engine
//!
//! Read-only aggregation over `completed` transactions. Each report is a
//! single SELECT, so it sees one consistent snapshot and takes no write
//! lock; checkouts in flight are simply not counted yet.
//!
//! ```text
//!   "2024-03-01".."2024-03-03" ──► ReportRange ──► [start_utc, end_utc)
//!                                                       │
//!        SELECT completed transactions in window ◄──────┘
//!        + per-transaction item cost (current | snapshot)
//!                        │
//!                        ▼
//!        cashdesk_core::report::aggregate_sales / ProfitReport
//! ```

use cashdesk_core::report::{
    aggregate_sales, CostBasis, DailyRevenue, DayWindow, ProfitReport, ReportRange,
    ReportTransaction, SalesReportRow,
};
use cashdesk_core::{Money, TransactionStatus};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::debug;

use crate::error::DbResult;
use crate::pool::StoreOptions;
use crate::repository::bounded;
use crate::timestamp;

/// Date-windowed revenue, sales and profit figures.
#[derive(Debug, Clone)]
pub struct ReportingEngine {
    pool: SqlitePool,
    timeout: Duration,
    offset: FixedOffset,
    cost_basis: CostBasis,
}

impl ReportingEngine {
    pub fn new(pool: SqlitePool, options: &StoreOptions) -> Self {
        ReportingEngine {
            pool,
            timeout: options.unit_of_work_timeout,
            offset: options.utc_offset,
            cost_basis: options.cost_basis,
        }
    }

    pub fn with_cost_basis(mut self, cost_basis: CostBasis) -> Self {
        self.cost_basis = cost_basis;
        self
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Sum of `total_cents` over completed transactions on `date`
    /// (today in the reference offset when `None`). Zero when there are none.
    pub async fn daily_revenue(&self, date: Option<NaiveDate>) -> DbResult<DailyRevenue> {
        let window = match date {
            Some(date) => DayWindow::new(date, self.offset),
            None => DayWindow::today(self.offset),
        };

        let cents: i64 = bounded(self.timeout, "daily_revenue", async {
            let cents = sqlx::query_scalar(
                r#"
                SELECT COALESCE(SUM(total_cents), 0)
                  FROM transactions
                 WHERE status = ?1 AND created_at >= ?2 AND created_at < ?3
                "#,
            )
            .bind(TransactionStatus::Completed)
            .bind(timestamp::encode(window.start_utc()))
            .bind(timestamp::encode(window.end_utc()))
            .fetch_one(&self.pool)
            .await?;
            Ok(cents)
        })
        .await?;

        debug!(date = %window.date(), revenue = cents, "Daily revenue");
        Ok(DailyRevenue {
            revenue: Money::from_cents(cents),
            date: window.date(),
        })
    }

    /// One row per calendar day in `range` with at least one completed
    /// transaction, ascending by date.
    pub async fn sales_report(&self, range: ReportRange) -> DbResult<Vec<SalesReportRow>> {
        let rows = self.completed_in(range).await?;
        let report = aggregate_sales(&rows, self.offset);
        debug!(
            start = %range.start,
            end = %range.end,
            transactions = rows.len(),
            days = report.len(),
            "Sales report"
        );
        Ok(report)
    }

    /// Profit, cost and margin over all completed transactions in `range`.
    pub async fn profit_report(&self, range: ReportRange) -> DbResult<ProfitReport> {
        let rows = self.completed_in(range).await?;
        let report = ProfitReport::from_transactions(&rows);
        debug!(
            start = %range.start,
            end = %range.end,
            profit = %report.total_profit,
            cost = %report.total_cost,
            "Profit report"
        );
        Ok(report)
    }

    /// Completed transactions in `range` with their item cost under the
    /// configured basis.
    async fn completed_in(&self, range: ReportRange) -> DbResult<Vec<ReportTransaction>> {
        let (start, end) = range.utc_bounds(self.offset);
        self.completed_between(start, end).await
    }

    async fn completed_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<ReportTransaction>> {
        let cost_expression = match self.cost_basis {
            CostBasis::Current => {
                "SELECT SUM(i.quantity * p.cost_cents) FROM transaction_items i \
                 JOIN products p ON p.id = i.product_id WHERE i.transaction_id = t.id"
            }
            CostBasis::Snapshot => {
                "SELECT SUM(i.quantity * i.unit_cost_cents) FROM transaction_items i \
                 WHERE i.transaction_id = t.id"
            }
        };
        let sql = format!(
            r#"
            SELECT t.id, t.created_at, t.total_cents, t.discount_cents,
                   COALESCE(({cost_expression}), 0) AS cost_cents
              FROM transactions t
             WHERE t.status = ?1 AND t.created_at >= ?2 AND t.created_at < ?3
             ORDER BY t.created_at, t.id
            "#
        );

        bounded(self.timeout, "report_scan", async {
            let rows = sqlx::query_as::<_, ReportTransaction>(&sql)
                .bind(TransactionStatus::Completed)
                .bind(timestamp::encode(start))
                .bind(timestamp::encode(end))
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        })
        .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
