//! # Cashdesk CLI
//!
//! ```bash
//! cashdesk migrate
//! cashdesk daily-revenue --date 2024-05-01
//! cashdesk sales-report --start 2024-05-01 --end 2024-05-31
//! cashdesk profit-report --start 2024-05-01 --end 2024-05-31
//! cashdesk cancel 6f1c...            # restores stock
//! cashdesk transactions --limit 20
//! cashdesk settings
//! ```
//!
//! Results are printed as pretty JSON on stdout. Failures print the
//! `ApiError` JSON on stderr and exit with status 1.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use cashdesk::config::CashdeskConfig;
use cashdesk::{connect, init_tracing, ApiError, PosService};
use cashdesk_db::migrations;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "cashdesk", version, about = "Cashdesk point-of-sale backend")]
struct Cli {
    /// Config file (default: platform config directory)
    #[arg(long, global = true, env = "CASHDESK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending schema migrations
    Migrate,

    /// Revenue of one calendar day (default: today)
    DailyRevenue {
        #[arg(long)]
        date: Option<String>,
    },

    /// Per-day sales, discount and profit
    SalesReport {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },

    /// Profit, cost and margin over a date range
    ProfitReport {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },

    /// Cancel a transaction and restore its stock
    Cancel { id: String },

    /// Most recent transactions, or one transaction with its items
    Transactions {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        id: Option<String>,
    },

    /// Show the shop settings
    Settings,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = CashdeskConfig::load(cli.config).context("loading configuration")?;
    init_tracing(&config.logging.filter);

    let service = connect(&config).await.context("opening database")?;
    let outcome = run(&service, cli.command).await;
    service.database().close().await;

    match outcome {
        Ok(output) => {
            println!("{output}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", serde_json::to_string_pretty(&err)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(service: &PosService, command: Command) -> Result<String, ApiError> {
    match command {
        Command::Migrate => {
            let pool = service.database().pool();
            migrations::run_migrations(pool).await?;
            let (embedded, applied) = migrations::migration_status(pool).await?;
            info!(embedded, applied, "Schema up to date");
            render(&serde_json::json!({ "embedded": embedded, "applied": applied }))
        }
        Command::DailyRevenue { date } => render(&service.daily_revenue(date.as_deref()).await?),
        Command::SalesReport { start, end } => render(&service.sales_report(&start, &end).await?),
        Command::ProfitReport { start, end } => {
            render(&service.profit_report(&start, &end).await?)
        }
        Command::Cancel { id } => render(&service.cancel_transaction(&id).await?),
        Command::Transactions { id: Some(id), .. } => render(&service.get_transaction(&id).await?),
        Command::Transactions { limit, id: None } => {
            render(&service.list_transactions(limit).await?)
        }
        Command::Settings => render(&service.settings().await?),
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::internal(e.to_string()))
}
