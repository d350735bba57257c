//! Subscriber billing CLI entry point.
//!
//! ```bash
//! subscriber-billing run-accrual --as-of 2026-08-01
//! subscriber-billing debtors --json
//! subscriber-billing bank-report --as-of 2026-08-01
//! subscriber-billing preview --tariff Basic --days-in-period 31 --days-used 21
//! ```

use billing_core::error::AppError;
use billing_core::observability::init_tracing;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use subscriber_billing::config::BillingConfig;
use subscriber_billing::engine::{self, prorated_charge};
use subscriber_billing::reports;
use subscriber_billing::services::store;
use subscriber_billing::startup::Application;

#[derive(Parser)]
#[command(name = "subscriber-billing")]
#[command(version, about = "Cable TV subscriber billing", long_about = None)]
struct Cli {
    /// Emit JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monthly accrual pass
    RunAccrual {
        /// Billing date, defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// List subscribers with a negative balance
    Debtors,
    /// Subscriber movement (connections, pauses, disconnections) for a month
    Movement {
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Bank reconciliation export for a month
    BankReport {
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Total succeeded payment income over a date range
    Income {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Preview a prorated charge without touching any subscriber
    Preview {
        /// Tariff name
        #[arg(long)]
        tariff: String,
        #[arg(long)]
        days_in_period: u32,
        #[arg(long)]
        days_used: i64,
    },
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = BillingConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(&config.log_level);

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to build application");
        std::io::Error::other(format!("Application build error: {}", e))
    })?;

    if let Err(e) = run(&cli, &app).await {
        tracing::error!(error = %e, "Command failed");
        return Err(std::io::Error::other(e.to_string()));
    }

    Ok(())
}

async fn run(cli: &Cli, app: &Application) -> Result<(), AppError> {
    let today = Utc::now().date_naive();

    match &cli.command {
        Commands::RunAccrual { as_of } => {
            let as_of = as_of.unwrap_or(today);
            let summary = engine::run_accrual_pass(app.db(), as_of).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Accrual pass {} as of {}: {} charged, {} skipped, {} errors",
                    summary.run_id,
                    summary.as_of,
                    summary.charged.len(),
                    summary.skipped.len(),
                    summary.errors.len()
                );
                for (id, reason) in &summary.errors {
                    println!("  subscriber {}: {}", id, reason);
                }
            }
        }
        Commands::Debtors => {
            let debtors = reports::debtors(app.db()).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&debtors)?);
            } else if debtors.is_empty() {
                println!("No debtors");
            } else {
                for s in &debtors {
                    println!("{}  {}  {}", s.personal_account, s.full_name, s.balance);
                }
            }
        }
        Commands::Movement { as_of } => {
            let as_of = as_of.unwrap_or(today);
            let report = reports::movement(app.db(), as_of).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Movement for {}: {} connected, {} paused, {} disconnected",
                    as_of.format("%Y-%m"),
                    report.connections,
                    report.pauses,
                    report.disconnections
                );
            }
        }
        Commands::BankReport { as_of } => {
            let as_of = as_of.unwrap_or(today);
            let lines = reports::bank_report(app.db(), as_of).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&lines)?);
            } else {
                for line in &lines {
                    println!("{}", line.to_record());
                }
            }
        }
        Commands::Income { from, to } => {
            let report = reports::income(app.db(), *from, *to).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Income {}..{}: {} from {} payments",
                    report.from, report.to, report.total, report.payment_count
                );
            }
        }
        Commands::Preview {
            tariff,
            days_in_period,
            days_used,
        } => {
            let tariff = store::get_tariff_by_name(app.db().pool(), tariff)
                .await?
                .ok_or_else(|| AppError::TariffNotFound(tariff.clone()))?;
            let amount = prorated_charge(tariff.monthly_price, *days_in_period, *days_used)?;
            if cli.json {
                println!("{}", serde_json::json!({ "amount": amount }));
            } else {
                println!(
                    "{} for {}/{} days of {} ({})",
                    amount, days_used, days_in_period, tariff.name, tariff.monthly_price
                );
            }
        }
    }

    Ok(())
}
