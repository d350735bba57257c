//! Accrual scheduler.
//!
//! One invocation walks every subscriber, decides whether and how much to
//! charge for the `as_of` billing month, and applies balance mutation plus
//! accrual record on a single transaction. Data-integrity problems (missing
//! tariff, bad proration input) are reported per subscriber and the pass
//! continues; any persistence failure aborts the pass and nothing commits.

use billing_core::error::AppError;
use billing_core::money::Money;
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::engine::calculator;
use crate::models::{CreateAccrual, SubscriberStatus};
use crate::services::{store, Database};

/// Why a subscriber was skipped in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// An accrual for the current billing month already exists.
    AlreadyBilled,
    /// Disconnected subscribers never accrue.
    Disconnected,
    /// Paused before the current month; no new liability this cycle.
    PausedPriorPeriod,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyBilled => "already_billed",
            SkipReason::Disconnected => "disconnected",
            SkipReason::PausedPriorPeriod => "paused_prior_period",
        }
    }
}

/// The billing decision for one subscriber in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingAction {
    Skip(SkipReason),
    FullMonth,
    Prorated { days_used: i64 },
}

/// Whether two dates fall in the same billing month.
fn same_period(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Number of days in the calendar month containing `date`.
pub(crate) fn days_in_month(date: NaiveDate) -> u32 {
    let first = date.with_day(1).unwrap_or(date);
    let next = first.checked_add_months(Months::new(1)).unwrap_or(first);
    next.signed_duration_since(first).num_days() as u32
}

/// The state-transition table for one subscriber.
///
/// Keyed on `(status, status changed this period?, connected this period?)`
/// after the idempotency gate. Day counts:
/// - new connection this month: the connection day itself is billable, so
///   `days_in_month - connection_day + 1`;
/// - resumed this month: billable from the day after the change, so
///   `days_in_month - status_day`;
/// - paused this month: billable days before the pause, so `status_day - 1`
///   (zero when paused on the 1st; a zero-amount accrual still marks the
///   period billed).
pub fn billing_decision(
    status: SubscriberStatus,
    connection_date: NaiveDate,
    status_date: Option<NaiveDate>,
    last_accrual_period: Option<NaiveDate>,
    as_of: NaiveDate,
) -> BillingAction {
    if let Some(period) = last_accrual_period {
        if same_period(period, as_of) {
            return BillingAction::Skip(SkipReason::AlreadyBilled);
        }
    }

    let status_changed_this_period = status_date.is_some_and(|d| same_period(d, as_of));
    let connected_this_period = same_period(connection_date, as_of);
    let month_days = i64::from(days_in_month(as_of));

    match status {
        SubscriberStatus::Disconnected => BillingAction::Skip(SkipReason::Disconnected),
        SubscriberStatus::Paused => {
            if status_changed_this_period {
                // Final partial-month charge for the days before the pause.
                let day = status_date.map(|d| i64::from(d.day())).unwrap_or(1);
                BillingAction::Prorated { days_used: day - 1 }
            } else {
                BillingAction::Skip(SkipReason::PausedPriorPeriod)
            }
        }
        SubscriberStatus::Connected => {
            if connected_this_period {
                let day = i64::from(connection_date.day());
                BillingAction::Prorated {
                    days_used: month_days - day + 1,
                }
            } else if status_changed_this_period {
                // Resumed from pause this month.
                let day = status_date.map(|d| i64::from(d.day())).unwrap_or(1);
                BillingAction::Prorated {
                    days_used: month_days - day,
                }
            } else {
                BillingAction::FullMonth
            }
        }
    }
}

/// Outcome of one accrual pass, surfaced to the UI for confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct AccrualRunSummary {
    pub run_id: Uuid,
    pub as_of: NaiveDate,
    pub started_utc: DateTime<Utc>,
    pub completed_utc: DateTime<Utc>,
    /// Subscribers charged this pass.
    pub charged: Vec<i64>,
    /// Subscribers evaluated and skipped, with the reason.
    pub skipped: Vec<(i64, SkipReason)>,
    /// Subscribers that could not be billed, with the reason. Their state
    /// is untouched.
    pub errors: Vec<(i64, String)>,
}

impl AccrualRunSummary {
    pub fn processed(&self) -> usize {
        self.charged.len() + self.skipped.len() + self.errors.len()
    }
}

/// Run one accrual pass over every subscriber as of `as_of`.
///
/// The whole pass runs in a single transaction: all balance mutations and
/// accrual records become visible together, or not at all. Running twice
/// for the same month charges nobody the second time.
#[tracing::instrument(skip(db), fields(as_of = %as_of))]
pub async fn run_accrual_pass(
    db: &Database,
    as_of: NaiveDate,
) -> Result<AccrualRunSummary, AppError> {
    let run_id = Uuid::new_v4();
    let started_utc = Utc::now();

    tracing::info!(run_id = %run_id, "Starting accrual pass");

    let mut tx = db.pool().begin().await.map_err(|e| {
        AppError::DatabaseError(anyhow::anyhow!("Failed to begin accrual pass: {}", e))
    })?;

    let subscribers = store::list_subscribers(&mut *tx).await?;

    let mut charged = Vec::new();
    let mut skipped = Vec::new();
    let mut errors = Vec::new();

    for subscriber in subscribers {
        let last_accrual = store::last_accrual_for_subscriber(&mut *tx, subscriber.id).await?;

        let action = billing_decision(
            subscriber.status(),
            subscriber.connection_date,
            subscriber.status_date,
            last_accrual.map(|a| a.accrual_date),
            as_of,
        );

        let days_used = match action {
            BillingAction::Skip(reason) => {
                tracing::debug!(
                    subscriber_id = subscriber.id,
                    reason = reason.as_str(),
                    "Subscriber skipped"
                );
                skipped.push((subscriber.id, reason));
                continue;
            }
            BillingAction::FullMonth => None,
            BillingAction::Prorated { days_used } => Some(days_used),
        };

        let Some(tariff) = store::get_tariff_by_name(&mut *tx, &subscriber.tariff).await? else {
            tracing::warn!(
                subscriber_id = subscriber.id,
                tariff = %subscriber.tariff,
                "Tariff not found; subscriber not billed"
            );
            errors.push((
                subscriber.id,
                AppError::TariffNotFound(subscriber.tariff.clone()).to_string(),
            ));
            continue;
        };

        let amount: Money = match days_used {
            None => calculator::monthly_charge(tariff.monthly_price),
            Some(days) => {
                match calculator::prorated_charge(tariff.monthly_price, days_in_month(as_of), days)
                {
                    Ok(amount) => amount,
                    Err(e) => {
                        tracing::warn!(
                            subscriber_id = subscriber.id,
                            error = %e,
                            "Proration rejected; subscriber not billed"
                        );
                        errors.push((subscriber.id, e.to_string()));
                        continue;
                    }
                }
            }
        };

        let new_balance = store::apply_charge(&mut *tx, &subscriber, amount, as_of).await?;
        store::create_accrual(
            &mut *tx,
            &CreateAccrual {
                client_id: subscriber.id,
                amount,
                accrual_date: as_of,
            },
        )
        .await?;

        tracing::info!(
            subscriber_id = subscriber.id,
            amount = %amount,
            new_balance = %new_balance,
            "Charge applied"
        );
        charged.push(subscriber.id);
    }

    tx.commit().await.map_err(|e| {
        AppError::DatabaseError(anyhow::anyhow!("Failed to commit accrual pass: {}", e))
    })?;

    let summary = AccrualRunSummary {
        run_id,
        as_of,
        started_utc,
        completed_utc: Utc::now(),
        charged,
        skipped,
        errors,
    };

    tracing::info!(
        run_id = %run_id,
        processed = summary.processed(),
        charged = summary.charged.len(),
        skipped = summary.skipped.len(),
        errors = summary.errors.len(),
        "Accrual pass committed"
    );

    Ok(summary)
}
