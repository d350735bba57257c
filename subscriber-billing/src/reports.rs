//! Read-only reporting queries.
//!
//! Debtors, monthly subscriber movement, and the bank reconciliation
//! export. All reads, no mutation; each report runs on the pool directly.

use billing_core::error::AppError;
use billing_core::money::Money;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{PaymentStatus, Subscriber, SubscriberStatus};
use crate::services::{store, Database};

/// Subscribers with a negative balance, worst debt first.
pub async fn debtors(db: &Database) -> Result<Vec<Subscriber>, AppError> {
    store::list_debtors(db.pool()).await
}

/// Connections, pauses and disconnections whose effective date falls in
/// the month of `as_of`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MovementReport {
    pub connections: u32,
    pub pauses: u32,
    pub disconnections: u32,
}

pub async fn movement(db: &Database, as_of: NaiveDate) -> Result<MovementReport, AppError> {
    let subscribers = store::list_subscribers(db.pool()).await?;

    let in_month = |d: NaiveDate| d.year() == as_of.year() && d.month() == as_of.month();

    let mut report = MovementReport::default();
    for subscriber in &subscribers {
        if in_month(subscriber.connection_date) {
            report.connections += 1;
        }
        if let Some(status_date) = subscriber.status_date {
            if in_month(status_date) {
                match subscriber.status() {
                    SubscriberStatus::Paused => report.pauses += 1,
                    SubscriberStatus::Disconnected => report.disconnections += 1,
                    SubscriberStatus::Connected => {}
                }
            }
        }
    }

    Ok(report)
}

/// Income over a closed date range: succeeded payments only.
#[derive(Debug, Clone, Serialize)]
pub struct IncomeReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total: Money,
    pub payment_count: u32,
}

pub async fn income(
    db: &Database,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<IncomeReport, AppError> {
    let payments = store::list_payments_in_range(db.pool(), from, to).await?;

    let mut total = Money::ZERO;
    let mut payment_count = 0;
    for payment in payments
        .iter()
        .filter(|p| p.status() == PaymentStatus::Succeeded)
    {
        total += payment.amount;
        payment_count += 1;
    }

    Ok(IncomeReport {
        from,
        to,
        total,
        payment_count,
    })
}

/// One line of the bank reconciliation export.
#[derive(Debug, Clone, Serialize)]
pub struct BankReportLine {
    pub personal_account: i64,
    pub short_name: String,
    pub amount: Money,
}

impl BankReportLine {
    /// Serialize in the bank's fixed semicolon format.
    pub fn to_record(&self) -> String {
        format!(
            "{};{};;TV;;{}",
            self.personal_account, self.short_name, self.amount
        )
    }
}

/// Surname plus initials: "Petrov Ivan Sergeevich" -> "Petrov IS".
fn short_name(full_name: &str) -> String {
    let mut parts = full_name.split_whitespace();
    let Some(surname) = parts.next() else {
        return String::new();
    };
    let initials: String = parts
        .filter_map(|p| p.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect();
    if initials.is_empty() {
        surname.to_string()
    } else {
        format!("{} {}", surname, initials)
    }
}

/// Bank reconciliation lines for the month of `as_of`: each subscriber's
/// most recent succeeded payment in that month. Subscribers without one
/// are omitted.
pub async fn bank_report(db: &Database, as_of: NaiveDate) -> Result<Vec<BankReportLine>, AppError> {
    let subscribers = store::list_subscribers(db.pool()).await?;

    let mut lines = Vec::new();
    for subscriber in &subscribers {
        let payment = store::last_payment_in_month(
            db.pool(),
            subscriber.id,
            as_of.year(),
            as_of.month(),
        )
        .await?;

        let Some(payment) = payment else { continue };
        if payment.amount == Money::ZERO {
            continue;
        }

        lines.push(BankReportLine {
            personal_account: subscriber.personal_account,
            short_name: short_name(&subscriber.full_name),
            amount: payment.amount,
        });
    }

    tracing::debug!(lines = lines.len(), "Bank report assembled");
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn short_name_takes_surname_and_initials() {
        assert_eq!(short_name("Petrov Ivan Sergeevich"), "Petrov IS");
        assert_eq!(short_name("Smith John"), "Smith J");
        assert_eq!(short_name("Cher"), "Cher");
        assert_eq!(short_name(""), "");
    }

    #[test]
    fn bank_record_format() {
        let line = BankReportLine {
            personal_account: 100234,
            short_name: "Petrov IS".into(),
            amount: Money::new(dec!(450.50)),
        };
        assert_eq!(line.to_record(), "100234;Petrov IS;;TV;;450.50");
    }
}
