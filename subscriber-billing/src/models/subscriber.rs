//! Subscriber ledger model.

use billing_core::money::Money;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Subscriber service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberStatus {
    Connected,
    Paused,
    Disconnected,
}

impl SubscriberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberStatus::Connected => "connected",
            SubscriberStatus::Paused => "paused",
            SubscriberStatus::Disconnected => "disconnected",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "paused" => SubscriberStatus::Paused,
            "disconnected" => SubscriberStatus::Disconnected,
            _ => SubscriberStatus::Connected,
        }
    }
}

/// Subscriber.
///
/// `balance` is mutated only by charge application and succeeded payments;
/// it may go negative (debt). `status` and `status_date` always change
/// together. `tariff` is a by-name reference resolved at charge time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscriber {
    pub id: i64,
    pub personal_account: i64,
    pub full_name: String,
    pub address: String,
    pub phone_number: Option<String>,
    pub tariff: String,
    pub balance: Money,
    pub status: String,
    pub status_date: Option<NaiveDate>,
    pub connection_date: NaiveDate,
    pub last_accrual_date: Option<NaiveDate>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Subscriber {
    pub fn status(&self) -> SubscriberStatus {
        SubscriberStatus::from_string(&self.status)
    }

    pub fn is_debtor(&self) -> bool {
        self.balance.is_negative()
    }
}

/// Input for creating a subscriber.
#[derive(Debug, Clone)]
pub struct CreateSubscriber {
    pub personal_account: i64,
    pub full_name: String,
    pub address: String,
    pub phone_number: Option<String>,
    pub tariff: String,
    pub balance: Money,
    pub connection_date: NaiveDate,
}

/// Patch for updating a subscriber. `None` fields are left untouched;
/// status changes go through `set_status`, never through this patch.
#[derive(Debug, Clone, Default)]
pub struct UpdateSubscriber {
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub tariff: Option<String>,
    pub balance: Option<Money>,
}
