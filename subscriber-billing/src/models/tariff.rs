//! Tariff catalog model.

use billing_core::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named plan with a monthly price. Referenced by name from subscribers;
/// the price is read at accrual time, so later edits never change past
/// accruals.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tariff {
    pub id: i64,
    pub name: String,
    pub monthly_price: Money,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a tariff.
#[derive(Debug, Clone)]
pub struct CreateTariff {
    pub name: String,
    pub monthly_price: Money,
}

/// Input for updating a tariff. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateTariff {
    pub name: Option<String>,
    pub monthly_price: Option<Money>,
    pub is_active: Option<bool>,
}
