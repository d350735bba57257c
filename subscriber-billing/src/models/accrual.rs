//! Accrual model.

use billing_core::money::Money;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An immutable record of a charge applied to a subscriber for one billing
/// period. `accrual_date` marks the period being billed; `created_utc` is
/// wall-clock audit time. Corrections are new accruals, never edits.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Accrual {
    pub id: i64,
    pub client_id: i64,
    pub amount: Money,
    pub accrual_date: NaiveDate,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording an accrual.
#[derive(Debug, Clone)]
pub struct CreateAccrual {
    pub client_id: i64,
    pub amount: Money,
    pub accrual_date: NaiveDate,
}
