//! Query layer.
//!
//! Every function takes a generic SQLite executor, so callers can run a
//! query against the pool or thread one transaction through a whole
//! sequence of calls. The accrual scheduler relies on the latter: a full
//! pass shares a single transaction and either commits everything or
//! nothing.

use billing_core::error::AppError;
use billing_core::money::Money;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::Sqlite;
use sqlx::Executor;

use crate::models::{
    Accrual, CreateAccrual, CreatePayment, CreateSubscriber, CreateTariff, Payment, Subscriber,
    SubscriberStatus, Tariff, UpdateSubscriber, UpdateTariff,
};

// =========================================================================
// Tariff operations
// =========================================================================

/// Create a new tariff. A duplicate name (case-insensitive) is a conflict.
pub async fn create_tariff<'e, E>(executor: E, input: &CreateTariff) -> Result<Tariff, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    sqlx::query_as::<_, Tariff>(
        r#"
        INSERT INTO tariffs (name, monthly_price, is_active, created_utc, updated_utc)
        VALUES (?1, ?2, 1, ?3, ?3)
        RETURNING id, name, monthly_price, is_active, created_utc, updated_utc
        "#,
    )
    .bind(&input.name)
    .bind(input.monthly_price)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(anyhow::anyhow!("Tariff '{}' already exists", input.name))
        }
        _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create tariff: {}", e)),
    })
}

/// Get a tariff by ID.
pub async fn get_tariff_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Tariff>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Tariff>(
        r#"
        SELECT id, name, monthly_price, is_active, created_utc, updated_utc
        FROM tariffs
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get tariff: {}", e)))
}

/// Get a tariff by name, case-insensitively.
pub async fn get_tariff_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Tariff>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Tariff>(
        r#"
        SELECT id, name, monthly_price, is_active, created_utc, updated_utc
        FROM tariffs
        WHERE lower(name) = lower(?1)
        "#,
    )
    .bind(name)
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get tariff by name: {}", e)))
}

/// List all tariffs, by name.
pub async fn list_tariffs<'e, E>(executor: E) -> Result<Vec<Tariff>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Tariff>(
        r#"
        SELECT id, name, monthly_price, is_active, created_utc, updated_utc
        FROM tariffs
        ORDER BY name
        "#,
    )
    .fetch_all(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list tariffs: {}", e)))
}

/// Update a tariff row. `None` fields keep their current value. Rename
/// cascading to subscribers is orchestrated by [`Database::update_tariff`].
///
/// [`Database::update_tariff`]: crate::services::Database::update_tariff
pub async fn update_tariff<'e, E>(
    executor: E,
    id: i64,
    input: &UpdateTariff,
) -> Result<Option<Tariff>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Tariff>(
        r#"
        UPDATE tariffs
        SET name = COALESCE(?2, name),
            monthly_price = COALESCE(?3, monthly_price),
            is_active = COALESCE(?4, is_active),
            updated_utc = ?5
        WHERE id = ?1
        RETURNING id, name, monthly_price, is_active, created_utc, updated_utc
        "#,
    )
    .bind(id)
    .bind(&input.name)
    .bind(input.monthly_price)
    .bind(input.is_active)
    .bind(Utc::now())
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update tariff: {}", e)))
}

/// Delete a tariff. Returns whether a row was removed.
pub async fn delete_tariff<'e, E>(executor: E, id: i64) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM tariffs WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete tariff: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

// =========================================================================
// Subscriber operations
// =========================================================================

const SUBSCRIBER_COLUMNS: &str = "id, personal_account, full_name, address, phone_number, tariff, \
     balance, status, status_date, connection_date, last_accrual_date, created_utc, updated_utc";

/// Create a subscriber. Starts out connected as of `connection_date`.
pub async fn create_subscriber<'e, E>(
    executor: E,
    input: &CreateSubscriber,
) -> Result<Subscriber, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    sqlx::query_as::<_, Subscriber>(&format!(
        r#"
        INSERT INTO subscribers
            (personal_account, full_name, address, phone_number, tariff, balance,
             status, status_date, connection_date, created_utc, updated_utc)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?9, ?9)
        RETURNING {SUBSCRIBER_COLUMNS}
        "#
    ))
    .bind(input.personal_account)
    .bind(&input.full_name)
    .bind(&input.address)
    .bind(&input.phone_number)
    .bind(&input.tariff)
    .bind(input.balance)
    .bind(SubscriberStatus::Connected.as_str())
    .bind(input.connection_date)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => AppError::Conflict(
            anyhow::anyhow!("Personal account {} already exists", input.personal_account),
        ),
        _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create subscriber: {}", e)),
    })
}

/// Get a subscriber by ID.
pub async fn get_subscriber<'e, E>(executor: E, id: i64) -> Result<Option<Subscriber>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Subscriber>(&format!(
        "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get subscriber: {}", e)))
}

/// Get a subscriber by the externally-visible personal account number.
pub async fn get_subscriber_by_account<'e, E>(
    executor: E,
    personal_account: i64,
) -> Result<Option<Subscriber>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Subscriber>(&format!(
        "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE personal_account = ?1"
    ))
    .bind(personal_account)
    .fetch_optional(executor)
    .await
    .map_err(|e| {
        AppError::DatabaseError(anyhow::anyhow!("Failed to get subscriber by account: {}", e))
    })
}

/// List all subscribers in ledger order.
pub async fn list_subscribers<'e, E>(executor: E) -> Result<Vec<Subscriber>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Subscriber>(&format!(
        "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers ORDER BY id"
    ))
    .fetch_all(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list subscribers: {}", e)))
}

/// Search subscribers by partial name, address or personal-account match,
/// case-insensitively.
pub async fn search_subscribers<'e, E>(
    executor: E,
    term: &str,
) -> Result<Vec<Subscriber>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let pattern = format!("%{}%", term);
    sqlx::query_as::<_, Subscriber>(&format!(
        r#"
        SELECT {SUBSCRIBER_COLUMNS}
        FROM subscribers
        WHERE lower(full_name) LIKE lower(?1)
           OR lower(address) LIKE lower(?1)
           OR CAST(personal_account AS TEXT) LIKE ?1
        ORDER BY full_name
        "#
    ))
    .bind(pattern)
    .fetch_all(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to search subscribers: {}", e)))
}

/// Apply a patch to a subscriber. `None` fields keep their current value.
pub async fn update_subscriber<'e, E>(
    executor: E,
    id: i64,
    input: &UpdateSubscriber,
) -> Result<Option<Subscriber>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Subscriber>(&format!(
        r#"
        UPDATE subscribers
        SET full_name = COALESCE(?2, full_name),
            address = COALESCE(?3, address),
            phone_number = COALESCE(?4, phone_number),
            tariff = COALESCE(?5, tariff),
            balance = COALESCE(?6, balance),
            updated_utc = ?7
        WHERE id = ?1
        RETURNING {SUBSCRIBER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&input.full_name)
    .bind(&input.address)
    .bind(&input.phone_number)
    .bind(&input.tariff)
    .bind(input.balance)
    .bind(Utc::now())
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update subscriber: {}", e)))
}

/// Update `status` and `status_date` together. Carries no billing side
/// effects; charge orchestration belongs to the scheduler.
pub async fn set_status<'e, E>(
    executor: E,
    id: i64,
    status: SubscriberStatus,
    effective_date: NaiveDate,
) -> Result<Option<Subscriber>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Subscriber>(&format!(
        r#"
        UPDATE subscribers
        SET status = ?2, status_date = ?3, updated_utc = ?4
        WHERE id = ?1
        RETURNING {SUBSCRIBER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(effective_date)
    .bind(Utc::now())
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to set status: {}", e)))
}

/// Debit a charge from a subscriber's balance and stamp the last accrual
/// marker. Must run at most once per billing decision; the scheduler owns
/// the idempotency gate.
pub async fn apply_charge<'e, E>(
    executor: E,
    subscriber: &Subscriber,
    amount: Money,
    accrual_date: NaiveDate,
) -> Result<Money, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let new_balance = subscriber.balance - amount;
    sqlx::query(
        r#"
        UPDATE subscribers
        SET balance = ?2, last_accrual_date = ?3, updated_utc = ?4
        WHERE id = ?1
        "#,
    )
    .bind(subscriber.id)
    .bind(new_balance)
    .bind(accrual_date)
    .bind(Utc::now())
    .execute(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to apply charge: {}", e)))?;

    Ok(new_balance)
}

/// Overwrite a subscriber's balance (payment credits).
pub async fn update_balance<'e, E>(
    executor: E,
    id: i64,
    new_balance: Money,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE subscribers SET balance = ?2, updated_utc = ?3 WHERE id = ?1")
        .bind(id)
        .bind(new_balance)
        .bind(Utc::now())
        .execute(executor)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update balance: {}", e)))?;

    Ok(())
}

/// List subscribers with a negative balance, worst debt first.
pub async fn list_debtors<'e, E>(executor: E) -> Result<Vec<Subscriber>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Subscriber>(&format!(
        r#"
        SELECT {SUBSCRIBER_COLUMNS}
        FROM subscribers
        WHERE CAST(balance AS REAL) < 0.0
        ORDER BY CAST(balance AS REAL)
        "#
    ))
    .fetch_all(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list debtors: {}", e)))
}

// =========================================================================
// Accrual operations
// =========================================================================

/// Record an accrual. Rows are append-only and never updated afterwards.
pub async fn create_accrual<'e, E>(executor: E, input: &CreateAccrual) -> Result<Accrual, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Accrual>(
        r#"
        INSERT INTO accruals (client_id, amount, accrual_date, created_utc)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, client_id, amount, accrual_date, created_utc
        "#,
    )
    .bind(input.client_id)
    .bind(input.amount)
    .bind(input.accrual_date)
    .bind(Utc::now())
    .fetch_one(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create accrual: {}", e)))
}

/// The most recent accrual for a subscriber, by creation order. This is the
/// idempotency check: an accrual whose period covers the current month means
/// the subscriber is already billed for this cycle.
pub async fn last_accrual_for_subscriber<'e, E>(
    executor: E,
    client_id: i64,
) -> Result<Option<Accrual>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Accrual>(
        r#"
        SELECT id, client_id, amount, accrual_date, created_utc
        FROM accruals
        WHERE client_id = ?1
        ORDER BY created_utc DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(client_id)
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get last accrual: {}", e)))
}

/// Full accrual history for a subscriber, newest first.
pub async fn list_accruals_for_subscriber<'e, E>(
    executor: E,
    client_id: i64,
) -> Result<Vec<Accrual>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Accrual>(
        r#"
        SELECT id, client_id, amount, accrual_date, created_utc
        FROM accruals
        WHERE client_id = ?1
        ORDER BY created_utc DESC, id DESC
        "#,
    )
    .bind(client_id)
    .fetch_all(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list accruals: {}", e)))
}

// =========================================================================
// Payment operations
// =========================================================================

/// Insert a payment row. Balance crediting is orchestrated by
/// [`Database::record_payment`].
///
/// [`Database::record_payment`]: crate::services::Database::record_payment
pub async fn create_payment<'e, E>(executor: E, input: &CreatePayment) -> Result<Payment, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (client_id, amount, currency, status, external_id, payment_date, created_utc)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING id, client_id, amount, currency, status, external_id, payment_date, created_utc
        "#,
    )
    .bind(input.client_id)
    .bind(input.amount)
    .bind(input.currency.as_str())
    .bind(input.status.as_str())
    .bind(&input.external_id)
    .bind(input.payment_date)
    .bind(Utc::now())
    .fetch_one(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create payment: {}", e)))
}

/// List all payments, newest first.
pub async fn list_payments<'e, E>(executor: E) -> Result<Vec<Payment>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, client_id, amount, currency, status, external_id, payment_date, created_utc
        FROM payments
        ORDER BY payment_date DESC, id DESC
        "#,
    )
    .fetch_all(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))
}

/// Payments for one subscriber, newest first.
pub async fn list_payments_for_subscriber<'e, E>(
    executor: E,
    client_id: i64,
) -> Result<Vec<Payment>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, client_id, amount, currency, status, external_id, payment_date, created_utc
        FROM payments
        WHERE client_id = ?1
        ORDER BY payment_date DESC, id DESC
        "#,
    )
    .bind(client_id)
    .fetch_all(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))
}

/// Payments within a closed date range, oldest first.
pub async fn list_payments_in_range<'e, E>(
    executor: E,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Payment>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, client_id, amount, currency, status, external_id, payment_date, created_utc
        FROM payments
        WHERE payment_date >= ?1 AND payment_date <= ?2
        ORDER BY payment_date, id
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments in range: {}", e)))
}

/// The most recent succeeded payment a subscriber made in a given month.
/// Used by the bank reconciliation report.
pub async fn last_payment_in_month<'e, E>(
    executor: E,
    client_id: i64,
    year: i32,
    month: u32,
) -> Result<Option<Payment>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let month_prefix = format!("{:04}-{:02}", year, month);
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, client_id, amount, currency, status, external_id, payment_date, created_utc
        FROM payments
        WHERE client_id = ?1 AND status = 'succeeded' AND strftime('%Y-%m', payment_date) = ?2
        ORDER BY payment_date DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(client_id)
    .bind(month_prefix)
    .fetch_optional(executor)
    .await
    .map_err(|e| {
        AppError::DatabaseError(anyhow::anyhow!("Failed to get last payment in month: {}", e))
    })
}
