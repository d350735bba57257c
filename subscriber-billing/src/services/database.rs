//! Database service: pool lifecycle plus the operations the UI and report
//! layers call. Single-statement queries live in [`store`]; methods here add
//! pool management and the multi-statement operations that need their own
//! transaction.

use std::str::FromStr;
use std::time::Duration;

use billing_core::error::AppError;
use billing_core::money::Money;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, instrument};

use crate::models::{
    Accrual, CreatePayment, CreateSubscriber, CreateTariff, Payment, PaymentStatus, Subscriber,
    SubscriberStatus, Tariff, UpdateSubscriber, UpdateTariff,
};
use crate::services::store;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the SQLite database behind `database_url`.
    #[instrument(skip(database_url))]
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        info!(max_connections = max_connections, "Opening SQLite database");

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("SQLite connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check database health.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // =====================================================================
    // Tariff operations
    // =====================================================================

    pub async fn create_tariff(&self, input: &CreateTariff) -> Result<Tariff, AppError> {
        let tariff = store::create_tariff(&self.pool, input).await?;
        info!(tariff_id = tariff.id, name = %tariff.name, "Tariff created");
        Ok(tariff)
    }

    pub async fn get_tariff_by_id(&self, id: i64) -> Result<Option<Tariff>, AppError> {
        store::get_tariff_by_id(&self.pool, id).await
    }

    pub async fn get_tariff_by_name(&self, name: &str) -> Result<Option<Tariff>, AppError> {
        store::get_tariff_by_name(&self.pool, name).await
    }

    pub async fn list_tariffs(&self) -> Result<Vec<Tariff>, AppError> {
        store::list_tariffs(&self.pool).await
    }

    /// Update a tariff. A rename cascades to every subscriber referencing
    /// the old name, in the same transaction, so the by-name reference never
    /// dangles.
    #[instrument(skip(self, input), fields(tariff_id = id))]
    pub async fn update_tariff(
        &self,
        id: i64,
        input: &UpdateTariff,
    ) -> Result<Option<Tariff>, AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let Some(existing) = store::get_tariff_by_id(&mut *tx, id).await? else {
            return Ok(None);
        };

        let updated = store::update_tariff(&mut *tx, id, input).await?;

        if let Some(ref tariff) = updated {
            if tariff.name != existing.name {
                sqlx::query("UPDATE subscribers SET tariff = ?1 WHERE tariff = ?2 COLLATE NOCASE")
                    .bind(&tariff.name)
                    .bind(&existing.name)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(anyhow::anyhow!(
                            "Failed to cascade tariff rename: {}",
                            e
                        ))
                    })?;
                info!(old = %existing.name, new = %tariff.name, "Tariff renamed, subscribers updated");
            }
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        Ok(updated)
    }

    pub async fn delete_tariff(&self, id: i64) -> Result<bool, AppError> {
        store::delete_tariff(&self.pool, id).await
    }

    // =====================================================================
    // Subscriber operations
    // =====================================================================

    pub async fn create_subscriber(&self, input: &CreateSubscriber) -> Result<Subscriber, AppError> {
        let subscriber = store::create_subscriber(&self.pool, input).await?;
        info!(
            subscriber_id = subscriber.id,
            personal_account = subscriber.personal_account,
            "Subscriber created"
        );
        Ok(subscriber)
    }

    pub async fn get_subscriber(&self, id: i64) -> Result<Option<Subscriber>, AppError> {
        store::get_subscriber(&self.pool, id).await
    }

    pub async fn get_subscriber_by_account(
        &self,
        personal_account: i64,
    ) -> Result<Option<Subscriber>, AppError> {
        store::get_subscriber_by_account(&self.pool, personal_account).await
    }

    pub async fn list_subscribers(&self) -> Result<Vec<Subscriber>, AppError> {
        store::list_subscribers(&self.pool).await
    }

    pub async fn search_subscribers(&self, term: &str) -> Result<Vec<Subscriber>, AppError> {
        store::search_subscribers(&self.pool, term).await
    }

    pub async fn update_subscriber(
        &self,
        id: i64,
        input: &UpdateSubscriber,
    ) -> Result<Option<Subscriber>, AppError> {
        store::update_subscriber(&self.pool, id, input).await
    }

    /// Status transition: stamps `status` and `status_date` atomically.
    #[instrument(skip(self), fields(subscriber_id = id))]
    pub async fn set_status(
        &self,
        id: i64,
        status: SubscriberStatus,
        effective_date: NaiveDate,
    ) -> Result<Option<Subscriber>, AppError> {
        let subscriber = store::set_status(&self.pool, id, status, effective_date).await?;
        if subscriber.is_some() {
            info!(status = status.as_str(), effective = %effective_date, "Subscriber status changed");
        }
        Ok(subscriber)
    }

    pub async fn list_debtors(&self) -> Result<Vec<Subscriber>, AppError> {
        store::list_debtors(&self.pool).await
    }

    // =====================================================================
    // Accrual operations
    // =====================================================================

    pub async fn last_accrual_for_subscriber(
        &self,
        client_id: i64,
    ) -> Result<Option<Accrual>, AppError> {
        store::last_accrual_for_subscriber(&self.pool, client_id).await
    }

    pub async fn list_accruals_for_subscriber(
        &self,
        client_id: i64,
    ) -> Result<Vec<Accrual>, AppError> {
        store::list_accruals_for_subscriber(&self.pool, client_id).await
    }

    // =====================================================================
    // Payment operations
    // =====================================================================

    /// Record a payment. A succeeded payment credits the subscriber balance
    /// in the same transaction; pending and failed payments are recorded
    /// without touching the balance.
    #[instrument(skip(self, input), fields(client_id = input.client_id))]
    pub async fn record_payment(&self, input: &CreatePayment) -> Result<Payment, AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let subscriber = store::get_subscriber(&mut *tx, input.client_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Subscriber {} not found", input.client_id))
            })?;

        let payment = store::create_payment(&mut *tx, input).await?;

        if input.status == PaymentStatus::Succeeded {
            let new_balance: Money = subscriber.balance + input.amount;
            store::update_balance(&mut *tx, subscriber.id, new_balance).await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        info!(payment_id = payment.id, amount = %payment.amount, status = %payment.status, "Payment recorded");

        Ok(payment)
    }

    pub async fn list_payments(&self) -> Result<Vec<Payment>, AppError> {
        store::list_payments(&self.pool).await
    }

    pub async fn list_payments_for_subscriber(
        &self,
        client_id: i64,
    ) -> Result<Vec<Payment>, AppError> {
        store::list_payments_for_subscriber(&self.pool, client_id).await
    }

    pub async fn list_payments_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Payment>, AppError> {
        store::list_payments_in_range(&self.pool, from, to).await
    }
}
