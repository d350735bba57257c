//! Application startup and lifecycle management.

use billing_core::error::AppError;

use crate::config::BillingConfig;
use crate::services::Database;

/// Application container: a connected, migrated database handle.
pub struct Application {
    db: Database,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: BillingConfig) -> Result<Self, AppError> {
        let db = Database::new(&config.database.url, config.database.max_connections)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to database");
                e
            })?;

        db.health_check().await.map_err(|e| {
            tracing::error!(error = %e, "Database health check failed");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        tracing::info!(
            service_name = %config.service_name,
            database_url = %config.database.url,
            "Application ready"
        );

        Ok(Self { db })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}
