//! Shared test harness.
//!
//! Each test gets its own SQLite file in a temp directory, fully migrated,
//! so tests are isolated and can run in parallel.

#![allow(dead_code)]

use billing_core::money::Money;
use billing_core::observability::init_tracing;
use chrono::NaiveDate;
use tempfile::TempDir;

use subscriber_billing::models::{
    CreateSubscriber, CreateTariff, Subscriber, SubscriberStatus, Tariff,
};
use subscriber_billing::services::Database;

pub struct TestApp {
    pub db: Database,
    // Dropped with the app, deleting the database file.
    _data_dir: TempDir,
}

pub async fn spawn() -> TestApp {
    init_tracing("warn");

    let data_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = data_dir.path().join("billing.db");
    let url = format!("sqlite://{}", db_path.display());

    let db = Database::new(&url, 5)
        .await
        .expect("Failed to open test database");
    db.run_migrations().await.expect("Failed to run migrations");

    TestApp {
        db,
        _data_dir: data_dir,
    }
}

pub fn money(s: &str) -> Money {
    s.parse().expect("Invalid money literal")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("Invalid date literal")
}

impl TestApp {
    pub async fn add_tariff(&self, name: &str, monthly_price: &str) -> Tariff {
        self.db
            .create_tariff(&CreateTariff {
                name: name.to_string(),
                monthly_price: money(monthly_price),
            })
            .await
            .expect("Failed to create tariff")
    }

    pub async fn add_subscriber(
        &self,
        personal_account: i64,
        full_name: &str,
        tariff: &str,
        connection_date: NaiveDate,
    ) -> Subscriber {
        self.db
            .create_subscriber(&CreateSubscriber {
                personal_account,
                full_name: full_name.to_string(),
                address: "1 Test St".to_string(),
                phone_number: None,
                tariff: tariff.to_string(),
                balance: Money::ZERO,
                connection_date,
            })
            .await
            .expect("Failed to create subscriber")
    }

    pub async fn set_status(
        &self,
        id: i64,
        status: SubscriberStatus,
        effective_date: NaiveDate,
    ) -> Subscriber {
        self.db
            .set_status(id, status, effective_date)
            .await
            .expect("Failed to set status")
            .expect("Subscriber not found")
    }

    pub async fn subscriber(&self, id: i64) -> Subscriber {
        self.db
            .get_subscriber(id)
            .await
            .expect("Failed to get subscriber")
            .expect("Subscriber not found")
    }
}
