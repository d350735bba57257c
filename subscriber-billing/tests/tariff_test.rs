//! Tariff catalog behavior.

mod common;

use billing_core::error::AppError;
use common::{date, money, spawn};
use subscriber_billing::models::UpdateTariff;

#[tokio::test]
async fn duplicate_tariff_name_is_a_conflict() {
    let app = spawn().await;
    app.add_tariff("Basic", "900.00").await;

    let err = app
        .db
        .create_tariff(&subscriber_billing::models::CreateTariff {
            name: "basic".to_string(),
            monthly_price: money("500.00"),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn tariff_lookup_is_case_insensitive() {
    let app = spawn().await;
    let created = app.add_tariff("Basic", "900.00").await;

    let found = app.db.get_tariff_by_name("BASIC").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.monthly_price, money("900.00"));
}

#[tokio::test]
async fn patch_update_leaves_unset_fields_alone() {
    let app = spawn().await;
    let tariff = app.add_tariff("Basic", "900.00").await;

    let updated = app
        .db
        .update_tariff(
            tariff.id,
            &UpdateTariff {
                monthly_price: Some(money("950.00")),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.name, "Basic");
    assert_eq!(updated.monthly_price, money("950.00"));
    assert!(updated.is_active);
}

#[tokio::test]
async fn renaming_a_tariff_cascades_to_its_subscribers() {
    let app = spawn().await;
    let tariff = app.add_tariff("Basic", "900.00").await;
    let s = app
        .add_subscriber(100001, "Petrov Ivan", "Basic", date(2026, 1, 5))
        .await;

    app.db
        .update_tariff(
            tariff.id,
            &UpdateTariff {
                name: Some("Standard".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let s = app.subscriber(s.id).await;
    assert_eq!(s.tariff, "Standard");
}

#[tokio::test]
async fn price_change_applies_to_the_next_pass_only() {
    let app = spawn().await;
    let tariff = app.add_tariff("Basic", "900.00").await;
    let s = app
        .add_subscriber(100001, "Petrov Ivan", "Basic", date(2025, 11, 3))
        .await;

    subscriber_billing::engine::run_accrual_pass(&app.db, date(2026, 1, 15))
        .await
        .unwrap();

    app.db
        .update_tariff(
            tariff.id,
            &UpdateTariff {
                monthly_price: Some(money("1000.00")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    subscriber_billing::engine::run_accrual_pass(&app.db, date(2026, 2, 15))
        .await
        .unwrap();

    let accruals = app.db.list_accruals_for_subscriber(s.id).await.unwrap();
    let mut amounts: Vec<_> = accruals.iter().map(|a| a.amount).collect();
    amounts.sort();
    assert_eq!(amounts, vec![money("900.00"), money("1000.00")]);
}
