//! Payment recording and balance credit behavior.

mod common;

use billing_core::error::AppError;
use common::{date, money, spawn};
use subscriber_billing::models::{CreatePayment, Currency, PaymentStatus};

#[tokio::test]
async fn succeeded_payment_credits_the_balance() {
    let app = spawn().await;
    app.add_tariff("Basic", "900.00").await;
    let s = app
        .add_subscriber(100001, "Petrov Ivan", "Basic", date(2026, 1, 5))
        .await;

    app.db
        .record_payment(&CreatePayment {
            client_id: s.id,
            amount: money("450.50"),
            currency: Currency::Rub,
            status: PaymentStatus::Succeeded,
            external_id: "bank-001".to_string(),
            payment_date: date(2026, 1, 10),
        })
        .await
        .unwrap();

    let s = app.subscriber(s.id).await;
    assert_eq!(s.balance, money("450.50"));
}

#[tokio::test]
async fn pending_payment_does_not_touch_the_balance() {
    let app = spawn().await;
    app.add_tariff("Basic", "900.00").await;
    let s = app
        .add_subscriber(100001, "Petrov Ivan", "Basic", date(2026, 1, 5))
        .await;

    let payment = app
        .db
        .record_payment(&CreatePayment {
            client_id: s.id,
            amount: money("450.50"),
            currency: Currency::Rub,
            status: PaymentStatus::Pending,
            external_id: "bank-002".to_string(),
            payment_date: date(2026, 1, 10),
        })
        .await
        .unwrap();

    assert_eq!(payment.status(), PaymentStatus::Pending);
    let s = app.subscriber(s.id).await;
    assert_eq!(s.balance, money("0.00"));
}

#[tokio::test]
async fn payment_for_an_unknown_subscriber_is_not_found() {
    let app = spawn().await;

    let err = app
        .db
        .record_payment(&CreatePayment {
            client_id: 9999,
            amount: money("100.00"),
            currency: Currency::Rub,
            status: PaymentStatus::Succeeded,
            external_id: "bank-003".to_string(),
            payment_date: date(2026, 1, 10),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(app.db.list_payments().await.unwrap().is_empty());
}

#[tokio::test]
async fn payment_clears_debt_from_an_accrual() {
    let app = spawn().await;
    app.add_tariff("Basic", "900.00").await;
    let s = app
        .add_subscriber(100001, "Petrov Ivan", "Basic", date(2025, 11, 3))
        .await;

    subscriber_billing::engine::run_accrual_pass(&app.db, date(2026, 1, 15))
        .await
        .unwrap();

    app.db
        .record_payment(&CreatePayment {
            client_id: s.id,
            amount: money("900.00"),
            currency: Currency::Rub,
            status: PaymentStatus::Succeeded,
            external_id: "bank-004".to_string(),
            payment_date: date(2026, 1, 20),
        })
        .await
        .unwrap();

    let s = app.subscriber(s.id).await;
    assert_eq!(s.balance, money("0.00"));
    assert!(!s.is_debtor());
}

#[tokio::test]
async fn range_listing_is_bounded_and_ordered() {
    let app = spawn().await;
    app.add_tariff("Basic", "900.00").await;
    let s = app
        .add_subscriber(100001, "Petrov Ivan", "Basic", date(2026, 1, 5))
        .await;

    for (external_id, day) in [("p-jan", date(2026, 1, 10)), ("p-feb", date(2026, 2, 10)), ("p-mar", date(2026, 3, 10))] {
        app.db
            .record_payment(&CreatePayment {
                client_id: s.id,
                amount: money("100.00"),
                currency: Currency::Rub,
                status: PaymentStatus::Succeeded,
                external_id: external_id.to_string(),
                payment_date: day,
            })
            .await
            .unwrap();
    }

    let in_range = app
        .db
        .list_payments_in_range(date(2026, 1, 15), date(2026, 3, 1))
        .await
        .unwrap();

    assert_eq!(in_range.len(), 1);
    assert_eq!(in_range[0].external_id, "p-feb");
}
