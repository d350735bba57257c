//! Report queries.

mod common;

use common::{date, money, spawn};
use subscriber_billing::models::{CreatePayment, Currency, PaymentStatus, SubscriberStatus};
use subscriber_billing::reports;

#[tokio::test]
async fn debtors_lists_negative_balances_worst_first() {
    let app = spawn().await;
    app.add_tariff("Basic", "900.00").await;
    app.add_tariff("Premium", "1500.00").await;
    let small = app
        .add_subscriber(100001, "Petrov Ivan", "Basic", date(2025, 11, 3))
        .await;
    let big = app
        .add_subscriber(100002, "Sidorov Oleg", "Premium", date(2025, 11, 3))
        .await;
    let paid = app
        .add_subscriber(100003, "Ivanov Petr", "Basic", date(2025, 11, 3))
        .await;

    subscriber_billing::engine::run_accrual_pass(&app.db, date(2026, 1, 15))
        .await
        .unwrap();

    app.db
        .record_payment(&CreatePayment {
            client_id: paid.id,
            amount: money("900.00"),
            currency: Currency::Rub,
            status: PaymentStatus::Succeeded,
            external_id: "bank-010".to_string(),
            payment_date: date(2026, 1, 16),
        })
        .await
        .unwrap();

    let debtors = reports::debtors(&app.db).await.unwrap();

    let ids: Vec<_> = debtors.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![big.id, small.id]);
    assert!(debtors.iter().all(|s| s.is_debtor()));
}

#[tokio::test]
async fn movement_counts_changes_in_the_given_month_only() {
    let app = spawn().await;
    app.add_tariff("Basic", "900.00").await;
    // Connected this month.
    app.add_subscriber(100001, "Petrov Ivan", "Basic", date(2026, 4, 5))
        .await;
    // Connected earlier, paused this month.
    let paused = app
        .add_subscriber(100002, "Sidorov Oleg", "Basic", date(2026, 1, 5))
        .await;
    app.set_status(paused.id, SubscriberStatus::Paused, date(2026, 4, 11))
        .await;
    // Disconnected last month; must not count.
    let gone = app
        .add_subscriber(100003, "Ivanov Petr", "Basic", date(2026, 1, 5))
        .await;
    app.set_status(gone.id, SubscriberStatus::Disconnected, date(2026, 3, 20))
        .await;

    let report = reports::movement(&app.db, date(2026, 4, 15)).await.unwrap();

    assert_eq!(report.connections, 1);
    assert_eq!(report.pauses, 1);
    assert_eq!(report.disconnections, 0);
}

#[tokio::test]
async fn income_sums_succeeded_payments_inside_the_range_only() {
    let app = spawn().await;
    app.add_tariff("Basic", "900.00").await;
    let s = app
        .add_subscriber(100001, "Petrov Ivan", "Basic", date(2026, 1, 5))
        .await;

    for (external_id, day, amount, status) in [
        // Before the range.
        ("p-early", date(2026, 3, 20), "100.00", PaymentStatus::Succeeded),
        ("p-1", date(2026, 4, 2), "200.00", PaymentStatus::Succeeded),
        ("p-2", date(2026, 4, 20), "450.50", PaymentStatus::Succeeded),
        // In range, but not settled.
        ("p-pending", date(2026, 4, 22), "300.00", PaymentStatus::Pending),
        ("p-failed", date(2026, 4, 25), "999.00", PaymentStatus::Failed),
        // After the range.
        ("p-late", date(2026, 5, 1), "100.00", PaymentStatus::Succeeded),
    ] {
        app.db
            .record_payment(&CreatePayment {
                client_id: s.id,
                amount: money(amount),
                currency: Currency::Rub,
                status,
                external_id: external_id.to_string(),
                payment_date: day,
            })
            .await
            .unwrap();
    }

    let report = reports::income(&app.db, date(2026, 4, 1), date(2026, 4, 30))
        .await
        .unwrap();

    assert_eq!(report.total, money("650.50"));
    assert_eq!(report.payment_count, 2);
}

#[tokio::test]
async fn bank_report_uses_the_latest_succeeded_payment_of_the_month() {
    let app = spawn().await;
    app.add_tariff("Basic", "900.00").await;
    let s = app
        .add_subscriber(100234, "Petrov Ivan Sergeevich", "Basic", date(2026, 1, 5))
        .await;
    // Subscriber with no payment this month is omitted.
    app.add_subscriber(100235, "Sidorov Oleg", "Basic", date(2026, 1, 5))
        .await;

    for (external_id, day, amount, status) in [
        ("p-1", date(2026, 4, 2), "200.00", PaymentStatus::Succeeded),
        ("p-2", date(2026, 4, 20), "450.50", PaymentStatus::Succeeded),
        // Failed payment later in the month must not win.
        ("p-3", date(2026, 4, 25), "999.00", PaymentStatus::Failed),
    ] {
        app.db
            .record_payment(&CreatePayment {
                client_id: s.id,
                amount: money(amount),
                currency: Currency::Rub,
                status,
                external_id: external_id.to_string(),
                payment_date: day,
            })
            .await
            .unwrap();
    }

    let lines = reports::bank_report(&app.db, date(2026, 4, 30)).await.unwrap();

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].personal_account, 100234);
    assert_eq!(lines[0].short_name, "Petrov IS");
    assert_eq!(lines[0].to_record(), "100234;Petrov IS;;TV;;450.50");
}
