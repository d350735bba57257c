//! Domain models.

mod accrual;
mod payment;
mod subscriber;
mod tariff;

pub use accrual::{Accrual, CreateAccrual};
pub use payment::{CreatePayment, Currency, Payment, PaymentStatus};
pub use subscriber::{CreateSubscriber, Subscriber, SubscriberStatus, UpdateSubscriber};
pub use tariff::{CreateTariff, Tariff, UpdateTariff};
