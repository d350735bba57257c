//! Charge calculator.
//!
//! Pure functions; tariff resolution happens before these are called.

use billing_core::error::AppError;
use billing_core::money::Money;
use rust_decimal::{Decimal, RoundingStrategy};

/// A full billing period costs exactly the tariff price. No extra rounding
/// beyond the currency's native precision.
pub fn monthly_charge(tariff_price: Money) -> Money {
    tariff_price
}

/// Prorated charge for `days_used` out of `days_in_period`.
///
/// Computes `tariff_price * days_used / days_in_period`, multiplying before
/// dividing so a single division is the only rounding source, then rounds
/// half-away-from-zero to 2 decimal places.
///
/// `days_used <= 0` yields a zero charge. `days_used > days_in_period` is a
/// caller error and is rejected rather than clamped.
pub fn prorated_charge(
    tariff_price: Money,
    days_in_period: u32,
    days_used: i64,
) -> Result<Money, AppError> {
    if days_in_period == 0 {
        return Err(AppError::InvalidProration(
            "days_in_period must be positive".to_string(),
        ));
    }
    if days_used <= 0 {
        return Ok(Money::ZERO);
    }
    if days_used > i64::from(days_in_period) {
        return Err(AppError::InvalidProration(format!(
            "days_used {} exceeds days_in_period {}",
            days_used, days_in_period
        )));
    }

    let raw = tariff_price.amount() * Decimal::from(days_used) / Decimal::from(days_in_period);
    Ok(Money(raw.round_dp_with_strategy(
        2,
        RoundingStrategy::MidpointAwayFromZero,
    )))
}
