//! Money helpers shared by the order and billing aggregates.
//!
//! Amounts are stored as `f64` and rounded to two decimal places (half away from
//! zero) whenever a total is derived, so sums of snapshotted line prices compare
//! exactly against stored totals.

use crate::errors::{Error, Result};

/// Rounds an amount to cents.
#[must_use]
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Rejects NaN, infinities and negative amounts.
pub fn require_non_negative(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

/// Rejects zero and negative quantities.
pub const fn require_positive_quantity(quantity: i32) -> Result<i32> {
    if quantity <= 0 {
        return Err(Error::InvalidQuantity { quantity });
    }
    Ok(quantity)
}

/// Sum of `unit_price * quantity` over a set of lines, rounded to cents.
pub fn sum_lines<I>(lines: I) -> f64
where
    I: IntoIterator<Item = (f64, i32)>,
{
    round_money(
        lines
            .into_iter()
            .map(|(unit_price, quantity)| unit_price * f64::from(quantity))
            .sum(),
    )
}
