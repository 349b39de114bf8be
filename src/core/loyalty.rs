//! Loyalty ledger - Point balances keyed by mobile number.
//!
//! Points are only ever added here; redemption belongs to another part of the
//! back-office.

use crate::{
    entities::{LoyaltyCustomer, loyalty_customer},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*, sea_query::Expr};
use tracing::{debug, info};

/// Points earned for a bill total: one per full `unit` of currency.
#[must_use]
pub fn points_for_total(total: f64, unit: u32) -> i64 {
    if !total.is_finite() || total <= 0.0 || unit == 0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation)]
    let points = (total / f64::from(unit)).floor() as i64;
    points
}

/// Registers a customer with a zero balance.
pub async fn create_customer<C>(db: &C, mobile: &str, name: &str) -> Result<loyalty_customer::Model>
where
    C: ConnectionTrait,
{
    let mobile = mobile.trim();
    if mobile.is_empty() {
        return Err(Error::Config {
            message: "Mobile number cannot be empty".to_string(),
        });
    }

    loyalty_customer::ActiveModel {
        mobile: Set(mobile.to_string()),
        name: Set(name.trim().to_string()),
        total_loyalty_points: Set(0),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Looks a customer up by mobile number.
pub async fn find_by_mobile<C>(db: &C, mobile: &str) -> Result<Option<loyalty_customer::Model>>
where
    C: ConnectionTrait,
{
    LoyaltyCustomer::find()
        .filter(loyalty_customer::Column::Mobile.eq(mobile.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Adds points to the customer with this mobile number.
///
/// Returns `Ok(None)` without touching anything when no customer matches.
///
/// # Errors
/// Returns `InvalidAmount` for negative points.
pub async fn credit<C>(db: &C, mobile: &str, points: i64) -> Result<Option<loyalty_customer::Model>>
where
    C: ConnectionTrait,
{
    if points < 0 {
        #[allow(clippy::cast_precision_loss)]
        let amount = points as f64;
        return Err(Error::InvalidAmount { amount });
    }

    let Some(customer) = find_by_mobile(db, mobile).await? else {
        debug!(mobile, "No loyalty customer for mobile, skipping credit");
        return Ok(None);
    };

    if points == 0 {
        return Ok(Some(customer));
    }

    LoyaltyCustomer::update_many()
        .col_expr(
            loyalty_customer::Column::TotalLoyaltyPoints,
            Expr::col(loyalty_customer::Column::TotalLoyaltyPoints).add(points),
        )
        .filter(loyalty_customer::Column::Id.eq(customer.id))
        .exec(db)
        .await?;

    let updated = LoyaltyCustomer::find_by_id(customer.id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("loyalty_customer", customer.id))?;

    info!(
        customer_id = updated.id,
        points,
        balance = updated.total_loyalty_points,
        "Loyalty points credited"
    );
    Ok(Some(updated))
}
