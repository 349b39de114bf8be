//! Booking aggregate - Room stays and their incidental charges.
//!
//! Incidental sales are posted through the same coordinator path as table orders
//! and accumulate in `extra_charges`, which is always the sum of the booking's
//! charge rows. Room status follows the booking: reserved when confirmed,
//! occupied on check-in, available again on cancellation or checkout.

use crate::{
    core::{
        billing, catalog,
        money::{require_non_negative, sum_lines},
        occupancy,
        order::{CartLine, normalize_cart},
    },
    entities::{
        Booking, BookingCharge, BookingStatus, OccupancyStatus, booking, booking_charge,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info};

/// Details for a new booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    /// Room to reserve
    pub room_id: i64,
    /// Guest name
    pub guest_name: String,
    /// Guest mobile for loyalty lookup
    pub guest_mobile: Option<String>,
    /// Room charge for the stay
    pub total_price: f64,
    /// Amount paid up front
    pub advance_payment: f64,
}

/// Finds a booking by ID.
pub async fn get_booking<C>(db: &C, booking_id: i64) -> Result<booking::Model>
where
    C: ConnectionTrait,
{
    Booking::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("booking", booking_id))
}

/// Returns a booking's charges in posting order.
pub async fn get_booking_charges<C>(db: &C, booking_id: i64) -> Result<Vec<booking_charge::Model>>
where
    C: ConnectionTrait,
{
    BookingCharge::find()
        .filter(booking_charge::Column::BookingId.eq(booking_id))
        .order_by_asc(booking_charge::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a confirmed booking and reserves its room in one transaction.
///
/// # Errors
/// Returns an error if:
/// - The guest name is empty
/// - The room charge or advance is negative or not finite
/// - The room does not exist or is not available
pub async fn create_booking(db: &DatabaseConnection, details: NewBooking) -> Result<booking::Model> {
    if details.guest_name.trim().is_empty() {
        return Err(Error::Config {
            message: "Guest name cannot be empty".to_string(),
        });
    }
    require_non_negative(details.total_price)?;
    require_non_negative(details.advance_payment)?;

    // Use a transaction to ensure atomicity
    let txn = db.begin().await?;

    let room = occupancy::get_room(&txn, details.room_id).await?;
    if room.status != OccupancyStatus::Available {
        return Err(Error::InvalidTransition {
            kind: "room",
            id: room.id,
            from: room.status.to_string(),
            action: "book",
        });
    }

    let now = chrono::Utc::now();
    let created = booking::ActiveModel {
        room_id: Set(room.id),
        guest_name: Set(details.guest_name.trim().to_string()),
        guest_mobile: Set(details
            .guest_mobile
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())),
        status: Set(BookingStatus::Confirmed),
        total_price: Set(details.total_price),
        extra_charges: Set(0.0),
        advance_payment: Set(details.advance_payment),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    occupancy::set_room_status(&txn, room.id, OccupancyStatus::Reserved).await?;

    txn.commit().await?;

    info!(booking_id = created.id, room_id = room.id, "Booking confirmed");
    Ok(created)
}

async fn set_status<C>(
    db: &C,
    booking: booking::Model,
    status: BookingStatus,
) -> Result<booking::Model>
where
    C: ConnectionTrait,
{
    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(status);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Confirmed → checked-in; the room becomes occupied.
pub async fn check_in<C>(db: &C, booking_id: i64) -> Result<booking::Model>
where
    C: ConnectionTrait,
{
    let current = get_booking(db, booking_id).await?;
    if !current.status.can_check_in() {
        return Err(Error::InvalidTransition {
            kind: "booking",
            id: booking_id,
            from: current.status.to_string(),
            action: "check in",
        });
    }

    let room_id = current.room_id;
    let updated = set_status(db, current, BookingStatus::CheckedIn).await?;
    occupancy::set_room_status(db, room_id, OccupancyStatus::Occupied).await?;
    Ok(updated)
}

/// Confirmed → cancelled; the room becomes available.
pub async fn cancel<C>(db: &C, booking_id: i64) -> Result<booking::Model>
where
    C: ConnectionTrait,
{
    let current = get_booking(db, booking_id).await?;
    if !current.status.can_cancel() {
        return Err(Error::InvalidTransition {
            kind: "booking",
            id: booking_id,
            from: current.status.to_string(),
            action: "cancel",
        });
    }

    let room_id = current.room_id;
    let updated = set_status(db, current, BookingStatus::Cancelled).await?;
    occupancy::set_room_status(db, room_id, OccupancyStatus::Available).await?;
    Ok(updated)
}

/// Checked-in → checked-out. The room is released by the caller.
pub async fn mark_checked_out<C>(db: &C, booking_id: i64) -> Result<booking::Model>
where
    C: ConnectionTrait,
{
    let current = get_booking(db, booking_id).await?;
    if current.status != BookingStatus::CheckedIn {
        return Err(Error::InvalidTransition {
            kind: "booking",
            id: booking_id,
            from: current.status.to_string(),
            action: "check out",
        });
    }
    set_status(db, current, BookingStatus::CheckedOut).await
}

/// Posts cart lines as charges on a checked-in booking at current catalog prices.
///
/// Stock is reserved by the coordinator in the same transaction. Once the
/// checkout bill is issued the booking takes no more charges until that bill is
/// settled, so every charge ends up on a bill.
///
/// # Errors
/// Returns `BookingNotActive` unless the guest is checked in and
/// `BillAlreadyIssued` while the checkout bill is outstanding.
pub async fn add_charges<C>(
    db: &C,
    booking_id: i64,
    lines: &[CartLine],
    actor_id: &str,
) -> Result<booking::Model>
where
    C: ConnectionTrait,
{
    let lines = normalize_cart(lines)?;
    let current = get_booking(db, booking_id).await?;
    if !current.status.accepts_charges() {
        return Err(Error::BookingNotActive {
            booking_id,
            status: current.status.to_string(),
        });
    }
    if let Some(pending) = billing::get_unpaid_booking_bill(db, booking_id).await? {
        return Err(Error::BillAlreadyIssued {
            booking_id,
            bill_number: pending.bill_number,
        });
    }

    let now = chrono::Utc::now();
    for line in &lines {
        let item = catalog::get_item(db, line.menu_item_id).await?;
        booking_charge::ActiveModel {
            booking_id: Set(booking_id),
            menu_item_id: Set(item.id),
            name: Set(item.name),
            unit_price: Set(item.price),
            quantity: Set(line.quantity),
            created_by: Set(actor_id.to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    let charges = get_booking_charges(db, booking_id).await?;
    let extra = sum_lines(charges.iter().map(|c| (c.unit_price, c.quantity)));

    let mut active: booking::ActiveModel = current.into();
    active.extra_charges = Set(extra);
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    debug!(
        booking_id,
        lines = lines.len(),
        extra_charges = updated.extra_charges,
        "Charges posted to booking"
    );
    Ok(updated)
}
