//! Shared test utilities for the settlement engine.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        billing, booking, catalog, loyalty, occupancy,
        order::{self, CartLine},
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an inventoried, available menu item.
pub async fn create_stocked_item(
    db: &DatabaseConnection,
    name: &str,
    price: f64,
    stock: i64,
) -> Result<entities::menu_item::Model> {
    catalog::create_menu_item(db, name, price, Some(stock)).await
}

/// Sets up a test environment with table number 1.
/// Returns (db, table) for order-related tests.
pub async fn setup_with_table() -> Result<(DatabaseConnection, entities::dining_table::Model)> {
    let db = setup_test_db().await?;
    let table = occupancy::create_table(&db, 1).await?;
    Ok((db, table))
}

/// Sets up a test environment with room "101".
/// Returns (db, room) for booking-related tests.
pub async fn setup_with_room() -> Result<(DatabaseConnection, entities::room::Model)> {
    let db = setup_test_db().await?;
    let room = occupancy::create_room(&db, "101").await?;
    Ok((db, room))
}

/// Booking details with sensible defaults.
///
/// # Defaults
/// * `guest_name`: "Test Guest"
/// * `guest_mobile`: None
/// * `total_price`: 2000.0
/// * `advance_payment`: 0.0
#[must_use]
pub fn test_booking(room_id: i64) -> booking::NewBooking {
    booking::NewBooking {
        room_id,
        guest_name: "Test Guest".to_string(),
        guest_mobile: None,
        total_price: 2000.0,
        advance_payment: 0.0,
    }
}

/// Registers a loyalty customer holding `points`.
pub async fn create_customer_with_points(
    db: &DatabaseConnection,
    mobile: &str,
    points: i64,
) -> Result<entities::loyalty_customer::Model> {
    let customer = loyalty::create_customer(db, mobile, "Test Customer").await?;
    Ok(loyalty::credit(db, mobile, points).await?.unwrap_or(customer))
}

/// Raises an unpaid bill with a single line worth `subtotal`.
///
/// The line is a non-inventoried item sold once on a walk-in order, so the bill
/// has no table or booking to release on settlement.
pub async fn create_bill_for_amount(
    db: &DatabaseConnection,
    subtotal: f64,
) -> Result<entities::bill::Model> {
    let item = catalog::create_menu_item(db, "Test Item", subtotal, None).await?;
    let open = order::create_walk_in_order(db, "test_user").await?;
    order::add_items(db, open.id, &[CartLine::new(item.id, 1)]).await?;
    let closed = order::close_for_billing(db, open.id).await?;
    billing::create_bill_from_order(db, &closed, "BILL", "test_user").await
}
