//! Occupancy store - Table and room status.
//!
//! The settlement coordinator moves tables to `Occupied` when the first items are
//! committed and back to `Available` when the bill is settled. Rooms follow their
//! bookings. [`set_table_status`] and [`set_room_status`] are the manual overrides
//! used by the front desk.

use crate::{
    entities::{DiningTable, OccupancyStatus, Room, dining_table, room},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::debug;

/// Creates a table in the `Available` state.
pub async fn create_table<C>(db: &C, number: i32) -> Result<dining_table::Model>
where
    C: ConnectionTrait,
{
    if number <= 0 {
        return Err(Error::Config {
            message: format!("Table number must be positive, got {number}"),
        });
    }

    dining_table::ActiveModel {
        number: Set(number),
        status: Set(OccupancyStatus::Available),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a table by ID.
pub async fn get_table<C>(db: &C, table_id: i64) -> Result<dining_table::Model>
where
    C: ConnectionTrait,
{
    DiningTable::find_by_id(table_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("table", table_id))
}

/// Lists all tables ordered by number.
pub async fn list_tables(db: &DatabaseConnection) -> Result<Vec<dining_table::Model>> {
    DiningTable::find()
        .order_by_asc(dining_table::Column::Number)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sets a table's status unconditionally.
pub async fn set_table_status<C>(
    db: &C,
    table_id: i64,
    status: OccupancyStatus,
) -> Result<dining_table::Model>
where
    C: ConnectionTrait,
{
    let table = get_table(db, table_id).await?;
    if table.status == status {
        return Ok(table);
    }

    let previous = table.status;
    let mut active: dining_table::ActiveModel = table.into();
    active.status = Set(status);
    let updated = active.update(db).await?;
    debug!(table_id, from = %previous, to = %status, "Table status changed");
    Ok(updated)
}

/// Marks a table occupied. Already-occupied tables are left as they are.
pub async fn occupy_table<C>(db: &C, table_id: i64) -> Result<dining_table::Model>
where
    C: ConnectionTrait,
{
    set_table_status(db, table_id, OccupancyStatus::Occupied).await
}

/// Marks a table available again.
pub async fn release_table<C>(db: &C, table_id: i64) -> Result<dining_table::Model>
where
    C: ConnectionTrait,
{
    set_table_status(db, table_id, OccupancyStatus::Available).await
}

/// Creates a room in the `Available` state.
pub async fn create_room<C>(db: &C, number: &str) -> Result<room::Model>
where
    C: ConnectionTrait,
{
    if number.trim().is_empty() {
        return Err(Error::Config {
            message: "Room number cannot be empty".to_string(),
        });
    }

    room::ActiveModel {
        number: Set(number.trim().to_string()),
        status: Set(OccupancyStatus::Available),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a room by ID.
pub async fn get_room<C>(db: &C, room_id: i64) -> Result<room::Model>
where
    C: ConnectionTrait,
{
    Room::find_by_id(room_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("room", room_id))
}

/// Sets a room's status unconditionally.
pub async fn set_room_status<C>(
    db: &C,
    room_id: i64,
    status: OccupancyStatus,
) -> Result<room::Model>
where
    C: ConnectionTrait,
{
    let current = get_room(db, room_id).await?;
    if current.status == status {
        return Ok(current);
    }

    let previous = current.status;
    let mut active: room::ActiveModel = current.into();
    active.status = Set(status);
    let updated = active.update(db).await?;
    debug!(room_id, from = %previous, to = %status, "Room status changed");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_table_starts_available() -> Result<()> {
        let db = setup_test_db().await?;
        let table = create_table(&db, 7).await?;
        assert_eq!(table.number, 7);
        assert_eq!(table.status, OccupancyStatus::Available);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_table_rejects_duplicate_number() -> Result<()> {
        let db = setup_test_db().await?;
        create_table(&db, 3).await?;
        let result = create_table(&db, 3).await;
        assert!(matches!(result.unwrap_err(), Error::Database(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_occupy_and_release_table() -> Result<()> {
        let db = setup_test_db().await?;
        let table = create_table(&db, 1).await?;

        let occupied = occupy_table(&db, table.id).await?;
        assert_eq!(occupied.status, OccupancyStatus::Occupied);

        // Occupying twice is harmless
        let again = occupy_table(&db, table.id).await?;
        assert_eq!(again.status, OccupancyStatus::Occupied);

        let released = release_table(&db, table.id).await?;
        assert_eq!(released.status, OccupancyStatus::Available);
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_override_to_reserved() -> Result<()> {
        let db = setup_test_db().await?;
        let table = create_table(&db, 4).await?;
        let reserved = set_table_status(&db, table.id, OccupancyStatus::Reserved).await?;
        assert_eq!(reserved.status, OccupancyStatus::Reserved);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_table_and_room() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(matches!(
            get_table(&db, 42).await.unwrap_err(),
            Error::EntityNotFound { kind: "table", .. }
        ));
        assert!(matches!(
            get_room(&db, 42).await.unwrap_err(),
            Error::EntityNotFound { kind: "room", .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_tables_ordered_by_number() -> Result<()> {
        let db = setup_test_db().await?;
        create_table(&db, 9).await?;
        create_table(&db, 2).await?;
        let numbers: Vec<i32> = list_tables(&db).await?.iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec![2, 9]);
        Ok(())
    }

    #[tokio::test]
    async fn test_room_status() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_room(&db, " 204 ").await?;
        assert_eq!(created.number, "204");
        assert_eq!(created.status, OccupancyStatus::Available);

        let occupied = set_room_status(&db, created.id, OccupancyStatus::Occupied).await?;
        assert_eq!(occupied.status, OccupancyStatus::Occupied);
        Ok(())
    }
}
