//! Catalog seed loading from config.toml
//!
//! The back-office normally manages menu items, tables and rooms through its own
//! CRUD screens. For a fresh store this module loads an initial set from a TOML file
//! and inserts whatever is missing, matching menu items by name and tables/rooms by
//! number so the seed can be re-run safely.

use crate::{
    core::{catalog, occupancy},
    entities::{DiningTable, MenuItem, Room, dining_table, menu_item, room},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire seed file
#[derive(Debug, Deserialize, Default)]
pub struct SeedConfig {
    /// Menu items to create
    #[serde(default)]
    pub menu_items: Vec<MenuItemSeed>,
    /// Table numbers to create
    #[serde(default)]
    pub tables: Vec<TableSeed>,
    /// Room numbers to create
    #[serde(default)]
    pub rooms: Vec<RoomSeed>,
}

/// Seed entry for a menu item
#[derive(Debug, Deserialize, Clone)]
pub struct MenuItemSeed {
    /// Display name
    pub name: String,
    /// Unit price
    pub price: f64,
    /// Initial stock; omit for non-inventoried items
    pub stock: Option<i64>,
    /// Whether the item starts out sellable
    #[serde(default = "default_available")]
    pub available: bool,
}

const fn default_available() -> bool {
    true
}

/// Seed entry for a dining table
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct TableSeed {
    /// Table number
    pub number: i32,
}

/// Seed entry for a room
#[derive(Debug, Deserialize, Clone)]
pub struct RoomSeed {
    /// Room number
    pub number: String,
}

/// Counts of rows inserted by [`apply_seed`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    /// Menu items created
    pub menu_items: usize,
    /// Tables created
    pub tables: usize,
    /// Rooms created
    pub rooms: usize,
}

/// Loads seed configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_seed<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let path = path.as_ref();
    debug!("Loading seed configuration from {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read seed file {}: {e}", path.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.display()),
    })
}

/// Inserts every seed entry that does not exist yet, all in one transaction.
///
/// An invalid entry aborts the whole seed and nothing is inserted.
pub async fn apply_seed(db: &DatabaseConnection, seed: &SeedConfig) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    let txn = db.begin().await?;

    for item in &seed.menu_items {
        let exists = MenuItem::find()
            .filter(menu_item::Column::Name.eq(item.name.trim()))
            .one(&txn)
            .await?
            .is_some();
        if exists {
            continue;
        }
        let created = catalog::create_menu_item(&txn, &item.name, item.price, item.stock).await?;
        if !item.available {
            catalog::set_item_availability(&txn, created.id, false).await?;
        }
        summary.menu_items += 1;
    }

    for table in &seed.tables {
        let exists = DiningTable::find()
            .filter(dining_table::Column::Number.eq(table.number))
            .one(&txn)
            .await?
            .is_some();
        if !exists {
            occupancy::create_table(&txn, table.number).await?;
            summary.tables += 1;
        }
    }

    for entry in &seed.rooms {
        let exists = Room::find()
            .filter(room::Column::Number.eq(entry.number.trim()))
            .one(&txn)
            .await?
            .is_some();
        if !exists {
            occupancy::create_room(&txn, &entry.number).await?;
            summary.rooms += 1;
        }
    }

    txn.commit().await?;

    info!(
        menu_items = summary.menu_items,
        tables = summary.tables,
        rooms = summary.rooms,
        "Seed applied"
    );
    Ok(summary)
}
