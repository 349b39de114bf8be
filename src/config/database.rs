//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models,
//! including the unique constraints the engine relies on (one open order per table,
//! unique bill numbers).

use crate::entities::{
    Bill, BillItem, Booking, BookingCharge, DiningTable, LoyaltyCustomer, MenuItem, Order,
    OrderItem, Room, SystemState,
};
use crate::errors::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
};
use sea_orm::sqlx::sqlite::SqliteJournalMode;
use std::{path::Path, time::Duration};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/settlement.sqlite?mode=rwc";

/// How long a writer waits on a locked `SQLite` file before giving up.
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// File path of a file-backed `SQLite` URL, `None` for in-memory or other backends.
fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(Path::new(path))
}

/// Establishes a connection to the database at `database_url`.
///
/// The parent directory of a `SQLite` file is created if missing. Every pooled
/// connection to a file-backed store runs in WAL mode with a busy timeout so
/// concurrent writers queue instead of failing immediately.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    let sqlite_file = sqlite_file_path(database_url);
    if let Some(parent) = sqlite_file
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(false);
    if sqlite_file.is_some() {
        options.map_sqlx_sqlite_opts(|opts| {
            opts.journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(SQLITE_BUSY_TIMEOUT)
        });
        debug!("SQLite store configured for WAL with busy timeout");
    }

    let db = Database::connect(options).await?;

    info!(url = %database_url, "Database connection established");
    Ok(db)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables the engine needs, skipping ones that already exist.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, MenuItem).await?;
    create_table(db, &schema, DiningTable).await?;
    create_table(db, &schema, Room).await?;
    create_table(db, &schema, Order).await?;
    create_table(db, &schema, OrderItem).await?;
    create_table(db, &schema, Booking).await?;
    create_table(db, &schema, BookingCharge).await?;
    create_table(db, &schema, Bill).await?;
    create_table(db, &schema, BillItem).await?;
    create_table(db, &schema, LoyaltyCustomer).await?;
    create_table(db, &schema, SystemState).await?;

    debug!("Schema ensured");
    Ok(())
}
