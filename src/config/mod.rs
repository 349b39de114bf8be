/// Database configuration and connection management
pub mod database;

/// Catalog, table and room seed loading from config.toml
pub mod seed;

/// Engine tunables from environment variables
pub mod settings;
