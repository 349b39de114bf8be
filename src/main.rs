use dotenvy::dotenv;
use order_settlement::{
    config::{
        database::{create_connection, create_tables, get_database_url},
        seed::{apply_seed, load_seed},
        settings::EngineSettings,
    },
    core::{SettlementCoordinator, billing},
    errors::Result,
};
use std::{env, path::Path};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Engine settings
    let settings = EngineSettings::from_env();
    info!(
        max_attempts = settings.max_attempts,
        bill_prefix = %settings.bill_number_prefix,
        loyalty_unit = settings.loyalty_points_unit,
        "Engine settings loaded"
    );

    // 4. Connect and create any missing tables
    let database_url = get_database_url();
    let db = create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed catalog, tables and rooms if a seed file is present
    let seed_path = env::var("SEED_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&seed_path).exists() {
        let seed = load_seed(&seed_path)?;
        apply_seed(&db, &seed)
            .await
            .inspect_err(|e| error!("Failed to apply seed {}: {}", seed_path, e))?;
    } else {
        warn!(path = %seed_path, "No seed file found, skipping seeding");
    }

    // 6. Report outstanding bills
    let coordinator = SettlementCoordinator::new(db, settings);
    let unpaid = billing::list_unpaid_bills(coordinator.db()).await?;
    info!(count = unpaid.len(), "Unpaid bills");
    for bill in &unpaid {
        info!(
            bill_number = %bill.bill_number,
            total = bill.total,
            created_by = %bill.created_by,
            "Outstanding bill"
        );
    }

    Ok(())
}
