use std::sync::Arc;

use warranty_sync::domain::ports::Clock;
use warranty_sync::utils::clock::SystemClock;
use warranty_sync::utils::{logger, validation::Validate};
use warranty_sync::{
    AssetSelector, CsvInventory, DellWarrantyClient, SqliteWarrantyStore, SyncConfig, SyncError,
    WarrantySync,
};

#[tokio::main]
async fn main() {
    let config = match SyncConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    logger::init_logger(&config.logging);
    tracing::info!("Starting warranty-sync");

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        tracing::error!(
            "❌ Warranty sync failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        std::process::exit(e.severity().exit_code());
    }
}

async fn run(config: SyncConfig) -> Result<(), SyncError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let inventory = CsvInventory::new(&config.inventory.path);
    let store = SqliteWarrantyStore::open(&config.store.path, clock.clone())?;
    let lookup = DellWarrantyClient::new(config.api.clone())?;
    let selector = AssetSelector::new(config.vendor.manufacturer_ids.iter().cloned());

    let sync = WarrantySync::new(
        inventory,
        store,
        lookup,
        clock,
        selector,
        config.sync.lookup_cap,
    );
    let report = sync.run().await?;

    tracing::info!("✅ Warranty sync completed: {:?}", report);
    Ok(())
}
