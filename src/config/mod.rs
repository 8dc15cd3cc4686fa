pub mod sync_config;

pub use sync_config::{
    ApiConfig, HttpMethod, InventoryConfig, LogFormat, LoggingConfig, RunConfig, StoreConfig,
    SyncConfig, VendorConfig,
};
