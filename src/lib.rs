pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{CsvInventory, DellWarrantyClient, SqliteWarrantyStore};
pub use config::SyncConfig;
pub use core::{selector::AssetSelector, sync::WarrantySync};
pub use utils::error::{Result, SyncError};
