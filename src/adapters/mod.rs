// Adapters layer: concrete implementations for external systems (inventory, store, http).

pub mod csv_inventory;
pub mod dell;
pub mod memory;
pub mod sqlite;

pub use csv_inventory::CsvInventory;
pub use dell::DellWarrantyClient;
pub use sqlite::SqliteWarrantyStore;
