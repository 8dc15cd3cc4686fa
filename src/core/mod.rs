pub mod reconcile;
pub mod refresh;
pub mod selector;
pub mod sync;

pub use crate::domain::model::{Asset, SyncReport, WarrantyEntry, WarrantyRecord};
pub use crate::domain::ports::{AssetInventory, Clock, WarrantyLookup, WarrantyStore};
pub use crate::utils::error::Result;
