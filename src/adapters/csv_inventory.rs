use crate::domain::model::Asset;
use crate::domain::ports::AssetInventory;
use crate::utils::error::Result;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// Inventory backed by a CSV export of the computer table. Needs a header row
/// with `serial_number` and `manufacturer` columns; other columns are ignored.
#[derive(Debug, Clone)]
pub struct CsvInventory {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct InventoryRow {
    #[serde(alias = "serial", alias = "serialNumber")]
    serial_number: Option<String>,
    #[serde(alias = "manufacturer_id", alias = "manufacturerId")]
    manufacturer: Option<String>,
}

impl CsvInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AssetInventory for CsvInventory {
    async fn assets_by_manufacturer(&self, manufacturer_ids: &HashSet<String>) -> Result<Vec<Asset>> {
        tracing::debug!("Reading inventory export {}", self.path.display());
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let mut assets = Vec::new();
        for row in reader.deserialize::<InventoryRow>() {
            let row = row?;
            let (Some(serial_number), Some(manufacturer_id)) = (row.serial_number, row.manufacturer)
            else {
                continue;
            };
            if serial_number.is_empty() || !manufacturer_ids.contains(&manufacturer_id) {
                continue;
            }
            assets.push(Asset {
                serial_number,
                manufacturer_id,
            });
        }

        Ok(assets)
    }
}
