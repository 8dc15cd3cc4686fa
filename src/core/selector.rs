use crate::domain::model::Asset;
use crate::domain::ports::AssetInventory;
use crate::utils::error::Result;
use std::collections::HashSet;

/// Picks the assets a run should look at: configured vendor, serial present.
#[derive(Debug, Clone)]
pub struct AssetSelector {
    manufacturer_ids: HashSet<String>,
}

impl AssetSelector {
    pub fn new<I, S>(manufacturer_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            manufacturer_ids: manufacturer_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Runs the inventory query once. Query failures propagate unchanged.
    pub async fn select<I: AssetInventory>(&self, inventory: &I) -> Result<AssetSelection> {
        let assets = inventory
            .assets_by_manufacturer(&self.manufacturer_ids)
            .await?;
        tracing::debug!(
            "Inventory returned {} assets for {} manufacturer ids",
            assets.len(),
            self.manufacturer_ids.len()
        );

        Ok(AssetSelection {
            assets: assets.into_iter(),
            manufacturer_ids: self.manufacturer_ids.clone(),
        })
    }
}

/// Point-in-time, single-pass sequence of selected assets.
#[derive(Debug)]
pub struct AssetSelection {
    assets: std::vec::IntoIter<Asset>,
    manufacturer_ids: HashSet<String>,
}

impl Iterator for AssetSelection {
    type Item = Asset;

    fn next(&mut self) -> Option<Asset> {
        // the inventory is an outside system; re-check its filters
        self.assets.find(|asset| {
            !asset.serial_number.trim().is_empty()
                && self.manufacturer_ids.contains(&asset.manufacturer_id)
        })
    }
}
