use crate::domain::model::{Asset, UpsertOutcome, WarrantyEntry, WarrantyFields, WarrantyRecord};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Read-only view of the computer inventory.
pub trait AssetInventory: Send + Sync {
    /// Assets whose manufacturer is in `manufacturer_ids` and whose serial
    /// number is set, in inventory order.
    fn assets_by_manufacturer(
        &self,
        manufacturer_ids: &HashSet<String>,
    ) -> impl std::future::Future<Output = Result<Vec<Asset>>> + Send;
}

/// Persistence for warranty records. Implementations stamp
/// `last_updated_at` on every insert and update.
pub trait WarrantyStore: Send + Sync {
    fn find_by_serial(
        &self,
        serial_number: &str,
    ) -> impl std::future::Future<Output = Result<Vec<WarrantyRecord>>> + Send;

    fn find_by_key(
        &self,
        serial_number: &str,
        item_number: &str,
    ) -> impl std::future::Future<Output = Result<Vec<WarrantyRecord>>> + Send;

    fn insert(
        &self,
        fields: &WarrantyFields,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Overwrites every row matching the fields' serial and item number.
    /// Returns the number of rows written.
    fn update(
        &self,
        fields: &WarrantyFields,
    ) -> impl std::future::Future<Output = Result<usize>> + Send;

    /// Insert-or-update keyed on `(serial_number, item_number)`.
    ///
    /// The default is a plain query followed by a write with nothing held in
    /// between, so two overlapping runs can both insert the same key. Stores
    /// with transactions override this.
    fn upsert(
        &self,
        fields: &WarrantyFields,
    ) -> impl std::future::Future<Output = Result<UpsertOutcome>> + Send {
        async move {
            let matched = self
                .find_by_key(&fields.serial_number, &fields.item_number)
                .await?;
            if matched.is_empty() {
                self.insert(fields).await?;
                Ok(UpsertOutcome::Inserted)
            } else {
                let written = self.update(fields).await?;
                Ok(UpsertOutcome::Updated(written))
            }
        }
    }
}

/// External warranty lookup by serial number.
#[async_trait]
pub trait WarrantyLookup: Send + Sync {
    async fn lookup(&self, serial_number: &str) -> Result<Vec<WarrantyEntry>>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
