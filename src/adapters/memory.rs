//! In-memory inventory and warranty store. Same contracts as the file and
//! SQLite adapters; nothing survives the process.

use crate::domain::model::{Asset, WarrantyFields, WarrantyRecord};
use crate::domain::ports::{AssetInventory, Clock, WarrantyStore};
use crate::utils::error::{Result, SyncError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct MemoryInventory {
    assets: Vec<Asset>,
    failure: Option<String>,
}

impl MemoryInventory {
    pub fn new(assets: Vec<Asset>) -> Self {
        Self {
            assets,
            failure: None,
        }
    }

    /// Inventory whose query always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            assets: Vec::new(),
            failure: Some(message.to_string()),
        }
    }
}

impl AssetInventory for MemoryInventory {
    async fn assets_by_manufacturer(&self, manufacturer_ids: &HashSet<String>) -> Result<Vec<Asset>> {
        if let Some(message) = &self.failure {
            return Err(SyncError::ProcessingError {
                message: message.clone(),
            });
        }

        Ok(self
            .assets
            .iter()
            .filter(|asset| {
                !asset.serial_number.is_empty() && manufacturer_ids.contains(&asset.manufacturer_id)
            })
            .cloned()
            .collect())
    }
}

pub struct MemoryWarrantyStore {
    records: Mutex<Vec<WarrantyRecord>>,
    next_id: Mutex<i64>,
    fail_writes: Mutex<bool>,
    clock: Arc<dyn Clock>,
}

impl MemoryWarrantyStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
            fail_writes: Mutex::new(false),
            clock,
        }
    }

    /// Makes every subsequent insert and update fail.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Puts a row in place as-is, keeping its `last_updated_at`.
    pub fn seed(&self, fields: WarrantyFields, last_updated_at: chrono::DateTime<chrono::Utc>) {
        let id = self.allocate_id();
        self.records.lock().push(WarrantyRecord {
            id,
            fields,
            last_updated_at,
        });
    }

    pub fn records(&self) -> Vec<WarrantyRecord> {
        self.records.lock().clone()
    }

    fn allocate_id(&self) -> i64 {
        let mut next = self.next_id.lock();
        let id = *next;
        *next += 1;
        id
    }

    fn check_writable(&self) -> Result<()> {
        if *self.fail_writes.lock() {
            return Err(SyncError::ProcessingError {
                message: "warranty store rejected the write".to_string(),
            });
        }
        Ok(())
    }
}

impl WarrantyStore for MemoryWarrantyStore {
    async fn find_by_serial(&self, serial_number: &str) -> Result<Vec<WarrantyRecord>> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.fields.serial_number == serial_number)
            .cloned()
            .collect())
    }

    async fn find_by_key(&self, serial_number: &str, item_number: &str) -> Result<Vec<WarrantyRecord>> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.fields.serial_number == serial_number && r.fields.item_number == item_number)
            .cloned()
            .collect())
    }

    async fn insert(&self, fields: &WarrantyFields) -> Result<()> {
        self.check_writable()?;
        let id = self.allocate_id();
        let record = WarrantyRecord {
            id,
            fields: fields.clone(),
            last_updated_at: self.clock.now(),
        };
        self.records.lock().push(record);
        Ok(())
    }

    async fn update(&self, fields: &WarrantyFields) -> Result<usize> {
        self.check_writable()?;
        let now = self.clock.now();
        let mut written = 0;
        for record in self.records.lock().iter_mut().filter(|r| {
            r.fields.serial_number == fields.serial_number && r.fields.item_number == fields.item_number
        }) {
            record.fields = fields.clone();
            record.last_updated_at = now;
            written += 1;
        }
        Ok(written)
    }
}
