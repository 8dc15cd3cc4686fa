use chrono::{DateTime, Utc};

/// A computer from the asset inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub serial_number: String,
    pub manufacturer_id: String,
}

/// Shape of the `ServiceProvider` value as it arrived from the vendor API.
///
/// The API emits an empty placeholder object instead of text when no provider
/// is on file; that case is kept apart from a real string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceProvider {
    Text(String),
    NonScalar,
    Absent,
}

impl ServiceProvider {
    /// Value written to the record store.
    pub fn stored_value(&self) -> Option<String> {
        match self {
            ServiceProvider::Text(value) => Some(value.clone()),
            ServiceProvider::NonScalar => Some("NULL".to_string()),
            ServiceProvider::Absent => None,
        }
    }
}

/// One unit of coverage returned by the lookup API, keyed by item number.
#[derive(Debug, Clone, PartialEq)]
pub struct WarrantyEntry {
    pub item_number: String,
    pub entitlement_type: Option<String>,
    pub service_provider: ServiceProvider,
    pub service_level_group: Option<String>,
    pub service_level_description: Option<String>,
    pub service_level_code: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: DateTime<Utc>,
}

/// Every column of a warranty record except the ones the store owns
/// (`id`, `last_updated_at`).
#[derive(Debug, Clone, PartialEq)]
pub struct WarrantyFields {
    pub serial_number: String,
    pub item_number: String,
    pub entitlement_type: Option<String>,
    pub service_provider: Option<String>,
    pub service_level_group: Option<String>,
    pub service_level_description: Option<String>,
    pub service_level_code: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: DateTime<Utc>,
    pub active: bool,
}

impl WarrantyFields {
    /// Builds the row for `entry`, deriving `active` from the end date at `now`.
    pub fn from_entry(serial_number: &str, entry: &WarrantyEntry, now: DateTime<Utc>) -> Self {
        Self {
            serial_number: serial_number.to_string(),
            item_number: entry.item_number.clone(),
            entitlement_type: entry.entitlement_type.clone(),
            service_provider: entry.service_provider.stored_value(),
            service_level_group: entry.service_level_group.clone(),
            service_level_description: entry.service_level_description.clone(),
            service_level_code: entry.service_level_code.clone(),
            start_date: entry.start_date,
            end_date: entry.end_date,
            active: entry.end_date > now,
        }
    }
}

/// A persisted warranty row.
#[derive(Debug, Clone, PartialEq)]
pub struct WarrantyRecord {
    pub id: i64,
    pub fields: WarrantyFields,
    pub last_updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// Number of existing rows overwritten.
    Updated(usize),
}

/// Counters for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub assets_seen: usize,
    pub not_due: usize,
    pub policy_failures: usize,
    pub lookups: usize,
    pub lookup_failures: usize,
    pub empty_responses: usize,
    pub entries_inserted: usize,
    pub entries_updated: usize,
    pub entry_failures: usize,
    pub skipped_by_cap: usize,
}
