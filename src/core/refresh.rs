//! Refresh scheduling: how stale a warranty record may get before the vendor
//! API is asked again, tiered by how close the warranty is to expiring.

use crate::domain::model::WarrantyRecord;
use crate::domain::ports::WarrantyStore;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};

pub const DAY: i64 = 86_400;
pub const YEAR: i64 = 365 * DAY;

/// Records that expired this long ago are never looked up again.
pub const EXPIRED_CUTOFF: i64 = -60 * DAY;

/// Range of seconds-until-expiration a tier covers.
#[derive(Debug, Clone, Copy)]
enum Window {
    Above(i64),
    AtMost(i64),
    /// Exclusive on both ends.
    Between(i64, i64),
}

impl Window {
    fn contains(self, until_expiration: i64) -> bool {
        match self {
            Window::Above(low) => until_expiration > low,
            Window::AtMost(high) => until_expiration <= high,
            Window::Between(low, high) => until_expiration > low && until_expiration < high,
        }
    }
}

#[derive(Debug)]
struct Tier {
    reason: &'static str,
    window: Window,
    refresh_after: i64,
}

// Evaluated top to bottom, first hit wins. The second tier overlaps the
// narrower bands below it and shadows them whenever it fires.
const TIERS: [Tier; 6] = [
    Tier {
        reason: "expires in more than a year, updated over 60 days ago",
        window: Window::Above(YEAR),
        refresh_after: 60 * DAY,
    },
    Tier {
        reason: "expires within a year, updated over 30 days ago",
        window: Window::AtMost(YEAR),
        refresh_after: 30 * DAY,
    },
    Tier {
        reason: "expires in 45 to 90 days, updated over 15 days ago",
        window: Window::Between(45 * DAY, 90 * DAY),
        refresh_after: 15 * DAY,
    },
    Tier {
        reason: "expires in 30 to 45 days, updated over 7 days ago",
        window: Window::Between(30 * DAY, 45 * DAY),
        refresh_after: 7 * DAY,
    },
    Tier {
        reason: "expired under 10 days ago or expires within 30 days, updated over 24 hours ago",
        window: Window::Between(-10 * DAY, 30 * DAY),
        refresh_after: DAY,
    },
    Tier {
        reason: "expired 10 to 60 days ago, updated over 30 days ago",
        window: Window::Between(EXPIRED_CUTOFF, -10 * DAY),
        refresh_after: 30 * DAY,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    /// Serial number never seen before.
    NoRecord,
    Due { reason: &'static str },
    NotDue,
    ExpiredLongAgo,
}

impl RefreshDecision {
    pub fn needs_update(&self) -> bool {
        matches!(self, RefreshDecision::NoRecord | RefreshDecision::Due { .. })
    }
}

/// Decides from the seconds since the last refresh and the seconds until the
/// warranty ends (negative once expired).
pub fn decide(since_updated: i64, until_expiration: i64) -> RefreshDecision {
    if until_expiration <= EXPIRED_CUTOFF {
        return RefreshDecision::ExpiredLongAgo;
    }

    TIERS
        .iter()
        .find(|tier| tier.window.contains(until_expiration) && since_updated > tier.refresh_after)
        .map(|tier| RefreshDecision::Due {
            reason: tier.reason,
        })
        .unwrap_or(RefreshDecision::NotDue)
}

/// The record a serial number's schedule follows: among records not yet past
/// the expired cut-off, the one expiring soonest, and among those the least
/// recently refreshed. `None` when every record is past the cut-off.
pub fn governing_record(records: &[WarrantyRecord], now: DateTime<Utc>) -> Option<&WarrantyRecord> {
    records
        .iter()
        .filter(|record| (record.fields.end_date - now).num_seconds() > EXPIRED_CUTOFF)
        .min_by_key(|record| (record.fields.end_date, record.last_updated_at))
}

pub fn evaluate(records: &[WarrantyRecord], now: DateTime<Utc>) -> RefreshDecision {
    if records.is_empty() {
        return RefreshDecision::NoRecord;
    }

    match governing_record(records, now) {
        None => RefreshDecision::ExpiredLongAgo,
        Some(record) => {
            let since_updated = (now - record.last_updated_at).num_seconds();
            let until_expiration = (record.fields.end_date - now).num_seconds();
            decide(since_updated, until_expiration)
        }
    }
}

/// Reads the existing records for `serial_number` and evaluates them.
pub async fn check<S: WarrantyStore>(
    store: &S,
    serial_number: &str,
    now: DateTime<Utc>,
) -> Result<RefreshDecision> {
    let records = store.find_by_serial(serial_number).await?;
    Ok(evaluate(&records, now))
}
