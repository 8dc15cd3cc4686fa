use crate::domain::model::{UpsertOutcome, WarrantyEntry, WarrantyFields};
use crate::domain::ports::WarrantyStore;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};

/// Writes one looked-up entry for `serial_number` into the store, inserting
/// on first sighting of the item number and overwriting afterwards.
pub async fn reconcile<S: WarrantyStore>(
    store: &S,
    serial_number: &str,
    entry: &WarrantyEntry,
    now: DateTime<Utc>,
) -> Result<UpsertOutcome> {
    let fields = WarrantyFields::from_entry(serial_number, entry, now);
    let outcome = store.upsert(&fields).await?;

    match outcome {
        UpsertOutcome::Inserted => tracing::debug!(
            "Inserted warranty {} / {} (active: {})",
            serial_number,
            fields.item_number,
            fields.active
        ),
        UpsertOutcome::Updated(rows) => tracing::debug!(
            "Updated {} warranty row(s) for {} / {} (active: {})",
            rows,
            serial_number,
            fields.item_number,
            fields.active
        ),
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryWarrantyStore;
    use crate::domain::model::ServiceProvider;
    use crate::domain::ports::Clock;
    use crate::utils::clock::FixedClock;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn entry(item: &str, provider: ServiceProvider, end_date: DateTime<Utc>) -> WarrantyEntry {
        WarrantyEntry {
            item_number: item.to_string(),
            entitlement_type: Some("INITIAL".to_string()),
            service_provider: provider,
            service_level_group: Some("5".to_string()),
            service_level_description: Some("Next Business Day Onsite".to_string()),
            service_level_code: Some("ND".to_string()),
            start_date: Some(end_date - Duration::days(3 * 365)),
            end_date,
        }
    }

    fn setup() -> (MemoryWarrantyStore, Arc<FixedClock>, DateTime<Utc>) {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(now));
        (MemoryWarrantyStore::new(clock.clone()), clock, now)
    }

    #[tokio::test]
    async fn test_first_sighting_inserts() {
        let (store, _clock, now) = setup();
        let entry = entry(
            "IT-1",
            ServiceProvider::Text("Dell".to_string()),
            now + Duration::days(1),
        );

        let outcome = reconcile(&store, "ABC123", &entry, now).await.unwrap();

        assert_eq!(outcome, UpsertOutcome::Inserted);
        let records = store.find_by_key("ABC123", "IT-1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].fields.active);
        assert_eq!(records[0].fields.service_provider.as_deref(), Some("Dell"));
    }

    #[tokio::test]
    async fn test_same_entry_twice_updates_in_place() {
        let (store, clock, now) = setup();
        let first = entry("IT-1", ServiceProvider::Absent, now + Duration::days(1));

        reconcile(&store, "ABC123", &first, now).await.unwrap();
        clock.advance(Duration::hours(2));
        let outcome = reconcile(&store, "ABC123", &first, clock.now())
            .await
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated(1));
        let records = store.find_by_serial("ABC123").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].last_updated_at, now + Duration::hours(2));
    }

    #[tokio::test]
    async fn test_update_recomputes_active_and_overwrites_fields() {
        let (store, _clock, now) = setup();
        let before = entry("IT-1", ServiceProvider::Text("Dell".to_string()), now + Duration::days(1));
        reconcile(&store, "ABC123", &before, now).await.unwrap();

        let mut after = entry("IT-1", ServiceProvider::NonScalar, now - Duration::days(1));
        after.service_level_code = Some("4H".to_string());
        reconcile(&store, "ABC123", &after, now).await.unwrap();

        let records = store.find_by_key("ABC123", "IT-1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].fields.active);
        assert_eq!(records[0].fields.service_provider.as_deref(), Some("NULL"));
        assert_eq!(records[0].fields.service_level_code.as_deref(), Some("4H"));
        assert_eq!(records[0].fields.end_date, now - Duration::days(1));
    }

    #[tokio::test]
    async fn test_distinct_item_numbers_are_separate_records() {
        let (store, _clock, now) = setup();
        reconcile(
            &store,
            "ABC123",
            &entry("IT-1", ServiceProvider::Absent, now + Duration::days(30)),
            now,
        )
        .await
        .unwrap();
        reconcile(
            &store,
            "ABC123",
            &entry("IT-2", ServiceProvider::Absent, now + Duration::days(400)),
            now,
        )
        .await
        .unwrap();

        assert_eq!(store.find_by_serial("ABC123").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_returned() {
        let (store, _clock, now) = setup();
        store.fail_writes(true);

        let result = reconcile(
            &store,
            "ABC123",
            &entry("IT-1", ServiceProvider::Absent, now),
            now,
        )
        .await;

        assert!(result.is_err());
        assert!(store.find_by_serial("ABC123").await.unwrap().is_empty());
    }
}
