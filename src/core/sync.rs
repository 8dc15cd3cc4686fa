use crate::core::reconcile::reconcile;
use crate::core::refresh;
use crate::core::selector::AssetSelector;
use crate::domain::model::{Asset, SyncReport, UpsertOutcome};
use crate::domain::ports::{AssetInventory, Clock, WarrantyLookup, WarrantyStore};
use crate::utils::error::Result;
use std::sync::Arc;

/// One warranty reconciliation run: select assets, gate each on the refresh
/// policy, look it up, write back every returned entry.
pub struct WarrantySync<I, S, L> {
    inventory: I,
    store: S,
    lookup: L,
    clock: Arc<dyn Clock>,
    selector: AssetSelector,
    lookup_cap: usize,
}

impl<I, S, L> WarrantySync<I, S, L>
where
    I: AssetInventory,
    S: WarrantyStore,
    L: WarrantyLookup,
{
    pub fn new(
        inventory: I,
        store: S,
        lookup: L,
        clock: Arc<dyn Clock>,
        selector: AssetSelector,
        lookup_cap: usize,
    ) -> Self {
        Self {
            inventory,
            store,
            lookup,
            clock,
            selector,
            lookup_cap,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Only a failing inventory query makes the run fail; every later error
    /// is logged and counted against the asset or entry it belongs to.
    pub async fn run(&self) -> Result<SyncReport> {
        tracing::info!("Starting warranty sync (lookup cap: {})", self.lookup_cap);

        let mut assets = self.selector.select(&self.inventory).await?;
        let mut report = SyncReport::default();

        while let Some(asset) = assets.next() {
            if report.lookups >= self.lookup_cap {
                report.skipped_by_cap = 1 + assets.by_ref().count();
                tracing::warn!(
                    "Lookup cap of {} reached, skipping {} remaining assets",
                    self.lookup_cap,
                    report.skipped_by_cap
                );
                break;
            }
            report.assets_seen += 1;
            self.sync_asset(&asset, &mut report).await;
        }

        tracing::info!(
            "Warranty sync finished: {} assets, {} lookups ({} failed, {} empty), {} inserted, {} updated, {} entry failures, {} not due, {} policy failures, {} skipped by cap",
            report.assets_seen,
            report.lookups,
            report.lookup_failures,
            report.empty_responses,
            report.entries_inserted,
            report.entries_updated,
            report.entry_failures,
            report.not_due,
            report.policy_failures,
            report.skipped_by_cap
        );
        Ok(report)
    }

    async fn sync_asset(&self, asset: &Asset, report: &mut SyncReport) {
        let serial = asset.serial_number.as_str();

        let decision = match refresh::check(&self.store, serial, self.clock.now()).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!("Could not read existing warranties for {}: {}", serial, e);
                report.policy_failures += 1;
                return;
            }
        };
        if !decision.needs_update() {
            tracing::debug!("Skipping {}: {:?}", serial, decision);
            report.not_due += 1;
            return;
        }
        tracing::debug!("Refreshing {}: {:?}", serial, decision);

        report.lookups += 1;
        let entries = match self.lookup.lookup(serial).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Warranty lookup failed for {}: {}", serial, e);
                report.lookup_failures += 1;
                return;
            }
        };

        if entries.is_empty() {
            tracing::debug!("No warranty data on file for {}", serial);
            report.empty_responses += 1;
            return;
        }

        for entry in &entries {
            match reconcile(&self.store, serial, entry, self.clock.now()).await {
                Ok(UpsertOutcome::Inserted) => report.entries_inserted += 1,
                Ok(UpsertOutcome::Updated(_)) => report.entries_updated += 1,
                Err(e) => {
                    tracing::error!(
                        "Failed to save warranty {} / {}: {}",
                        serial,
                        entry.item_number,
                        e
                    );
                    report.entry_failures += 1;
                }
            }
        }
    }
}
