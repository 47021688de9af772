//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use tarimas_core::{
    AssignmentTarget, BoxType, EvolutionBucket, Granularity, InventoryLine, OrderId, PalletCode,
    ReleasePatch,
};
use tokio::sync::Notify;

use crate::error::SourceError;
use crate::events::Origin;
use crate::indicators::fixtures::scenario;
use crate::source::{AssignmentBackend, InventorySource};

/// Fake backend serving fixed lines and buckets, counting every call.
#[derive(Default)]
pub struct FakeSource {
    lines: Mutex<Vec<InventoryLine>>,
    buckets: Mutex<HashMap<Granularity, Vec<EvolutionBucket>>>,
    failing: AtomicBool,
    inventory_calls: AtomicUsize,
    evolution_calls: Mutex<Vec<Granularity>>,
    invalidations: Mutex<Vec<Origin>>,
    assignments: Mutex<Vec<(OrderId, Vec<PalletCode>)>>,
    releases: Mutex<Vec<ReleasePatch>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeSource {
    /// Source serving `lines` and no evolution data.
    pub fn new(lines: Vec<InventoryLine>) -> Self {
        let source = Self::default();
        source.set_lines(lines);
        source
    }

    /// Source serving the standard scenario lines.
    pub fn scenario() -> Self {
        Self::new(scenario())
    }

    /// Source serving the scenario lines plus `count` daily-spaced buckets
    /// for `granularity`.
    pub fn with_evolution(granularity: Granularity, count: u64) -> Self {
        let source = Self::scenario();
        let first = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap_or_default();
        let buckets = (0..count)
            .map(|offset| EvolutionBucket {
                date: first
                    .checked_add_days(Days::new(offset))
                    .unwrap_or(first),
                weights: [(BoxType::Xl, Decimal::from(10))].into_iter().collect(),
                counts: [(BoxType::Xl, 1)].into_iter().collect(),
            })
            .collect();
        lock(&source.buckets).insert(granularity, buckets);
        source
    }

    pub fn set_lines(&self, lines: Vec<InventoryLine>) {
        *lock(&self.lines) = lines;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make the next inventory fetch wait until the returned handle is
    /// notified.
    pub fn hold_next_fetch(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.gate) = Some(Arc::clone(&gate));
        gate
    }

    pub fn inventory_calls(&self) -> usize {
        self.inventory_calls.load(Ordering::SeqCst)
    }

    pub fn evolution_calls(&self) -> Vec<Granularity> {
        lock(&self.evolution_calls).clone()
    }

    pub fn invalidations(&self) -> Vec<Origin> {
        lock(&self.invalidations).clone()
    }

    pub fn assignments(&self) -> Vec<(OrderId, Vec<PalletCode>)> {
        lock(&self.assignments).clone()
    }

    pub fn releases(&self) -> Vec<ReleasePatch> {
        lock(&self.releases).clone()
    }

    fn check(&self) -> Result<(), SourceError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(SourceError::Unavailable("backend offline".to_string()))
        } else {
            Ok(())
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl InventorySource for FakeSource {
    async fn fetch_inventory_lines(&self) -> Result<Vec<InventoryLine>, SourceError> {
        self.inventory_calls.fetch_add(1, Ordering::SeqCst);
        let gate = lock(&self.gate).take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check()?;
        Ok(lock(&self.lines).clone())
    }

    async fn fetch_evolution(
        &self,
        granularity: Granularity,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<EvolutionBucket>, SourceError> {
        lock(&self.evolution_calls).push(granularity);
        self.check()?;
        Ok(lock(&self.buckets)
            .get(&granularity)
            .cloned()
            .unwrap_or_default())
    }

    fn invalidate_cache(&self, origin: &Origin) {
        lock(&self.invalidations).push(origin.clone());
    }
}

impl AssignmentBackend for FakeSource {
    async fn assign_pallets(
        &self,
        order_id: OrderId,
        pallet_codes: &[PalletCode],
    ) -> Result<AssignmentTarget, SourceError> {
        self.check()?;
        lock(&self.assignments).push((order_id, pallet_codes.to_vec()));
        Ok(AssignmentTarget {
            client: "Frutas del Norte".to_string(),
            branch: Some("Monterrey".to_string()),
        })
    }

    async fn unassign_pallets(&self, patches: &[ReleasePatch]) -> Result<(), SourceError> {
        self.check()?;
        lock(&self.releases).extend_from_slice(patches);
        Ok(())
    }
}
