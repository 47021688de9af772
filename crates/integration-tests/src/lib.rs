//! Integration tests for the Tarimas inventory engine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tarimas-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `store_sync` - Several stores sharing one backend and one bus
//! - `api_client` - REST client against a mock HTTP server
//!
//! This library holds the shared fixtures: an in-memory [`MemoryBackend`]
//! that remembers assignments, and builders for inventory lines.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use tarimas_core::{
    AssignmentTarget, BoxType, ClientAssignment, EvolutionBucket, Granularity, InventoryLine,
    OrderId, OrderRef, OrderStatus, PalletCode, ReleasePatch,
};
use tarimas_inventory::{AssignmentBackend, InventorySource, Origin, SourceError};

/// Build a line registered on 2026-10-01.
#[must_use]
pub fn line(code: &str, box_type: &str, weight: i64, client: Option<&str>) -> InventoryLine {
    InventoryLine {
        pallet_code: PalletCode::from(code),
        box_type: BoxType::from(box_type),
        weight: Decimal::from(weight),
        client: client.map_or(ClientAssignment::Unassigned, ClientAssignment::client),
        branch: None,
        status: "En almacen".to_string(),
        registered_at: Utc
            .with_ymd_and_hms(2026, 10, 1, 8, 0, 0)
            .single()
            .unwrap_or_default(),
        order: None,
    }
}

/// P1 (XL 10, L 5, unassigned) and P2 (M 7, Acme).
///
/// Same lines as the unit-test fixture in `tarimas_inventory::indicators`;
/// test-only code is not shared across crates, so change both together.
#[must_use]
pub fn scenario() -> Vec<InventoryLine> {
    vec![
        line("P1", "XL", 10, None),
        line("P1", "L", 5, None),
        line("P2", "M", 7, Some("Acme")),
    ]
}

/// Backend kept in memory that applies assignments to its own lines, so a
/// later bulk read reflects them.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    lines: Mutex<Vec<InventoryLine>>,
    orders: Mutex<HashMap<OrderId, AssignmentTarget>>,
    evolution: Mutex<HashMap<Granularity, Vec<EvolutionBucket>>>,
    inventory_reads: AtomicUsize,
    evolution_reads: AtomicUsize,
    invalidations: Mutex<Vec<Origin>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new(lines: Vec<InventoryLine>) -> Self {
        let backend = Self::default();
        *lock(&backend.lines) = lines;
        backend
    }

    /// Register an order pallets can be assigned to.
    #[must_use]
    pub fn with_order(self, order_id: OrderId, client: &str, branch: Option<&str>) -> Self {
        lock(&self.orders).insert(
            order_id,
            AssignmentTarget {
                client: client.to_string(),
                branch: branch.map(str::to_string),
            },
        );
        self
    }

    /// Serve `buckets` for `granularity`.
    #[must_use]
    pub fn with_evolution(self, granularity: Granularity, buckets: Vec<EvolutionBucket>) -> Self {
        lock(&self.evolution).insert(granularity, buckets);
        self
    }

    /// Replace the lines, as another client of the backend would.
    pub fn set_lines(&self, lines: Vec<InventoryLine>) {
        *lock(&self.lines) = lines;
    }

    #[must_use]
    pub fn inventory_reads(&self) -> usize {
        self.inventory_reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn evolution_reads(&self) -> usize {
        self.evolution_reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn invalidations(&self) -> Vec<Origin> {
        lock(&self.invalidations).clone()
    }
}

/// One bucket with a single XL weight and count.
#[must_use]
pub fn bucket(date: NaiveDate, weight: i64, count: u32) -> EvolutionBucket {
    EvolutionBucket {
        date,
        weights: [(BoxType::Xl, Decimal::from(weight))].into_iter().collect(),
        counts: [(BoxType::Xl, count)].into_iter().collect(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InventorySource for MemoryBackend {
    async fn fetch_inventory_lines(&self) -> Result<Vec<InventoryLine>, SourceError> {
        self.inventory_reads.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.lines).clone())
    }

    async fn fetch_evolution(
        &self,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<EvolutionBucket>, SourceError> {
        self.evolution_reads.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.evolution)
            .get(&granularity)
            .map(|buckets| {
                buckets
                    .iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn invalidate_cache(&self, origin: &Origin) {
        lock(&self.invalidations).push(origin.clone());
    }
}

impl AssignmentBackend for MemoryBackend {
    async fn assign_pallets(
        &self,
        order_id: OrderId,
        pallet_codes: &[PalletCode],
    ) -> Result<AssignmentTarget, SourceError> {
        let target = lock(&self.orders)
            .get(&order_id)
            .cloned()
            .ok_or_else(|| SourceError::Status {
                status: 404,
                body: format!("pedido {order_id} no encontrado"),
            })?;

        let now = Utc::now();
        for line in lock(&self.lines)
            .iter_mut()
            .filter(|l| pallet_codes.contains(&l.pallet_code))
        {
            line.client = ClientAssignment::client(target.client.as_str());
            line.branch.clone_from(&target.branch);
            line.order = Some(OrderRef {
                id: order_id,
                client: target.client.clone(),
                branch: target.branch.clone(),
                status: OrderStatus::Active,
                created_at: now,
                updated_at: now,
            });
        }
        Ok(target)
    }

    async fn unassign_pallets(&self, patches: &[ReleasePatch]) -> Result<(), SourceError> {
        for line in lock(&self.lines)
            .iter_mut()
            .filter(|l| patches.iter().any(|p| p.pallet_code == l.pallet_code))
        {
            line.client = ClientAssignment::Unassigned;
            line.branch = None;
            line.order = None;
        }
        Ok(())
    }
}
