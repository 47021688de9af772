//! Inventory record store: the orchestrator behind the dashboard.
//!
//! The store owns the canonical line collection fetched from the backend,
//! the optimistic overrides layered over it and the filters the user has
//! picked. Every view (effective records, indicators, filter options,
//! filtered list) is recomputed from those inputs whenever one changes;
//! nothing derived is ever patched in place.
//!
//! # Synchronization
//!
//! Each store has its own [`Origin`] and subscribes to both kinds of
//! [`EventBus`] message. A message from any other origin queues a reload;
//! messages the store published itself are ignored. Bus handlers run
//! synchronously, so the reload happens when the owner calls
//! [`InventoryStore::process_events`] or spawns [`InventoryStore::run`].
//! The spawned loop does not keep the store alive: dropping the last handle
//! unsubscribes it and ends the loop.
//!
//! # Example
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! let store = InventoryStore::new(client.clone(), bus.clone());
//! store.mount().await?;
//! tokio::spawn(store.run());
//!
//! store.set_list_filter(ListFilterKey::Client, "Acme");
//! let visible = store.filtered_records();
//!
//! let target = store.assign_confirmed(&client, order_id, &codes).await?;
//! ```

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tarimas_core::{
    AssignmentPatch, AssignmentTarget, DateWindow, EvolutionFilterUpdate, EvolutionFilters,
    FilterOptions, Granularity, Indicators, InventoryLine, ListFilterKey, ListFilters, OrderId,
    PalletCode, ReleasePatch,
};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, instrument, warn};

use crate::error::SourceError;
use crate::events::{BusEvent, DataChange, EventBus, EventKind, Origin, Subscription};
use crate::evolution::{EvolutionCache, fetch_evolution};
use crate::indicators::compute_indicators;
use crate::options::{extract_filter_options, filter_lines};
use crate::overrides::OverrideLayer;
use crate::series::{ChartRow, DistributionRow, format_distribution, format_evolution};
use crate::source::{AssignmentBackend, InventorySource};

/// Cache scope announced on the bus when the store invalidates.
pub const INVENTORY_CACHE_SCOPE: &str = "inventario";

/// Width of the default evolution window, in days.
pub const DEFAULT_EVOLUTION_DAYS: u64 = 30;

/// Construction options for [`InventoryStore`].
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Origin tag; a fresh one is generated when `None`.
    pub origin: Option<Origin>,
    /// Initial evolution window.
    pub evolution_window: DateWindow,
    /// Initial evolution granularity.
    pub evolution_granularity: Granularity,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            origin: None,
            evolution_window: DateWindow::last_days(
                Utc::now().date_naive(),
                DEFAULT_EVOLUTION_DAYS,
            ),
            evolution_granularity: Granularity::default(),
        }
    }
}

/// Reload request queued by a foreign bus message.
#[derive(Debug, Clone)]
struct ReloadRequest {
    kind: EventKind,
    origin: Origin,
}

/// Which spinner a load drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadMode {
    Initial,
    Refresh,
}

/// Which fetch left the error slot set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailedFetch {
    Inventory,
    Evolution,
}

/// Views recomputed from the canonical collection, overrides and filters.
#[derive(Debug, Clone, Default)]
struct DerivedView {
    records: Vec<InventoryLine>,
    indicators: Indicators,
    filter_options: FilterOptions,
    filtered: Vec<InventoryLine>,
}

#[derive(Debug)]
struct StoreState {
    canonical: Vec<InventoryLine>,
    overrides: OverrideLayer,
    list_filters: ListFilters,
    evolution_filters: EvolutionFilters,
    evolution: EvolutionCache,
    /// Set by `mount` until the active granularity has been fetched once.
    evolution_deferred: bool,
    view: DerivedView,
    loading: bool,
    refreshing: bool,
    error: Option<(FailedFetch, String)>,
    loaded_at: Option<DateTime<Utc>>,
}

impl StoreState {
    fn new(settings: &StoreSettings) -> Self {
        let mut evolution_filters = EvolutionFilters::new(settings.evolution_window);
        evolution_filters.granularity = settings.evolution_granularity;
        Self {
            canonical: Vec::new(),
            overrides: OverrideLayer::default(),
            list_filters: ListFilters::default(),
            evolution_filters,
            evolution: EvolutionCache::default(),
            evolution_deferred: false,
            view: DerivedView::default(),
            loading: false,
            refreshing: false,
            error: None,
            loaded_at: None,
        }
    }

    fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|(_, message)| message.clone())
    }

    /// Recompute every view from scratch.
    fn rederive(&mut self) {
        let records = self.overrides.apply(&self.canonical);
        self.view = DerivedView {
            indicators: compute_indicators(&records),
            filter_options: extract_filter_options(&records),
            filtered: filter_lines(&records, &self.list_filters),
            records,
        };
    }

    /// Recompute only the filtered list.
    fn refilter(&mut self) {
        self.view.filtered = filter_lines(&self.view.records, &self.list_filters);
    }

    fn set_busy(&mut self, mode: LoadMode, busy: bool) {
        match mode {
            LoadMode::Initial => self.loading = busy,
            LoadMode::Refresh => self.refreshing = busy,
        }
    }
}

/// Everything the dashboard renders, captured at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct InventorySnapshot {
    pub records: Vec<InventoryLine>,
    pub indicators: Indicators,
    pub filter_options: FilterOptions,
    pub formatted_evolution: Vec<ChartRow>,
    pub formatted_distribution: Vec<DistributionRow>,
    pub loading: bool,
    pub refreshing: bool,
    pub error: Option<String>,
}

struct StoreInner<S> {
    source: S,
    bus: EventBus,
    origin: Origin,
    state: RwLock<StoreState>,
    reload_rx: Arc<Mutex<mpsc::UnboundedReceiver<ReloadRequest>>>,
    _subscriptions: [Subscription; 2],
}

/// Handle to an inventory store. Clones share the same state.
pub struct InventoryStore<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S> Clone for InventoryStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for InventoryStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryStore")
            .field("origin", &self.inner.origin)
            .finish_non_exhaustive()
    }
}

impl<S: InventorySource> InventoryStore<S> {
    /// Create a store with a generated origin and the default evolution
    /// window (the last 30 days).
    #[must_use]
    pub fn new(source: S, bus: EventBus) -> Self {
        Self::with_settings(source, bus, StoreSettings::default())
    }

    /// Create a store with explicit settings.
    ///
    /// The store subscribes to `bus` immediately; the subscriptions are
    /// released when the last handle is dropped.
    #[must_use]
    pub fn with_settings(source: S, bus: EventBus, settings: StoreSettings) -> Self {
        let state = StoreState::new(&settings);
        let origin = settings
            .origin
            .unwrap_or_else(|| Origin::generate(INVENTORY_CACHE_SCOPE));
        let (reload_tx, reload_rx) = mpsc::unbounded_channel();

        let subscribe = |kind: EventKind| {
            let own = origin.clone();
            let tx = reload_tx.clone();
            bus.subscribe(kind, move |event: &BusEvent| {
                if event.origin() == &own {
                    debug!(origin = %own, kind = kind.as_str(), "Ignoring own bus event");
                    return;
                }
                // Receiver lives as long as the store; a send error means it is gone.
                let _ = tx.send(ReloadRequest {
                    kind,
                    origin: event.origin().clone(),
                });
            })
        };
        let subscriptions = [
            subscribe(EventKind::CacheInvalidated),
            subscribe(EventKind::DataUpdated),
        ];

        Self {
            inner: Arc::new(StoreInner {
                source,
                bus,
                origin,
                state: RwLock::new(state),
                reload_rx: Arc::new(Mutex::new(reload_rx)),
                _subscriptions: subscriptions,
            }),
        }
    }

    /// This store's origin tag.
    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.inner.origin
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Replace the canonical collection with a fresh bulk read.
    ///
    /// On success every view is recomputed and pending overrides are
    /// dropped. On failure the error slot is set and the previous
    /// collection stays visible.
    ///
    /// # Errors
    ///
    /// Returns the source error after recording it in the error slot.
    pub async fn load(&self) -> Result<(), SourceError> {
        self.load_as(LoadMode::Initial).await
    }

    /// Invalidate the backend cache, announce it on the bus, then load.
    ///
    /// Drives the `refreshing` flag instead of `loading`.
    ///
    /// # Errors
    ///
    /// Returns the source error after recording it in the error slot.
    pub async fn refresh(&self) -> Result<(), SourceError> {
        self.write().refreshing = true;
        self.inner.source.invalidate_cache(&self.inner.origin);
        self.inner
            .bus
            .publish_cache_invalidated(INVENTORY_CACHE_SCOPE, &self.inner.origin);
        self.load_as(LoadMode::Refresh).await
    }

    /// First load of a freshly mounted view: the bulk read, then the
    /// evolution series if there is inventory to correlate against.
    ///
    /// With an empty inventory the evolution fetch waits for the first
    /// load that brings lines, whoever triggers it.
    ///
    /// # Errors
    ///
    /// Returns the first failing fetch's error.
    pub async fn mount(&self) -> Result<(), SourceError> {
        self.write().evolution_deferred = true;
        self.load().await?;
        if self.read().evolution_deferred {
            debug!(origin = %self.inner.origin, "Empty inventory, evolution deferred");
        }
        Ok(())
    }

    #[instrument(skip(self), fields(origin = %self.inner.origin))]
    async fn load_as(&self, mode: LoadMode) -> Result<(), SourceError> {
        {
            let mut state = self.write();
            state.set_busy(mode, true);
            state.error = None;
        }

        let result = self.inner.source.fetch_inventory_lines().await;

        let resume_evolution = {
            let mut state = self.write();
            state.set_busy(mode, false);
            match result {
                Ok(lines) => {
                    state.canonical = lines;
                    state.overrides.clear();
                    state.loaded_at = Some(Utc::now());
                    state.rederive();
                    info!(
                        lines = state.canonical.len(),
                        pallets = state.view.indicators.total_pallets(),
                        "Inventory loaded"
                    );
                    state.evolution_deferred && !state.canonical.is_empty()
                }
                Err(e) => {
                    warn!(error = %e, "Inventory load failed, keeping previous data");
                    state.error = Some((FailedFetch::Inventory, e.to_string()));
                    return Err(e);
                }
            }
        };

        if resume_evolution {
            debug!("Inventory available, loading deferred evolution");
            self.load_evolution().await?;
        }
        Ok(())
    }

    /// Fetch the evolution series for the current granularity and window.
    ///
    /// On failure the buckets already held for that granularity are kept
    /// and the shared error slot is set. A success clears the slot only if
    /// an evolution fetch set it.
    ///
    /// # Errors
    ///
    /// Returns the source error after recording it in the error slot.
    pub async fn load_evolution(&self) -> Result<(), SourceError> {
        let filters = self.read().evolution_filters;
        match fetch_evolution(&self.inner.source, &filters).await {
            Ok(fetch) => {
                let mut state = self.write();
                state.evolution.insert(fetch);
                state.evolution_deferred = false;
                if matches!(state.error, Some((FailedFetch::Evolution, _))) {
                    state.error = None;
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, granularity = %filters.granularity, "Evolution load failed");
                self.write().error = Some((FailedFetch::Evolution, e.to_string()));
                Err(e)
            }
        }
    }

    // =========================================================================
    // Filters
    // =========================================================================

    /// Update one list filter and recompute the filtered view in memory.
    pub fn set_list_filter(&self, key: ListFilterKey, value: impl Into<String>) {
        let mut state = self.write();
        state.list_filters.set(key, value);
        state.refilter();
    }

    /// Update one evolution filter.
    ///
    /// A changed window or granularity triggers a fetch for the new
    /// granularity, unless the inventory is still empty. A metric change
    /// only alters the projection of buckets already held.
    ///
    /// # Errors
    ///
    /// Returns the evolution fetch error, if a fetch was made and failed.
    pub async fn set_evolution_filter(
        &self,
        update: EvolutionFilterUpdate,
    ) -> Result<(), SourceError> {
        let should_fetch = {
            let mut state = self.write();
            let before = state.evolution_filters;
            let filters = &mut state.evolution_filters;
            match update {
                EvolutionFilterUpdate::Window(window) => filters.window = window,
                EvolutionFilterUpdate::Granularity(granularity) => {
                    filters.granularity = granularity;
                }
                EvolutionFilterUpdate::Metric(metric) => filters.metric = metric,
            }
            update.changes_query()
                && state.evolution_filters != before
                && !state.canonical.is_empty()
        };

        if should_fetch {
            self.load_evolution().await
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Optimistic mutations
    // =========================================================================

    /// Show `patch` as applied without waiting for a reload, then announce
    /// it on the bus.
    ///
    /// The caller must already have confirmed the assignment with the
    /// backend; see [`InventoryStore::assign_confirmed`].
    pub fn apply_assignment(&self, patch: &AssignmentPatch) {
        {
            let mut state = self.write();
            state.overrides.assign(patch, Utc::now());
            state.rederive();
        }
        debug!(
            order_id = %patch.order_id,
            pallets = patch.pallet_codes.len(),
            "Applied local assignment"
        );
        self.inner.bus.publish_data_updated(
            DataChange::PalletsAssigned {
                order_id: patch.order_id,
                pallet_codes: patch.pallet_codes.clone(),
            },
            &self.inner.origin,
        );
    }

    /// Show `codes` as released without waiting for a reload, then announce
    /// it on the bus.
    ///
    /// The caller must already have confirmed the release with the backend;
    /// see [`InventoryStore::unassign_confirmed`].
    pub fn apply_unassignment(&self, codes: &[PalletCode]) {
        {
            let mut state = self.write();
            state.overrides.unassign(codes);
            state.rederive();
        }
        debug!(pallets = codes.len(), "Applied local release");
        self.inner.bus.publish_data_updated(
            DataChange::PalletsUnassigned {
                pallet_codes: codes.to_vec(),
            },
            &self.inner.origin,
        );
    }

    /// Assign pallets through `backend`, applying the change locally only
    /// once the backend accepted it.
    ///
    /// # Errors
    ///
    /// Returns the backend error; nothing is applied in that case.
    #[instrument(skip(self, backend, pallet_codes), fields(pallets = pallet_codes.len()))]
    pub async fn assign_confirmed<B: AssignmentBackend>(
        &self,
        backend: &B,
        order_id: OrderId,
        pallet_codes: &[PalletCode],
    ) -> Result<AssignmentTarget, SourceError> {
        let target = backend.assign_pallets(order_id, pallet_codes).await?;
        self.apply_assignment(&AssignmentPatch {
            order_id,
            target: target.clone(),
            pallet_codes: pallet_codes.to_vec(),
        });
        Ok(target)
    }

    /// Release pallets through `backend`, applying the change locally only
    /// once the backend accepted it.
    ///
    /// # Errors
    ///
    /// Returns the backend error; nothing is applied in that case.
    #[instrument(skip(self, backend, patches), fields(pallets = patches.len()))]
    pub async fn unassign_confirmed<B: AssignmentBackend>(
        &self,
        backend: &B,
        patches: &[ReleasePatch],
    ) -> Result<(), SourceError> {
        backend.unassign_pallets(patches).await?;
        let codes: Vec<PalletCode> = patches
            .iter()
            .map(|patch| patch.pallet_code.clone())
            .collect();
        self.apply_unassignment(&codes);
        Ok(())
    }

    // =========================================================================
    // Bus-driven reloads
    // =========================================================================

    /// Reload once if any foreign bus message arrived since the last call.
    ///
    /// Returns how many queued messages were folded into the reload (zero
    /// means nothing was pending and no fetch was made).
    ///
    /// # Errors
    ///
    /// Returns the reload's source error.
    pub async fn process_events(&self) -> Result<usize, SourceError> {
        let pending = {
            let Ok(mut rx) = self.inner.reload_rx.try_lock() else {
                // `run` owns the queue.
                return Ok(0);
            };
            let mut pending = 0;
            while let Ok(request) = rx.try_recv() {
                debug!(kind = request.kind.as_str(), from = %request.origin, "Reload requested");
                pending += 1;
            }
            pending
        };

        if pending > 0 {
            self.load().await?;
        }
        Ok(pending)
    }

    /// Loop serving reload requests, meant to be spawned.
    ///
    /// The future only holds a weak reference to the store. Once the last
    /// handle is dropped the subscriptions go with it, the queue closes and
    /// the loop returns.
    ///
    /// Requests that pile up while a reload is in flight are folded into the
    /// next one. Load failures are recorded in the error slot and do not stop
    /// the loop.
    pub fn run(&self) -> impl Future<Output = ()> + Send + 'static
    where
        S: Send + Sync + 'static,
    {
        let store = Arc::downgrade(&self.inner);
        let queue = Arc::clone(&self.inner.reload_rx);
        async move {
            let mut rx = queue.lock_owned().await;
            while let Some(request) = rx.recv().await {
                let mut folded = 1;
                while rx.try_recv().is_ok() {
                    folded += 1;
                }
                let Some(inner) = store.upgrade() else {
                    break;
                };
                debug!(kind = request.kind.as_str(), from = %request.origin, folded, "Reloading");
                // Already recorded in the error slot.
                let _ = Self { inner }.load().await;
            }
            debug!("Store dropped, reload loop finished");
        }
    }
}

impl<S> InventoryStore<S> {
    // =========================================================================
    // Read-only views
    // =========================================================================

    /// Effective collection: canonical lines with local overrides applied.
    #[must_use]
    pub fn records(&self) -> Vec<InventoryLine> {
        self.read().view.records.clone()
    }

    /// Effective collection after the list filters.
    #[must_use]
    pub fn filtered_records(&self) -> Vec<InventoryLine> {
        self.read().view.filtered.clone()
    }

    #[must_use]
    pub fn indicators(&self) -> Indicators {
        self.read().view.indicators
    }

    #[must_use]
    pub fn filter_options(&self) -> FilterOptions {
        self.read().view.filter_options.clone()
    }

    /// Chart rows for the active granularity and metric.
    #[must_use]
    pub fn formatted_evolution(&self) -> Vec<ChartRow> {
        let state = self.read();
        let filters = state.evolution_filters;
        format_evolution(state.evolution.buckets(filters.granularity), filters.metric)
    }

    /// Weight distribution by box type over the effective collection.
    #[must_use]
    pub fn formatted_distribution(&self) -> Vec<DistributionRow> {
        format_distribution(&self.read().view.records)
    }

    /// Whether an initial load is in flight.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.read().loading
    }

    /// Whether a manual refresh is in flight.
    #[must_use]
    pub fn refreshing(&self) -> bool {
        self.read().refreshing
    }

    /// Message of the last failed fetch.
    ///
    /// Cleared when a bulk load starts, or by a successful evolution fetch
    /// when an evolution fetch set it.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.read().error_message()
    }

    #[must_use]
    pub fn list_filters(&self) -> ListFilters {
        self.read().list_filters.clone()
    }

    #[must_use]
    pub fn evolution_filters(&self) -> EvolutionFilters {
        self.read().evolution_filters
    }

    /// When `granularity`'s buckets were last fetched.
    #[must_use]
    pub fn evolution_fetched_at(&self, granularity: Granularity) -> Option<DateTime<Utc>> {
        self.read().evolution.fetched_at(granularity)
    }

    /// Window covered by the buckets held for `granularity`.
    #[must_use]
    pub fn evolution_window_held(&self, granularity: Granularity) -> Option<DateWindow> {
        self.read()
            .evolution
            .slot(granularity)
            .map(|slot| slot.window)
    }

    /// When the canonical collection was last replaced.
    #[must_use]
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.read().loaded_at
    }

    /// Number of pallets shown with a local override.
    #[must_use]
    pub fn pending_overrides(&self) -> usize {
        self.read().overrides.len()
    }

    /// Every exposed view at once.
    #[must_use]
    pub fn snapshot(&self) -> InventorySnapshot {
        let state = self.read();
        let filters = state.evolution_filters;
        InventorySnapshot {
            records: state.view.records.clone(),
            indicators: state.view.indicators,
            filter_options: state.view.filter_options.clone(),
            formatted_evolution: format_evolution(
                state.evolution.buckets(filters.granularity),
                filters.metric,
            ),
            formatted_distribution: format_distribution(&state.view.records),
            loading: state.loading,
            refreshing: state.refreshing,
            error: state.error_message(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
