//! Evolution series loading and the per-granularity bucket cache.
//!
//! Each granularity keeps its own slot with the buckets last fetched for it,
//! the window they cover and when they arrived. Only the slot of the active
//! granularity is displayed; the others stay as they were until that
//! granularity is selected again.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tarimas_core::{DateWindow, EvolutionBucket, EvolutionFilters, Granularity};
use tracing::{debug, instrument};

use crate::error::SourceError;
use crate::source::InventorySource;

/// Buckets fetched for one granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolutionSlot {
    /// Buckets as returned by the backend.
    pub buckets: Vec<EvolutionBucket>,
    /// Window the buckets cover.
    pub window: DateWindow,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
}

/// Result of one evolution fetch, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolutionFetch {
    /// Granularity requested.
    pub granularity: Granularity,
    /// Slot contents.
    pub slot: EvolutionSlot,
}

/// Slots keyed by granularity.
#[derive(Debug, Clone, Default)]
pub struct EvolutionCache {
    slots: HashMap<Granularity, EvolutionSlot>,
}

impl EvolutionCache {
    /// Store a completed fetch in its granularity's slot, replacing
    /// whatever that slot held. Other slots are untouched.
    pub fn insert(&mut self, fetch: EvolutionFetch) {
        self.slots.insert(fetch.granularity, fetch.slot);
    }

    /// Slot for `granularity`, if it was ever fetched.
    #[must_use]
    pub fn slot(&self, granularity: Granularity) -> Option<&EvolutionSlot> {
        self.slots.get(&granularity)
    }

    /// Buckets held for `granularity`, empty if never fetched.
    #[must_use]
    pub fn buckets(&self, granularity: Granularity) -> &[EvolutionBucket] {
        self.slot(granularity)
            .map(|slot| slot.buckets.as_slice())
            .unwrap_or_default()
    }

    /// When `granularity` was last fetched.
    #[must_use]
    pub fn fetched_at(&self, granularity: Granularity) -> Option<DateTime<Utc>> {
        self.slot(granularity).map(|slot| slot.fetched_at)
    }
}

/// Fetch the series for the active granularity of `filters`.
///
/// Issues exactly one range query, for `filters.granularity` only.
///
/// # Errors
///
/// Returns the source's error unchanged; nothing is stored on failure.
#[instrument(skip(source), fields(granularity = %filters.granularity))]
pub async fn fetch_evolution<S: InventorySource>(
    source: &S,
    filters: &EvolutionFilters,
) -> Result<EvolutionFetch, SourceError> {
    let window = filters.window;
    let buckets = source
        .fetch_evolution(filters.granularity, window.start(), window.end())
        .await?;
    debug!(buckets = buckets.len(), "Fetched evolution series");

    Ok(EvolutionFetch {
        granularity: filters.granularity,
        slot: EvolutionSlot {
            buckets,
            window,
            fetched_at: Utc::now(),
        },
    })
}
