//! Cache types for inventory backend reads.

use std::sync::Arc;

use chrono::NaiveDate;
use tarimas_core::{EvolutionBucket, Granularity, InventoryLine};

/// Cache key for bulk and evolution reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    InventoryLines,
    Evolution {
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    InventoryLines(Arc<Vec<InventoryLine>>),
    Evolution(Arc<Vec<EvolutionBucket>>),
}
