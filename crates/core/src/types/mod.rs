//! Core types for Tarimas.
//!
//! This module provides type-safe wrappers for the inventory domain.

pub mod evolution;
pub mod filters;
pub mod id;
pub mod inventory;
pub mod patch;
pub mod status;

pub use evolution::EvolutionBucket;
pub use filters::{
    DateWindow, EvolutionFilterUpdate, EvolutionFilters, Granularity, ListFilterKey, ListFilters,
    Metric,
};
pub use id::*;
pub use inventory::{FilterOptions, Indicators, InventoryLine, OrderRef};
pub use patch::{AssignmentPatch, AssignmentTarget, ReleasePatch};
pub use status::*;
