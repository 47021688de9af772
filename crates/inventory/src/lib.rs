//! Tarimas inventory engine.
//!
//! Aggregates the pallet inventory served by the warehouse backend into the
//! views the dashboard renders, and keeps several views of the same data in
//! step through an in-process event bus.
//!
//! # Modules
//!
//! - [`store`] - Record store: loading, filters, optimistic mutations, bus sync
//! - [`indicators`] - Pallet-level totals
//! - [`options`] - Filter option extraction and list filtering
//! - [`evolution`] - Evolution series loading and per-granularity cache
//! - [`series`] - Chart and distribution formatting
//! - [`overrides`] - Optimistic local overrides
//! - [`events`] - Typed event bus
//! - [`source`] - Backend collaborator traits
//! - [`api`] - REST implementation of the collaborators
//! - [`config`] - Environment configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod evolution;
pub mod indicators;
pub mod options;
pub mod overrides;
pub mod series;
pub mod source;
pub mod store;

#[cfg(test)]
mod testing;

pub use api::InventoryApiClient;
pub use config::{ConfigError, InventoryConfig};
pub use error::SourceError;
pub use events::{BusEvent, DataChange, EventBus, EventKind, Origin, Subscription};
pub use source::{AssignmentBackend, InventorySource};
pub use store::{InventorySnapshot, InventoryStore, StoreSettings};
