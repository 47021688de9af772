//! REST client for the inventory backend.
//!
//! Implements [`crate::source::InventorySource`] and
//! [`crate::source::AssignmentBackend`] over HTTP. Reads are cached with
//! `moka` for the configured TTL; any mutation or explicit invalidation drops
//! the whole cache.

mod cache;
mod client;

pub use cache::{CacheKey, CacheValue};
pub use client::InventoryApiClient;
