//! Tarimas Core - Shared inventory types.
//!
//! This crate provides the data model used across all Tarimas components:
//! - `inventory` - Aggregation and synchronization engine for the dashboard
//! - `cli` - Command-line reports against the inventory backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no derived
//! computations. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Pallet codes, box types, inventory lines, filters and
//!   evolution buckets

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
