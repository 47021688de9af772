//! Collaborator seams consumed by the store.
//!
//! The store never talks HTTP itself. It reads through an [`InventorySource`]
//! and, for the confirmed mutation helpers, writes through an
//! [`AssignmentBackend`]. [`crate::api::InventoryApiClient`] implements both
//! against the REST backend; tests plug in in-memory fakes.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tarimas_core::{
    AssignmentTarget, EvolutionBucket, Granularity, InventoryLine, OrderId, PalletCode,
    ReleasePatch,
};

use crate::error::SourceError;
use crate::events::Origin;

/// Read side of the inventory backend.
pub trait InventorySource {
    /// Full bulk read of the current inventory lines.
    fn fetch_inventory_lines(
        &self,
    ) -> impl Future<Output = Result<Vec<InventoryLine>, SourceError>> + Send;

    /// Evolution buckets for one granularity over an inclusive date range.
    fn fetch_evolution(
        &self,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<EvolutionBucket>, SourceError>> + Send;

    /// Drop any memoized reads so the next fetch hits the backend.
    ///
    /// `origin` names the store that asked, for diagnostics only.
    fn invalidate_cache(&self, origin: &Origin);
}

/// Write side used to move pallets between client orders.
pub trait AssignmentBackend {
    /// Attach pallets to an order; returns the order's client and branch.
    fn assign_pallets(
        &self,
        order_id: OrderId,
        pallet_codes: &[PalletCode],
    ) -> impl Future<Output = Result<AssignmentTarget, SourceError>> + Send;

    /// Detach pallets from the orders named in each patch.
    fn unassign_pallets(
        &self,
        patches: &[ReleasePatch],
    ) -> impl Future<Output = Result<(), SourceError>> + Send;
}

impl<T: InventorySource + Send + Sync + ?Sized> InventorySource for Arc<T> {
    fn fetch_inventory_lines(
        &self,
    ) -> impl Future<Output = Result<Vec<InventoryLine>, SourceError>> + Send {
        (**self).fetch_inventory_lines()
    }

    fn fetch_evolution(
        &self,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<EvolutionBucket>, SourceError>> + Send {
        (**self).fetch_evolution(granularity, start, end)
    }

    fn invalidate_cache(&self, origin: &Origin) {
        (**self).invalidate_cache(origin);
    }
}

impl<T: AssignmentBackend + Send + Sync + ?Sized> AssignmentBackend for Arc<T> {
    fn assign_pallets(
        &self,
        order_id: OrderId,
        pallet_codes: &[PalletCode],
    ) -> impl Future<Output = Result<AssignmentTarget, SourceError>> + Send {
        (**self).assign_pallets(order_id, pallet_codes)
    }

    fn unassign_pallets(
        &self,
        patches: &[ReleasePatch],
    ) -> impl Future<Output = Result<(), SourceError>> + Send {
        (**self).unassign_pallets(patches)
    }
}
