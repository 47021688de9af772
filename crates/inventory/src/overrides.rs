//! Optimistic local overrides layered over the fetched collection.
//!
//! When a pallet is assigned to or released from a client order, the caller
//! has already confirmed the change with the backend. Rather than waiting
//! for a reload, the store records a [`LocalOverride`] per pallet and shows
//! the collection with the overrides applied. The next successful load
//! replaces the collection and clears every override.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tarimas_core::{
    AssignmentPatch, ClientAssignment, InventoryLine, OrderRef, OrderStatus, PalletCode,
};

/// Pending local change for one pallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOverride {
    /// Pallet joined a client order.
    Assigned {
        client: String,
        branch: Option<String>,
        order: OrderRef,
    },
    /// Pallet was released from its order.
    Unassigned,
}

impl LocalOverride {
    fn apply_to(&self, line: &mut InventoryLine) {
        match self {
            Self::Assigned {
                client,
                branch,
                order,
            } => {
                line.client = ClientAssignment::client(client.as_str());
                line.branch.clone_from(branch);
                line.order = Some(order.clone());
            }
            Self::Unassigned => {
                line.client = ClientAssignment::Unassigned;
                line.branch = None;
                line.order = None;
            }
        }
    }
}

/// Overrides keyed by pallet code; the latest change per pallet wins.
#[derive(Debug, Clone, Default)]
pub struct OverrideLayer {
    overrides: HashMap<PalletCode, LocalOverride>,
}

impl OverrideLayer {
    /// Record an assignment of every pallet in `patch`.
    ///
    /// The synthetic order reference is stamped with `now` and marked
    /// active; it exists only for display until the next load.
    pub fn assign(&mut self, patch: &AssignmentPatch, now: DateTime<Utc>) {
        let order = OrderRef {
            id: patch.order_id,
            client: patch.target.client.clone(),
            branch: patch.target.branch.clone(),
            status: OrderStatus::Active,
            created_at: now,
            updated_at: now,
        };
        for code in &patch.pallet_codes {
            self.overrides.insert(
                code.clone(),
                LocalOverride::Assigned {
                    client: patch.target.client.clone(),
                    branch: patch.target.branch.clone(),
                    order: order.clone(),
                },
            );
        }
    }

    /// Record a release of every pallet in `codes`.
    pub fn unassign(&mut self, codes: &[PalletCode]) {
        for code in codes {
            self.overrides.insert(code.clone(), LocalOverride::Unassigned);
        }
    }

    /// Drop every override.
    pub fn clear(&mut self) {
        self.overrides.clear();
    }

    /// Number of pallets with a pending override.
    #[must_use]
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    /// Whether no override is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// `canonical` with every override applied, in the original order.
    #[must_use]
    pub fn apply(&self, canonical: &[InventoryLine]) -> Vec<InventoryLine> {
        canonical
            .iter()
            .map(|line| {
                let mut line = line.clone();
                if let Some(local) = self.overrides.get(&line.pallet_code) {
                    local.apply_to(&mut line);
                }
                line
            })
            .collect()
    }
}
