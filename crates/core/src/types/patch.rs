//! Inputs for moving pallets between client orders.

use serde::{Deserialize, Serialize};

use super::id::{OrderId, PalletCode};

/// Client and branch an order resolves to, as confirmed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentTarget {
    /// Client name.
    #[serde(rename = "cliente")]
    pub client: String,
    /// Branch name.
    #[serde(rename = "sucursal", default)]
    pub branch: Option<String>,
}

/// Pallets to attach to a client order, applied once and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentPatch {
    /// Order the pallets join.
    pub order_id: OrderId,
    /// Client and branch of that order.
    pub target: AssignmentTarget,
    /// Pallets moved.
    pub pallet_codes: Vec<PalletCode>,
}

/// Detaches one pallet from the order it was assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasePatch {
    /// Order the pallet leaves.
    #[serde(rename = "pedido_id")]
    pub order_id: OrderId,
    /// Pallet released.
    #[serde(rename = "codigo")]
    pub pallet_code: PalletCode,
}
