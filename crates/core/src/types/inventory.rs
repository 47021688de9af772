//! Inventory line items and the indicators derived from them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, PalletCode};
use super::status::{BoxType, ClientAssignment, OrderStatus};

/// One classification of one pallet: the weight of a single box type on it.
///
/// A pallet carrying several box types is reported as several lines sharing
/// the same [`PalletCode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLine {
    /// Pallet this line belongs to.
    #[serde(rename = "codigo")]
    pub pallet_code: PalletCode,
    /// Box-size bucket.
    #[serde(rename = "tipo")]
    pub box_type: BoxType,
    /// Weight of this box type on the pallet.
    #[serde(rename = "peso", with = "rust_decimal::serde::float")]
    pub weight: Decimal,
    /// Client the pallet is committed to.
    #[serde(rename = "cliente", default)]
    pub client: ClientAssignment,
    /// Client branch receiving the pallet.
    #[serde(rename = "sucursal", default)]
    pub branch: Option<String>,
    /// Free-form warehouse status label.
    #[serde(rename = "estatus", default)]
    pub status: String,
    /// When the pallet was registered.
    #[serde(rename = "fecha_registro")]
    pub registered_at: DateTime<Utc>,
    /// Order the pallet is attached to, if any.
    #[serde(rename = "pedido", default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderRef>,
}

/// Client order a pallet is attached to, as displayed next to the pallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    /// Order ID.
    pub id: OrderId,
    /// Client that placed the order.
    #[serde(rename = "cliente")]
    pub client: String,
    /// Branch the order ships to.
    #[serde(rename = "sucursal", default)]
    pub branch: Option<String>,
    /// Order status.
    #[serde(rename = "estatus", default)]
    pub status: OrderStatus,
    /// When the order was created.
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    /// When the order was last updated.
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counters over the whole inventory.
///
/// Always derived from the line collection, never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Indicators {
    /// Weight across every line, counted once per pallet.
    #[serde(rename = "pesoTotalInventario")]
    pub total_weight: Decimal,
    /// Distinct pallets committed to a client.
    #[serde(rename = "tarimasAsignadas")]
    pub assigned_pallets: usize,
    /// Distinct pallets not committed to any client.
    #[serde(rename = "tarimasNoAsignadas")]
    pub unassigned_pallets: usize,
    /// Weight of the unassigned pallets.
    #[serde(rename = "pesoTotalSinAsignar")]
    pub unassigned_weight: Decimal,
}

impl Indicators {
    /// Number of distinct pallets counted.
    #[must_use]
    pub const fn total_pallets(&self) -> usize {
        self.assigned_pallets + self.unassigned_pallets
    }
}

/// Distinct values available for the list filter dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Status labels, sorted.
    #[serde(rename = "estatus")]
    pub statuses: Vec<String>,
    /// Client names, sorted.
    #[serde(rename = "clientes")]
    pub clients: Vec<String>,
}
