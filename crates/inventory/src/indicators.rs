//! Aggregate counters over the inventory line collection.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tarimas_core::{Indicators, InventoryLine, PalletCode};

/// Per-pallet totals gathered before classification.
struct PalletTotals {
    weight: Decimal,
    assigned: bool,
}

/// Compute [`Indicators`] for `lines`.
///
/// Lines are grouped by pallet code first, so a pallet carrying several box
/// types counts once while all of its per-type weights are summed. A pallet
/// is assigned when its first line names a client.
#[must_use]
pub fn compute_indicators(lines: &[InventoryLine]) -> Indicators {
    let mut pallets: HashMap<&PalletCode, PalletTotals> = HashMap::new();

    for line in lines {
        pallets
            .entry(&line.pallet_code)
            .and_modify(|totals| totals.weight += line.weight)
            .or_insert_with(|| PalletTotals {
                weight: line.weight,
                assigned: line.client.is_assigned(),
            });
    }

    pallets
        .values()
        .fold(Indicators::default(), |mut indicators, pallet| {
            indicators.total_weight += pallet.weight;
            if pallet.assigned {
                indicators.assigned_pallets += 1;
            } else {
                indicators.unassigned_pallets += 1;
                indicators.unassigned_weight += pallet.weight;
            }
            indicators
        })
}
