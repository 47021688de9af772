//! Chart-ready projections of evolution buckets and of the line collection.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tarimas_core::{BoxType, EvolutionBucket, InventoryLine, Metric};

/// Date label format used on the chart axis.
const DATE_LABEL_FORMAT: &str = "%d/%m/%Y";

/// One point of the evolution chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartRow {
    /// First day of the bucket.
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    /// Axis label, `dd/mm/yyyy`.
    #[serde(rename = "etiqueta")]
    pub label: String,
    /// Projected value per box type; every box type in the series is present.
    #[serde(flatten)]
    pub values: BTreeMap<BoxType, Decimal>,
}

/// Share of total weight held by one box type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionRow {
    /// Box type.
    #[serde(rename = "tipo")]
    pub box_type: BoxType,
    /// Summed weight of the type.
    #[serde(rename = "cantidad")]
    pub quantity: Decimal,
    /// Percentage of the grand total, two decimals.
    #[serde(rename = "porcentaje")]
    pub percentage: Decimal,
}

/// Project `buckets` onto chart rows, selecting weight or count per `metric`.
///
/// Every row carries the same box-type columns: the known sizes plus any
/// other type appearing anywhere in the series, zero-filled.
#[must_use]
pub fn format_evolution(buckets: &[EvolutionBucket], metric: Metric) -> Vec<ChartRow> {
    let columns: BTreeSet<BoxType> = BoxType::PRIORITY
        .into_iter()
        .chain(buckets.iter().flat_map(EvolutionBucket::box_types).cloned())
        .collect();

    buckets
        .iter()
        .map(|bucket| ChartRow {
            date: bucket.date,
            label: bucket.date.format(DATE_LABEL_FORMAT).to_string(),
            values: columns
                .iter()
                .map(|box_type| (box_type.clone(), bucket.value(box_type, metric)))
                .collect(),
        })
        .collect()
}

/// Weight per box type with its share of the total, in box-type priority
/// order.
///
/// Returns an empty list when the grand total is zero.
#[must_use]
pub fn format_distribution(lines: &[InventoryLine]) -> Vec<DistributionRow> {
    let mut per_type: BTreeMap<&BoxType, Decimal> = BTreeMap::new();
    for line in lines {
        *per_type.entry(&line.box_type).or_default() += line.weight;
    }

    let total: Decimal = per_type.values().copied().sum();
    if total.is_zero() {
        return Vec::new();
    }

    per_type
        .into_iter()
        .map(|(box_type, quantity)| DistributionRow {
            box_type: box_type.clone(),
            quantity,
            percentage: (quantity * Decimal::ONE_HUNDRED / total)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        })
        .collect()
}
