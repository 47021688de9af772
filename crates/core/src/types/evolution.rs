//! Time-bucketed inventory evolution.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::filters::Metric;
use super::status::BoxType;

/// One time slot of the evolution series.
///
/// `date` is the first day of the slot (the day itself, the Monday of the
/// week, or the first of the month).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionBucket {
    /// First day of the slot.
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    /// Registered weight per box type.
    #[serde(rename = "pesos", default)]
    pub weights: BTreeMap<BoxType, Decimal>,
    /// Registered pallet count per box type.
    #[serde(rename = "cantidades", default)]
    pub counts: BTreeMap<BoxType, u32>,
}

impl EvolutionBucket {
    /// Value of `box_type` under `metric`, zero when absent.
    #[must_use]
    pub fn value(&self, box_type: &BoxType, metric: Metric) -> Decimal {
        match metric {
            Metric::Weight => self.weights.get(box_type).copied().unwrap_or_default(),
            Metric::Count => self
                .counts
                .get(box_type)
                .map(|count| Decimal::from(*count))
                .unwrap_or_default(),
        }
    }

    /// Box types present in either sub-field.
    pub fn box_types(&self) -> impl Iterator<Item = &BoxType> {
        self.weights.keys().chain(self.counts.keys())
    }
}
