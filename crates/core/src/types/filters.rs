//! View filters for the inventory list and the evolution chart.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Filters applied to the in-memory inventory list.
///
/// An empty field means "no restriction".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListFilters {
    /// Free-text search over code, client, branch, status and box type.
    #[serde(rename = "busqueda", default)]
    pub search: String,
    /// Exact status label.
    #[serde(rename = "estatus", default)]
    pub status: String,
    /// Exact client label.
    #[serde(rename = "cliente", default)]
    pub client: String,
}

/// Field of [`ListFilters`] addressed by a filter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListFilterKey {
    Search,
    Status,
    Client,
}

impl ListFilters {
    /// Replace one field.
    pub fn set(&mut self, key: ListFilterKey, value: impl Into<String>) {
        let value = value.into();
        match key {
            ListFilterKey::Search => self.search = value,
            ListFilterKey::Status => self.status = value,
            ListFilterKey::Client => self.client = value,
        }
    }

    /// Whether no field restricts the list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.status.is_empty() && self.client.is_empty()
    }
}

/// Time bucket size of the evolution series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Granularity {
    #[default]
    #[serde(rename = "diaria")]
    Day,
    #[serde(rename = "semanal")]
    Week,
    #[serde(rename = "mensual")]
    Month,
}

impl Granularity {
    /// Backend path segment for this granularity's range query.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "diaria",
            Self::Week => "semanal",
            Self::Month => "mensual",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" | "diaria" => Ok(Self::Day),
            "week" | "semanal" => Ok(Self::Week),
            "month" | "mensual" => Ok(Self::Month),
            _ => Err(format!("invalid granularity: {s}")),
        }
    }
}

/// Which field of an evolution bucket the chart projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    #[serde(rename = "peso")]
    Weight,
    #[serde(rename = "cantidad")]
    Count,
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weight" | "peso" => Ok(Self::Weight),
            "count" | "cantidad" => Ok(Self::Count),
            _ => Err(format!("invalid metric: {s}")),
        }
    }
}

/// Inclusive date range of the evolution query.
///
/// Construction orders the bounds, so `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateWindow {
    #[serde(rename = "fecha_inicio")]
    start: NaiveDate,
    #[serde(rename = "fecha_fin")]
    end: NaiveDate,
}

impl DateWindow {
    /// Window between two dates, in either order.
    #[must_use]
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// The `days` days ending on `today`, inclusive.
    #[must_use]
    pub fn last_days(today: NaiveDate, days: u64) -> Self {
        let start = today
            .checked_sub_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(NaiveDate::MIN);
        Self::new(start, today)
    }

    /// First day of the window.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the window.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }
}

/// Filters driving the evolution chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvolutionFilters {
    /// Date range queried.
    #[serde(flatten)]
    pub window: DateWindow,
    /// Bucket size queried.
    #[serde(rename = "granularidad")]
    pub granularity: Granularity,
    /// Field projected into the chart.
    #[serde(rename = "metrica")]
    pub metric: Metric,
}

impl EvolutionFilters {
    /// Default filters: daily weight over the given window.
    #[must_use]
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            granularity: Granularity::default(),
            metric: Metric::default(),
        }
    }
}

/// One change to [`EvolutionFilters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionFilterUpdate {
    Window(DateWindow),
    Granularity(Granularity),
    Metric(Metric),
}

impl EvolutionFilterUpdate {
    /// Whether applying this update changes what must be fetched.
    ///
    /// Only the window and the granularity are part of the query; the metric
    /// only selects a field of buckets already held.
    #[must_use]
    pub const fn changes_query(&self) -> bool {
        matches!(self, Self::Window(_) | Self::Granularity(_))
    }
}
