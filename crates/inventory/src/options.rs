//! List-view filtering and the distinct values offered as filter choices.

use std::collections::BTreeSet;

use tarimas_core::{FilterOptions, InventoryLine, ListFilters};

/// Distinct non-empty status labels and client labels, sorted
/// lexicographically.
#[must_use]
pub fn extract_filter_options(lines: &[InventoryLine]) -> FilterOptions {
    let statuses: BTreeSet<&str> = lines
        .iter()
        .map(|line| line.status.trim())
        .filter(|status| !status.is_empty())
        .collect();
    let clients: BTreeSet<&str> = lines
        .iter()
        .map(|line| line.client.label())
        .filter(|client| !client.is_empty())
        .collect();

    FilterOptions {
        statuses: statuses.into_iter().map(str::to_owned).collect(),
        clients: clients.into_iter().map(str::to_owned).collect(),
    }
}

/// Whether `line` passes every non-empty field of `filters`.
#[must_use]
pub fn matches_filters(line: &InventoryLine, filters: &ListFilters) -> bool {
    if !filters.status.is_empty() && line.status.trim() != filters.status {
        return false;
    }
    if !filters.client.is_empty() && line.client.label() != filters.client {
        return false;
    }

    let needle = filters.search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [
        line.pallet_code.as_str(),
        line.client.label(),
        line.branch.as_deref().unwrap_or_default(),
        line.status.as_str(),
        line.box_type.label(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}

/// Lines of `lines` passing `filters`, in their original order.
#[must_use]
pub fn filter_lines(lines: &[InventoryLine], filters: &ListFilters) -> Vec<InventoryLine> {
    if filters.is_empty() {
        return lines.to_vec();
    }
    lines
        .iter()
        .filter(|line| matches_filters(line, filters))
        .cloned()
        .collect()
}
