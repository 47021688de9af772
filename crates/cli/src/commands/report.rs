//! Snapshot reports over the current inventory.

use tarimas_core::{Granularity, ListFilterKey};

use super::{CommandError, open_store};

/// Filters accepted by `list`.
#[derive(Debug, Default)]
pub struct ListArgs {
    pub search: Option<String>,
    pub status: Option<String>,
    pub client: Option<String>,
}

/// Log the headline indicators.
pub async fn indicators() -> Result<(), CommandError> {
    let store = open_store(None, Granularity::default()).await?;
    let indicators = store.indicators();

    tracing::info!(
        total_weight = %indicators.total_weight,
        assigned_pallets = indicators.assigned_pallets,
        unassigned_pallets = indicators.unassigned_pallets,
        unassigned_weight = %indicators.unassigned_weight,
        "Inventory indicators"
    );
    Ok(())
}

/// Log the distinct statuses and clients.
pub async fn options() -> Result<(), CommandError> {
    let store = open_store(None, Granularity::default()).await?;
    let options = store.filter_options();

    tracing::info!(statuses = ?options.statuses, "Statuses");
    tracing::info!(clients = ?options.clients, "Clients");
    Ok(())
}

/// Log the weight share of each box type.
pub async fn distribution() -> Result<(), CommandError> {
    let store = open_store(None, Granularity::default()).await?;
    let rows = store.formatted_distribution();

    if rows.is_empty() {
        tracing::warn!("No inventory weight to distribute");
    }
    for row in rows {
        tracing::info!(
            box_type = %row.box_type,
            weight = %row.quantity,
            percentage = %row.percentage,
            "Distribution"
        );
    }
    Ok(())
}

/// Log the inventory lines passing `args`.
pub async fn list(args: ListArgs) -> Result<(), CommandError> {
    let store = open_store(None, Granularity::default()).await?;

    let filters = [
        (ListFilterKey::Search, args.search),
        (ListFilterKey::Status, args.status),
        (ListFilterKey::Client, args.client),
    ];
    for (key, value) in filters {
        if let Some(value) = value {
            store.set_list_filter(key, value);
        }
    }

    let lines = store.filtered_records();
    for line in &lines {
        tracing::info!(
            code = %line.pallet_code,
            box_type = %line.box_type,
            weight = %line.weight,
            client = line.client.label(),
            branch = line.branch.as_deref().unwrap_or("-"),
            status = %line.status,
            "Line"
        );
    }
    tracing::info!(
        shown = lines.len(),
        total = store.records().len(),
        "Listed inventory lines"
    );
    Ok(())
}
