//! Evolution series report.

use chrono::{NaiveDate, Utc};
use tarimas_core::{DateWindow, EvolutionFilterUpdate, Granularity, Metric};
use tarimas_inventory::store::DEFAULT_EVOLUTION_DAYS;

use super::{CommandError, open_store};

/// Arguments accepted by `evolution`.
#[derive(Debug)]
pub struct EvolutionArgs {
    pub granularity: Granularity,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub metric: Metric,
}

/// Log one chart row per bucket.
pub async fn show(args: EvolutionArgs) -> Result<(), CommandError> {
    let window = match (args.from, args.to) {
        (Some(from), Some(to)) => Some(DateWindow::new(from, to)),
        (Some(from), None) => Some(DateWindow::new(from, Utc::now().date_naive())),
        (None, Some(to)) => Some(DateWindow::last_days(to, DEFAULT_EVOLUTION_DAYS)),
        (None, None) => None,
    };

    let store = open_store(window, args.granularity).await?;
    store
        .set_evolution_filter(EvolutionFilterUpdate::Metric(args.metric))
        .await?;

    let rows = store.formatted_evolution();
    if rows.is_empty() {
        tracing::warn!(granularity = %args.granularity, "No evolution data in window");
    }
    for row in &rows {
        tracing::info!(
            date = %row.label,
            values = %serde_json::to_string(&row.values)?,
            "Evolution"
        );
    }
    if let (Some(window), Some(fetched_at)) = (
        store.evolution_window_held(args.granularity),
        store.evolution_fetched_at(args.granularity),
    ) {
        tracing::info!(
            buckets = rows.len(),
            from = %window.start(),
            to = %window.end(),
            %fetched_at,
            "Evolution series"
        );
    }
    Ok(())
}
