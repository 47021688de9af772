//! Tarimas CLI - Inventory reports from the warehouse backend.
//!
//! # Usage
//!
//! ```bash
//! # Headline indicators
//! tarimas indicators
//!
//! # Inventory lines for one client, as JSON log lines
//! tarimas --json list --client Acme
//!
//! # Weekly pallet counts for September
//! tarimas evolution --granularity week --from 2026-09-01 --to 2026-09-30 --metric count
//! ```
//!
//! # Commands
//!
//! - `indicators` - Total weight and assigned/unassigned pallet counts
//! - `options` - Distinct statuses and clients
//! - `distribution` - Weight share per box type
//! - `list` - Inventory lines after filters
//! - `evolution` - Inventory evolution series
//!
//! Configuration comes from the environment; see `tarimas_inventory::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tarimas_core::{Granularity, Metric};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "tarimas_inventory=info,tarimas_cli=info";

#[derive(Parser)]
#[command(name = "tarimas")]
#[command(author, version, about = "Tarimas inventory reports")]
struct Cli {
    /// Emit reports as JSON log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the headline indicators
    Indicators,
    /// List the distinct statuses and clients
    Options,
    /// Show the weight share of each box type
    Distribution,
    /// List inventory lines
    List {
        /// Case-insensitive text matched against code, client, branch, status and box type
        #[arg(short, long)]
        search: Option<String>,

        /// Exact status
        #[arg(long)]
        status: Option<String>,

        /// Exact client label (`Sin asignar` for unassigned pallets)
        #[arg(short, long)]
        client: Option<String>,
    },
    /// Show the inventory evolution series
    Evolution {
        /// Bucket size (`day`, `week`, `month`)
        #[arg(short, long, default_value = "day")]
        granularity: Granularity,

        /// First day of the window (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day of the window (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Value to chart (`weight`, `count`)
        #[arg(short, long, default_value = "weight")]
        metric: Metric,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Indicators => commands::report::indicators().await?,
        Commands::Options => commands::report::options().await?,
        Commands::Distribution => commands::report::distribution().await?,
        Commands::List {
            search,
            status,
            client,
        } => {
            commands::report::list(commands::report::ListArgs {
                search,
                status,
                client,
            })
            .await?;
        }
        Commands::Evolution {
            granularity,
            from,
            to,
            metric,
        } => {
            commands::evolution::show(commands::evolution::EvolutionArgs {
                granularity,
                from,
                to,
                metric,
            })
            .await?;
        }
    }
    Ok(())
}
