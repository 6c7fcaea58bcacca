//! # Route Indexer CLI
//!
//! Command-line entrypoint for the Swap Routing SDK.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin route_indexer -- sync
//! cargo run --bin route_indexer -- routes --start-token EURC --end-token EURCV --days 30
//! cargo run --bin route_indexer -- pairs --days 7
//! ```
//!
//! `sync` fetches new swaps from the subgraph into PostgreSQL; `routes` and
//! `pairs` analyze what is already persisted.

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use swap_routing_sdk::{
    aggregator::SortBy,
    database,
    pricing::FallbackPrices,
    settings::Settings,
    subgraph::SubgraphClient,
    tokens::TokenRegistry,
    RouteAnalyzer, SwapAggregator, SwapFetcher, SwapIngestPipeline,
};

#[derive(Parser)]
#[command(name = "route_indexer", about = "Uniswap V3 swap ingestion and route analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch new swaps from the subgraph and persist them
    Sync,
    /// Reconstruct routes between two tokens from persisted swaps
    Routes {
        #[arg(long)]
        start_token: String,
        #[arg(long)]
        end_token: String,
        /// Lookback window in days
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Aggregate per-pair and per-token volume statistics
    Pairs {
        /// Lookback window in days
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Installs the tracing subscriber as the single global logger. Its log
/// bridge also captures the `log::` macros used by the database layer, so
/// no second logger may be installed.
fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let settings = Settings::new()?;
    let fallback_prices = FallbackPrices::new(settings.analysis.fallback_prices.clone());

    match cli.command {
        Command::Sync => {
            let db_pool = database::connect(&settings.database).await?;
            let registry = Arc::new(TokenRegistry::new(&settings.tokens));
            let client = Arc::new(SubgraphClient::new(&settings.subgraph)?);
            let fetcher = SwapFetcher::new(client, registry, settings.subgraph.page_size);
            let pipeline =
                SwapIngestPipeline::new(fetcher, db_pool, settings.sync.backfill_days);
            let total = pipeline.run_once().await?;
            println!("Synchronized {} swaps.", total);
        }
        Command::Routes {
            start_token,
            end_token,
            days,
        } => {
            let db_pool = database::connect(&settings.database).await?;
            let now = Utc::now().timestamp();
            let swaps =
                database::load_swaps(&db_pool, now - days * SECONDS_PER_DAY, now, None).await?;
            let analyzer = RouteAnalyzer::new(fallback_prices);
            let analysis = analyzer.analyze_routes(&swaps, &start_token, &end_token)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Command::Pairs { days } => {
            let db_pool = database::connect(&settings.database).await?;
            let now = Utc::now().timestamp();
            let swaps =
                database::load_swaps(&db_pool, now - days * SECONDS_PER_DAY, now, None).await?;
            let mut aggregator = SwapAggregator::new(fallback_prices)
                .with_transaction_limit(settings.analysis.max_pair_transactions);
            aggregator.aggregate_swaps(&swaps);

            let pairs = aggregator.sorted_pairs(SortBy::Volume);
            let report = serde_json::json!({
                "pairs": pairs.iter().map(|(name, stats)| {
                    serde_json::json!({ "pair": name, "volume_usd": stats.volume_usd, "tx_count": stats.tx_count })
                }).collect::<Vec<_>>(),
                "tokens": aggregator.sorted_tokens(SortBy::Volume).iter().map(|(name, stats)| {
                    serde_json::json!({ "token": name, "volume_usd": stats.volume_usd, "tx_count": stats.tx_count, "pairs": stats.pairs })
                }).collect::<Vec<_>>(),
                "summary": aggregator.summary(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_installs_single_global_logger() {
        // First install must succeed: nothing else may have claimed the
        // global `log` logger before the tracing subscriber's bridge.
        init_tracing().unwrap();
        log::info!("log macros route through the bridge");
        tracing::info!("subscriber is live");
        // A second install is rejected as an error, not a panic.
        assert!(init_tracing().is_err());
    }
}
