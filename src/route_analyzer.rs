// src/route_analyzer.rs
//
// Multi-hop route reconstruction from single-pool swap events. Swaps are
// grouped by transaction, ordered by log index, and stitched into a token
// path by following signed amounts: the positive leg is what the trader
// supplied to the pool (input), the negative leg is what the trader
// received (output).

use crate::pricing::{FallbackPrices, MIN_NOTIONAL_USD};
use crate::types::Swap;
use anyhow::{bail, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// Aggregated statistics for one distinct path.
#[derive(Debug, Clone, Serialize)]
pub struct RouteStats {
    /// Symbols joined by `" -> "`.
    pub path: String,
    /// Matching transactions over this exact path.
    pub count: usize,
    pub volume: f64,
    pub avg_volume: f64,
    /// Share of total matched volume, in percent.
    pub pct_volume: f64,
    pub hops: usize,
}

/// Result of one route analysis request.
#[derive(Debug, Clone, Serialize)]
pub struct RouteAnalysis {
    /// Distinct paths, sorted descending by volume (stable on ties).
    pub routes: Vec<RouteStats>,
    pub total_tx: usize,
    pub total_volume: f64,
}

struct AcceptedRoute {
    path: Vec<String>,
    volume: f64,
}

struct PathBucket {
    tx_count: usize,
    volume_usd: f64,
    hops: usize,
}

/// Reconstructs and aggregates trading routes between two tokens.
pub struct RouteAnalyzer {
    fallback_prices: FallbackPrices,
}

impl RouteAnalyzer {
    pub fn new(fallback_prices: FallbackPrices) -> Self {
        Self { fallback_prices }
    }

    /// Reconstructs all routes that start at `start_token` and end at
    /// `end_token` (case-insensitive symbols) within the given swaps.
    ///
    /// Routes are reconstructed per transaction only; swaps never chain
    /// across transaction boundaries. Empty symbols fail fast.
    pub fn analyze_routes(
        &self,
        swaps: &[Swap],
        start_token: &str,
        end_token: &str,
    ) -> Result<RouteAnalysis> {
        let start = start_token.trim().to_uppercase();
        let end = end_token.trim().to_uppercase();
        if start.is_empty() || end.is_empty() {
            bail!("start and end token symbols must be non-empty");
        }

        // Group by transaction, preserving discovery order so equal-volume
        // paths sort deterministically.
        let mut tx_groups: IndexMap<&str, Vec<&Swap>> = IndexMap::new();
        for swap in swaps {
            tx_groups.entry(swap.tx_hash.as_str()).or_default().push(swap);
        }

        let mut accepted: Vec<AcceptedRoute> = Vec::new();
        for (tx_hash, mut events) in tx_groups {
            // Log index order reconstructs on-chain execution order of the
            // chained pool hops.
            events.sort_by_key(|s| s.log_index());

            let first = match events.first() {
                Some(swap) => *swap,
                None => continue,
            };

            // Seed only when the transaction's first ordered swap has the
            // start token as its input (positive) leg.
            let mut current: String;
            let mut path: Vec<String>;
            if first.token0_symbol == start && first.amount0 > 0.0 {
                current = first.token1_symbol.clone();
                path = vec![start.clone(), current.clone()];
            } else if first.token1_symbol == start && first.amount1 > 0.0 {
                current = first.token0_symbol.clone();
                path = vec![start.clone(), current.clone()];
            } else {
                continue;
            }

            // Walk the remaining swaps. A swap that does not continue the
            // chain from the current frontier token is skipped, not a hard
            // stop: this tolerates interleaved unrelated swaps within the
            // transaction, but it can also stitch across a genuine chain
            // break that happens to share a symbol (pinned by test, kept
            // as-is pending a decision on a hard break).
            for swap in &events[1..] {
                if swap.token0_symbol == current && swap.amount0 > 0.0 {
                    current = swap.token1_symbol.clone();
                    path.push(current.clone());
                } else if swap.token1_symbol == current && swap.amount1 > 0.0 {
                    current = swap.token0_symbol.clone();
                    path.push(current.clone());
                }
            }

            // No partial credit: the path must terminate at the end token.
            if path.last().map(String::as_str) != Some(end.as_str()) {
                continue;
            }

            // The first hop's notional is the least double-counted proxy for
            // trade volume. Zero/negligible notionals (unpriced upstream
            // pools) substitute the static reference price approximation.
            let mut volume = first.amount_usd;
            if volume < MIN_NOTIONAL_USD {
                if let Some(approx) = self.fallback_prices.approximate_volume(first) {
                    volume = approx;
                }
            }

            debug!(tx_hash, path = path.join(" -> "), volume, "accepted route");
            accepted.push(AcceptedRoute { path, volume });
        }

        // Fold accepted routes into per-path buckets.
        let mut stats: IndexMap<String, PathBucket> = IndexMap::new();
        for route in &accepted {
            let key = route.path.join(" -> ");
            let bucket = stats.entry(key).or_insert(PathBucket {
                tx_count: 0,
                volume_usd: 0.0,
                hops: route.path.len() - 1,
            });
            bucket.tx_count += 1;
            bucket.volume_usd += route.volume;
        }

        let total_volume: f64 = stats.values().map(|b| b.volume_usd).sum();
        let mut routes: Vec<RouteStats> = stats
            .into_iter()
            .map(|(path, bucket)| RouteStats {
                path,
                count: bucket.tx_count,
                volume: bucket.volume_usd,
                avg_volume: if bucket.tx_count > 0 {
                    bucket.volume_usd / bucket.tx_count as f64
                } else {
                    0.0
                },
                pct_volume: if total_volume > 0.0 {
                    bucket.volume_usd / total_volume * 100.0
                } else {
                    0.0
                },
                hops: bucket.hops,
            })
            .collect();

        // Vec::sort_by is stable, so equal volumes keep discovery order.
        routes.sort_by(|a, b| b.volume.partial_cmp(&a.volume).unwrap_or(Ordering::Equal));

        Ok(RouteAnalysis {
            routes,
            total_tx: accepted.len(),
            total_volume,
        })
    }
}
