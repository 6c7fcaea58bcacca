// src/aggregator.rs
//
// Per-pair and per-token volume aggregation over a flat swap set. No
// transaction grouping here: every swap contributes to exactly one
// unordered pair bucket. Buckets are rebuilt from scratch on every call.

use crate::pricing::{FallbackPrices, MIN_NOTIONAL_USD};
use crate::types::Swap;
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;

/// Default cap on contributing transaction references kept per pair.
pub const DEFAULT_MAX_PAIR_TRANSACTIONS: usize = 100;

/// Sort key for the pair and token views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Volume,
    TxCount,
}

/// One contributing transaction reference inside a pair bucket.
#[derive(Debug, Clone, Serialize)]
pub struct PairTransaction {
    pub timestamp: i64,
    pub tx_hash: String,
    pub amount_usd: f64,
}

/// Aggregated statistics for one unordered token pair.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PairStats {
    pub volume_usd: f64,
    pub tx_count: usize,
    /// Bounded list of contributing transactions.
    pub transactions: Vec<PairTransaction>,
}

/// Per-token statistics derived from the pair buckets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenStats {
    pub volume_usd: f64,
    pub tx_count: usize,
    /// Distinct pairs this token participates in.
    pub pairs: Vec<String>,
}

/// Summary across all pair buckets.
#[derive(Debug, Clone, Serialize)]
pub struct AggregationSummary {
    pub total_pairs: usize,
    pub total_volume_usd: f64,
    pub total_transactions: usize,
    pub avg_volume_per_pair: f64,
    pub avg_txs_per_pair: f64,
}

/// Aggregates swap sets by unordered token pair.
pub struct SwapAggregator {
    fallback_prices: FallbackPrices,
    max_pair_transactions: usize,
    pair_data: IndexMap<String, PairStats>,
}

impl SwapAggregator {
    pub fn new(fallback_prices: FallbackPrices) -> Self {
        Self {
            fallback_prices,
            max_pair_transactions: DEFAULT_MAX_PAIR_TRANSACTIONS,
            pair_data: IndexMap::new(),
        }
    }

    /// Overrides the per-pair transaction reference cap.
    pub fn with_transaction_limit(mut self, limit: usize) -> Self {
        self.max_pair_transactions = limit;
        self
    }

    /// Canonical unordered pair: lexicographic order of the two symbols, so
    /// `A-B` and `B-A` fold into one bucket.
    pub fn normalize_pair(token0: &str, token1: &str) -> (String, String) {
        if token0 <= token1 {
            (token0.to_string(), token1.to_string())
        } else {
            (token1.to_string(), token0.to_string())
        }
    }

    /// Rebuilds all pair buckets from the given swaps and returns them,
    /// keyed `"<A>-<B>"`. Swaps whose upstream notional is negligible use
    /// the injected reference-price approximation, identical to the route
    /// analyzer's substitution.
    pub fn aggregate_swaps(&mut self, swaps: &[Swap]) -> &IndexMap<String, PairStats> {
        self.pair_data.clear();

        for swap in swaps {
            let (a, b) = Self::normalize_pair(&swap.token0_symbol, &swap.token1_symbol);
            let pair_name = format!("{}-{}", a, b);

            let mut volume = swap.amount_usd.abs();
            if volume < MIN_NOTIONAL_USD {
                if let Some(approx) = self.fallback_prices.approximate_volume(swap) {
                    volume = approx;
                }
            }

            let entry = self.pair_data.entry(pair_name).or_default();
            entry.volume_usd += volume;
            entry.tx_count += 1;
            if entry.transactions.len() < self.max_pair_transactions {
                entry.transactions.push(PairTransaction {
                    timestamp: swap.timestamp,
                    tx_hash: swap.tx_hash.clone(),
                    amount_usd: volume,
                });
            }
        }

        &self.pair_data
    }

    pub fn pair_data(&self) -> &IndexMap<String, PairStats> {
        &self.pair_data
    }

    /// Pairs sorted descending by the given key; ties keep iteration order.
    pub fn sorted_pairs(&self, by: SortBy) -> Vec<(&str, &PairStats)> {
        let mut pairs: Vec<(&str, &PairStats)> = self
            .pair_data
            .iter()
            .map(|(name, stats)| (name.as_str(), stats))
            .collect();
        match by {
            SortBy::Volume => pairs.sort_by(|a, b| {
                b.1.volume_usd
                    .partial_cmp(&a.1.volume_usd)
                    .unwrap_or(Ordering::Equal)
            }),
            SortBy::TxCount => pairs.sort_by(|a, b| b.1.tx_count.cmp(&a.1.tx_count)),
        }
        pairs
    }

    /// Per-token statistics folded from the pair buckets: a token inherits
    /// the full volume and count of every pair it participates in.
    pub fn token_volumes(&self) -> IndexMap<String, TokenStats> {
        let mut token_stats: IndexMap<String, TokenStats> = IndexMap::new();
        for (pair_name, stats) in &self.pair_data {
            for token in pair_name.split('-') {
                let entry = token_stats.entry(token.to_string()).or_default();
                entry.volume_usd += stats.volume_usd;
                entry.tx_count += stats.tx_count;
                entry.pairs.push(pair_name.clone());
            }
        }
        token_stats
    }

    /// Tokens sorted descending by the given key; ties keep iteration order.
    pub fn sorted_tokens(&self, by: SortBy) -> Vec<(String, TokenStats)> {
        let mut tokens: Vec<(String, TokenStats)> = self.token_volumes().into_iter().collect();
        match by {
            SortBy::Volume => tokens.sort_by(|a, b| {
                b.1.volume_usd
                    .partial_cmp(&a.1.volume_usd)
                    .unwrap_or(Ordering::Equal)
            }),
            SortBy::TxCount => tokens.sort_by(|a, b| b.1.tx_count.cmp(&a.1.tx_count)),
        }
        tokens
    }

    /// Summary statistics across all pair buckets.
    pub fn summary(&self) -> AggregationSummary {
        let total_volume_usd: f64 = self.pair_data.values().map(|s| s.volume_usd).sum();
        let total_transactions: usize = self.pair_data.values().map(|s| s.tx_count).sum();
        let total_pairs = self.pair_data.len();
        AggregationSummary {
            total_pairs,
            total_volume_usd,
            total_transactions,
            avg_volume_per_pair: if total_pairs > 0 {
                total_volume_usd / total_pairs as f64
            } else {
                0.0
            },
            avg_txs_per_pair: if total_pairs > 0 {
                total_transactions as f64 / total_pairs as f64
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap(tx: &str, t0: &str, t1: &str, a0: f64, a1: f64, usd: f64) -> Swap {
        Swap {
            id: format!("{}#1", tx),
            timestamp: 1_700_000_000,
            tx_hash: tx.to_string(),
            token0_address: String::new(),
            token1_address: String::new(),
            token0_symbol: t0.to_string(),
            token1_symbol: t1.to_string(),
            amount0: a0,
            amount1: a1,
            amount_usd: usd,
            fee_tier: "0.3%".to_string(),
        }
    }

    fn aggregator() -> SwapAggregator {
        SwapAggregator::new(FallbackPrices::default())
    }

    #[test]
    fn test_normalize_pair_is_symmetric() {
        assert_eq!(
            SwapAggregator::normalize_pair("LINK", "AAVE"),
            SwapAggregator::normalize_pair("AAVE", "LINK")
        );
        assert_eq!(
            SwapAggregator::normalize_pair("LINK", "AAVE"),
            ("AAVE".to_string(), "LINK".to_string())
        );
    }

    #[test]
    fn test_reversed_pairs_share_one_bucket() {
        let swaps = vec![
            swap("tx1", "AAVE", "LINK", 10.0, -5.0, 100.0),
            swap("tx2", "LINK", "AAVE", 5.0, -10.0, 200.0),
        ];
        let mut agg = aggregator();
        let pairs = agg.aggregate_swaps(&swaps);
        assert_eq!(pairs.len(), 1);
        let stats = &pairs["AAVE-LINK"];
        assert_eq!(stats.tx_count, 2);
        assert_eq!(stats.volume_usd, 300.0);
    }

    #[test]
    fn test_totals_conservation() {
        // No fallback pricing triggered: summed bucket volume must equal
        // summed input volume exactly.
        let swaps = vec![
            swap("tx1", "AAVE", "LINK", 1.0, -1.0, 100.0),
            swap("tx2", "UNI", "WETH", 1.0, -1.0, 250.0),
            swap("tx3", "AAVE", "LINK", 1.0, -1.0, 50.0),
        ];
        let mut agg = aggregator();
        agg.aggregate_swaps(&swaps);
        let summary = agg.summary();
        assert_eq!(summary.total_volume_usd, 400.0);
        assert_eq!(summary.total_transactions, 3);
        assert_eq!(summary.total_pairs, 2);
        assert_eq!(summary.avg_volume_per_pair, 200.0);
        assert_eq!(summary.avg_txs_per_pair, 1.5);
    }

    #[test]
    fn test_zero_notional_uses_fallback_pricing() {
        let swaps = vec![swap("tx1", "EURC", "EURCV", 100.0, -95.0, 0.0)];
        let mut agg = aggregator();
        let pairs = agg.aggregate_swaps(&swaps);
        let stats = &pairs["EURC-EURCV"];
        assert!((stats.volume_usd - 105.0).abs() < 1e-9);
        // The substituted volume also shows in the transaction reference.
        assert!((stats.transactions[0].amount_usd - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_token_volumes_derived_from_pairs() {
        let swaps = vec![
            swap("tx1", "AAVE", "LINK", 1.0, -1.0, 100.0),
            swap("tx2", "LINK", "WETH", 1.0, -1.0, 300.0),
        ];
        let mut agg = aggregator();
        agg.aggregate_swaps(&swaps);
        let tokens = agg.token_volumes();
        assert_eq!(tokens["LINK"].volume_usd, 400.0);
        assert_eq!(tokens["LINK"].tx_count, 2);
        assert_eq!(tokens["LINK"].pairs, vec!["AAVE-LINK", "LINK-WETH"]);
        assert_eq!(tokens["AAVE"].volume_usd, 100.0);
        assert_eq!(tokens["WETH"].volume_usd, 300.0);
    }

    #[test]
    fn test_sorted_views() {
        let swaps = vec![
            swap("tx1", "AAVE", "LINK", 1.0, -1.0, 100.0),
            swap("tx2", "UNI", "WETH", 1.0, -1.0, 900.0),
            swap("tx3", "AAVE", "LINK", 1.0, -1.0, 100.0),
        ];
        let mut agg = aggregator();
        agg.aggregate_swaps(&swaps);

        let by_volume = agg.sorted_pairs(SortBy::Volume);
        assert_eq!(by_volume[0].0, "UNI-WETH");
        let by_count = agg.sorted_pairs(SortBy::TxCount);
        assert_eq!(by_count[0].0, "AAVE-LINK");

        let tokens_by_volume = agg.sorted_tokens(SortBy::Volume);
        assert_eq!(tokens_by_volume[0].1.volume_usd, 900.0);
    }

    #[test]
    fn test_transaction_references_are_bounded() {
        let swaps: Vec<Swap> = (0..5)
            .map(|i| swap(&format!("tx{}", i), "AAVE", "LINK", 1.0, -1.0, 10.0))
            .collect();
        let mut agg = aggregator().with_transaction_limit(3);
        let pairs = agg.aggregate_swaps(&swaps);
        let stats = &pairs["AAVE-LINK"];
        // Counting keeps going after the reference list is full.
        assert_eq!(stats.tx_count, 5);
        assert_eq!(stats.transactions.len(), 3);
        assert_eq!(stats.volume_usd, 50.0);
    }

    #[test]
    fn test_rebuilt_from_scratch_each_call() {
        let mut agg = aggregator();
        agg.aggregate_swaps(&[swap("tx1", "AAVE", "LINK", 1.0, -1.0, 100.0)]);
        let pairs = agg.aggregate_swaps(&[swap("tx2", "UNI", "WETH", 1.0, -1.0, 50.0)]);
        assert_eq!(pairs.len(), 1);
        assert!(pairs.contains_key("UNI-WETH"));
    }
}
