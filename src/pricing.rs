// src/pricing.rs
//
// Static reference prices used when the upstream USD notional is missing or
// effectively zero (common for new/low-liquidity pools). The table is an
// injected value, not a module constant, so tests and callers can swap it.

use crate::types::Swap;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Upstream notionals below this are treated as missing pricing.
pub const MIN_NOTIONAL_USD: f64 = 0.01;

/// Rough reference prices for stable and major assets. Intentionally coarse:
/// these only back-fill volume estimates for pools the subgraph prices at
/// zero.
pub static DEFAULT_FALLBACK_PRICES: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    HashMap::from([
        ("USDC".to_string(), 1.0),
        ("USDT".to_string(), 1.0),
        ("DAI".to_string(), 1.0),
        ("EURC".to_string(), 1.05),
        ("EURCV".to_string(), 1.05),
        ("WETH".to_string(), 2500.0),
        ("WBTC".to_string(), 95000.0),
    ])
});

/// Injected fallback price table shared by the route analyzer and the pair
/// aggregator, so both apply the identical substitution.
#[derive(Debug, Clone)]
pub struct FallbackPrices {
    prices: HashMap<String, f64>,
}

impl Default for FallbackPrices {
    fn default() -> Self {
        Self {
            prices: DEFAULT_FALLBACK_PRICES.clone(),
        }
    }
}

impl FallbackPrices {
    pub fn new(prices: HashMap<String, f64>) -> Self {
        Self { prices }
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    /// Approximates a swap's USD volume as `abs(amount) * reference price`
    /// for whichever leg has a known reference price, leg 0 first. Returns
    /// `None` when neither leg is priced.
    pub fn approximate_volume(&self, swap: &Swap) -> Option<f64> {
        if let Some(price) = self.get(&swap.token0_symbol) {
            Some(swap.amount0.abs() * price)
        } else if let Some(price) = self.get(&swap.token1_symbol) {
            Some(swap.amount1.abs() * price)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap(t0: &str, t1: &str, a0: f64, a1: f64) -> Swap {
        Swap {
            id: "tx1#1".to_string(),
            timestamp: 0,
            tx_hash: "tx1".to_string(),
            token0_address: String::new(),
            token1_address: String::new(),
            token0_symbol: t0.to_string(),
            token1_symbol: t1.to_string(),
            amount0: a0,
            amount1: a1,
            amount_usd: 0.0,
            fee_tier: String::new(),
        }
    }

    #[test]
    fn test_leg0_price_preferred() {
        let prices = FallbackPrices::default();
        let volume = prices.approximate_volume(&swap("USDC", "WETH", 100.0, -0.04));
        assert_eq!(volume, Some(100.0));
    }

    #[test]
    fn test_leg1_price_used_when_leg0_unpriced() {
        let prices = FallbackPrices::default();
        let volume = prices.approximate_volume(&swap("FOO", "USDT", -3.0, 250.0));
        assert_eq!(volume, Some(250.0));
    }

    #[test]
    fn test_unpriced_pair_yields_none() {
        let prices = FallbackPrices::default();
        assert_eq!(prices.approximate_volume(&swap("FOO", "BAR", 1.0, -1.0)), None);
    }

    #[test]
    fn test_injected_table_overrides_default() {
        let prices = FallbackPrices::new(HashMap::from([("FOO".to_string(), 2.0)]));
        let volume = prices.approximate_volume(&swap("FOO", "USDC", -4.0, 8.0));
        assert_eq!(volume, Some(8.0));
    }
}
