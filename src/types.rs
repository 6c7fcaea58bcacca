// src/types.rs
//
// Canonical swap record plus the raw subgraph payload it is decoded from.

use serde::{Deserialize, Serialize};

/// A single normalized Uniswap V3 swap event.
///
/// The id has the form `"<tx_hash>#<log_index>"` and is globally unique.
/// Amounts are signed from the pool's perspective: a positive amount is the
/// token the trader supplied to the pool, a negative amount is the token the
/// trader received. Instances are immutable once produced by the normalizer;
/// they are persisted insert-if-absent by id and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swap {
    pub id: String,
    /// Seconds since epoch. Upstream-monotonic but not unique.
    pub timestamp: i64,
    pub tx_hash: String,
    pub token0_address: String,
    pub token1_address: String,
    pub token0_symbol: String,
    pub token1_symbol: String,
    pub amount0: f64,
    pub amount1: f64,
    pub amount_usd: f64,
    pub fee_tier: String,
}

impl Swap {
    /// Intra-transaction sequence number, extracted from the id suffix after
    /// `#`. Defaults to 0 when the suffix is absent or malformed.
    pub fn log_index(&self) -> u64 {
        self.id
            .split('#')
            .nth(1)
            .and_then(|suffix| suffix.parse().ok())
            .unwrap_or(0)
    }
}

/// Raw swap record as returned by the subgraph.
///
/// Every field is optional: the upstream payload is loosely typed and the
/// normalizer coerces any shape of input into a [`Swap`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSwap {
    pub id: Option<String>,
    pub timestamp: Option<String>,
    pub transaction: Option<RawTransaction>,
    pub token0: Option<RawToken>,
    pub token1: Option<RawToken>,
    pub amount0: Option<String>,
    pub amount1: Option<String>,
    #[serde(rename = "amountUSD")]
    pub amount_usd: Option<String>,
    pub pool: Option<RawPool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransaction {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawToken {
    pub id: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPool {
    #[serde(rename = "feeTier")]
    pub fee_tier: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap_with_id(id: &str) -> Swap {
        Swap {
            id: id.to_string(),
            timestamp: 0,
            tx_hash: "tx".to_string(),
            token0_address: String::new(),
            token1_address: String::new(),
            token0_symbol: String::new(),
            token1_symbol: String::new(),
            amount0: 0.0,
            amount1: 0.0,
            amount_usd: 0.0,
            fee_tier: String::new(),
        }
    }

    #[test]
    fn test_log_index_extraction() {
        assert_eq!(swap_with_id("0xabc#42").log_index(), 42);
        assert_eq!(swap_with_id("0xabc#0").log_index(), 0);
    }

    #[test]
    fn test_log_index_defaults_to_zero() {
        assert_eq!(swap_with_id("0xabc").log_index(), 0);
        assert_eq!(swap_with_id("0xabc#").log_index(), 0);
        assert_eq!(swap_with_id("0xabc#notanumber").log_index(), 0);
    }
}
