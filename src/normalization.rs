// src/normalization.rs
//
// Pure, total mapping from a raw subgraph record to a canonical Swap.
// There is no validation failure mode: missing or null fields coerce to
// zero amounts or the UNKNOWN sentinel, never to an error.

use crate::tokens::TokenRegistry;
use crate::types::{RawSwap, Swap};

const UNKNOWN_ID: &str = "unknown";

fn to_f64(value: Option<&String>) -> f64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0.0)
}

fn to_i64(value: Option<&String>) -> i64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Fee tier string in percent, e.g. subgraph `"3000"` -> `"0.3%"`.
fn format_fee_tier(raw_fee_tier: Option<&String>) -> String {
    format!("{}%", to_f64(raw_fee_tier) / 10_000.0)
}

/// Converts one raw upstream record into one canonical [`Swap`].
///
/// Addresses are lowercased before lookup, and symbols resolve via the
/// registry's ordered fallback chain (table -> upstream -> UNKNOWN).
pub fn normalize_swap(raw: &RawSwap, registry: &TokenRegistry) -> Swap {
    let token0 = raw.token0.clone().unwrap_or_default();
    let token1 = raw.token1.clone().unwrap_or_default();

    let token0_address = token0.id.as_deref().unwrap_or_default().to_lowercase();
    let token1_address = token1.id.as_deref().unwrap_or_default().to_lowercase();

    Swap {
        id: raw.id.clone().unwrap_or_else(|| UNKNOWN_ID.to_string()),
        timestamp: to_i64(raw.timestamp.as_ref()),
        tx_hash: raw
            .transaction
            .as_ref()
            .and_then(|tx| tx.id.clone())
            .unwrap_or_else(|| UNKNOWN_ID.to_string()),
        token0_symbol: registry.resolve_symbol(&token0_address, token0.symbol.as_deref()),
        token1_symbol: registry.resolve_symbol(&token1_address, token1.symbol.as_deref()),
        token0_address,
        token1_address,
        amount0: to_f64(raw.amount0.as_ref()),
        amount1: to_f64(raw.amount1.as_ref()),
        amount_usd: to_f64(raw.amount_usd.as_ref()),
        fee_tier: format_fee_tier(raw.pool.as_ref().and_then(|p| p.fee_tier.as_ref())),
    }
}
