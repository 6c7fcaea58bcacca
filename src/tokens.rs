// src/tokens.rs
//
// Tracked-token registry: the static token table plus the address -> symbol
// resolution chain used by the normalizer.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Sentinel symbol for tokens that resolve neither via the registry nor via
/// an upstream-reported symbol.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// A tracked token loaded from static configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
}

/// Case-insensitive lookup over the tracked token table.
///
/// Addresses are lowercased on construction, so lookups are total regardless
/// of the checksum casing the upstream source reports.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    address_to_symbol: HashMap<String, String>,
    symbol_to_address: HashMap<String, String>,
}

impl TokenRegistry {
    pub fn new(tokens: &[TokenConfig]) -> Self {
        let mut address_to_symbol = HashMap::with_capacity(tokens.len());
        let mut symbol_to_address = HashMap::with_capacity(tokens.len());
        for token in tokens {
            let address = token.address.to_lowercase();
            let symbol = token.symbol.to_uppercase();
            address_to_symbol.insert(address.clone(), symbol.clone());
            symbol_to_address.insert(symbol, address);
        }
        Self {
            address_to_symbol,
            symbol_to_address,
        }
    }

    /// Resolves an address to a symbol. The fallback chain is explicit and
    /// ordered: registry table -> upstream-reported symbol -> `"UNKNOWN"`.
    pub fn resolve_symbol(&self, address: &str, upstream: Option<&str>) -> String {
        if let Some(symbol) = self.address_to_symbol.get(&address.to_lowercase()) {
            return symbol.clone();
        }
        match upstream {
            Some(symbol) if !symbol.is_empty() => symbol.to_string(),
            _ => UNKNOWN_SYMBOL.to_string(),
        }
    }

    /// Lowercase address for a tracked symbol, if present.
    pub fn address_of(&self, symbol: &str) -> Option<&str> {
        self.symbol_to_address
            .get(&symbol.to_uppercase())
            .map(String::as_str)
    }

    /// All tracked addresses, lowercased, for upstream filter clauses.
    pub fn addresses(&self) -> Vec<String> {
        self.address_to_symbol.keys().cloned().collect()
    }

    /// Addresses for a subset of tracked symbols. Fails fast on a symbol the
    /// registry does not track, rather than silently narrowing the filter.
    pub fn addresses_for(&self, symbols: &[String]) -> Result<Vec<String>> {
        symbols
            .iter()
            .map(|symbol| {
                self.address_of(symbol)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("token symbol '{}' is not in the tracked token table", symbol))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.address_to_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.address_to_symbol.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TokenRegistry {
        TokenRegistry::new(&[
            TokenConfig {
                symbol: "WETH".to_string(),
                address: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".to_string(),
                decimals: 18,
            },
            TokenConfig {
                symbol: "USDC".to_string(),
                address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string(),
                decimals: 6,
            },
        ])
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = registry();
        assert_eq!(
            registry.resolve_symbol("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", None),
            "WETH"
        );
        assert_eq!(
            registry.resolve_symbol("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", None),
            "WETH"
        );
    }

    #[test]
    fn test_fallback_chain() {
        let registry = registry();
        // Unknown address, upstream symbol present: use upstream.
        assert_eq!(registry.resolve_symbol("0xdead", Some("FOO")), "FOO");
        // Unknown address, empty upstream symbol: sentinel.
        assert_eq!(registry.resolve_symbol("0xdead", Some("")), UNKNOWN_SYMBOL);
        // Unknown address, no upstream symbol: sentinel.
        assert_eq!(registry.resolve_symbol("0xdead", None), UNKNOWN_SYMBOL);
        // Registry hit wins over upstream.
        assert_eq!(
            registry.resolve_symbol("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", Some("USD-C")),
            "USDC"
        );
    }

    #[test]
    fn test_addresses_for_unknown_symbol_fails() {
        let registry = registry();
        let err = registry
            .addresses_for(&["WETH".to_string(), "NOPE".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn test_addresses_for_returns_lowercase() {
        let registry = registry();
        let addresses = registry.addresses_for(&["weth".to_string()]).unwrap();
        assert_eq!(
            addresses,
            vec!["0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".to_string()]
        );
    }
}
