// src/settings.rs
//
// Configuration for the swap routing SDK. Loaded from an optional
// Config.toml with environment variable overrides; every field has a
// default so the crate works out of the box against Ethereum mainnet.

use crate::pricing::DEFAULT_FALLBACK_PRICES;
use crate::tokens::TokenConfig;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct SubgraphSettings {
    /// The Graph gateway base URL.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Uniswap V3 mainnet subgraph deployment id.
    #[serde(default = "default_subgraph_id")]
    pub subgraph_id: String,
    /// Gateway API key. Overridable via GRAPH_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,
    /// The Graph caps `first:` at 1000; this is also the short-page
    /// termination threshold.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff between transport retries.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

fn default_gateway_url() -> String {
    "https://gateway.thegraph.com/api".to_string()
}
fn default_subgraph_id() -> String {
    "5zvR82QoaXYFyDEKLZ9t6v9adgnptxYpKpSbxtgVENFV".to_string()
}
fn default_page_size() -> usize {
    1000
}
fn default_request_timeout_seconds() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    1000
}

impl Default for SubgraphSettings {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            subgraph_id: default_subgraph_id(),
            api_key: None,
            page_size: default_page_size(),
            request_timeout_seconds: default_request_timeout_seconds(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl SubgraphSettings {
    /// Full query endpoint. Without an API key the gateway rejects most
    /// traffic, so the missing key is warned about at load time.
    pub fn endpoint(&self) -> String {
        let key = self.api_key.as_deref().unwrap_or("[api-key]");
        format!(
            "{}/{}/subgraphs/id/{}",
            self.gateway_url.trim_end_matches('/'),
            key,
            self.subgraph_id
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Postgres connection string. Overridable via DATABASE_URL.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
}

fn default_max_connections() -> u32 {
    5
}
fn default_connect_attempts() -> u32 {
    10
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            connect_attempts: default_connect_attempts(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncSettings {
    /// Window to backfill when the sink is empty.
    #[serde(default = "default_backfill_days")]
    pub backfill_days: i64,
}

fn default_backfill_days() -> i64 {
    90
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            backfill_days: default_backfill_days(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisSettings {
    /// Static reference prices injected into the analyzer and aggregator.
    #[serde(default = "default_fallback_prices")]
    pub fallback_prices: HashMap<String, f64>,
    /// Cap on per-pair contributing transaction references.
    #[serde(default = "default_max_pair_transactions")]
    pub max_pair_transactions: usize,
}

fn default_fallback_prices() -> HashMap<String, f64> {
    DEFAULT_FALLBACK_PRICES.clone()
}
fn default_max_pair_transactions() -> usize {
    100
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            fallback_prices: default_fallback_prices(),
            max_pair_transactions: default_max_pair_transactions(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub subgraph: SubgraphSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    /// Tracked token table (Ethereum mainnet by default).
    #[serde(default = "default_tokens")]
    pub tokens: Vec<TokenConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            subgraph: SubgraphSettings::default(),
            database: DatabaseSettings::default(),
            sync: SyncSettings::default(),
            analysis: AnalysisSettings::default(),
            tokens: default_tokens(),
        }
    }
}

fn token(symbol: &str, address: &str, decimals: u8) -> TokenConfig {
    TokenConfig {
        symbol: symbol.to_string(),
        address: address.to_string(),
        decimals,
    }
}

fn default_tokens() -> Vec<TokenConfig> {
    vec![
        token("AAVE", "0x7fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9", 18),
        token("LINK", "0x514910771AF9CA656af84075aa92A706CE62ac07", 18),
        token("UNI", "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984", 18),
        token("PAXG", "0x45804880de22913dafe09f4980848ece6ecbaf78", 18),
        token("USDC", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6),
        token("USDT", "0xdAC17F958D2ee523a2206206994597C13D831ec7", 6),
        token("WETH", "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", 18),
        token("EURC", "0x1abaea1f7c830bd89acc67ec4af516284b1bc33c", 6),
        token("EURCV", "0x5F7827FDeb7c20b443265Fc2F40845B715385Ff2", 18),
        token("WBTC", "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599", 8),
    ]
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let source = Config::builder()
            .add_source(File::with_name("Config").required(false))
            .build()?;

        let mut settings: Self = source.try_deserialize()?;

        if let Ok(url) = env::var("SWAP_SDK_SUBGRAPH_URL") {
            if !url.trim().is_empty() {
                settings.subgraph.gateway_url = url.trim().to_string();
            }
        }
        if let Ok(key) = env::var("GRAPH_API_KEY") {
            if !key.trim().is_empty() {
                settings.subgraph.api_key = Some(key.trim().to_string());
            }
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                settings.database.url = Some(url.trim().to_string());
            }
        }

        if settings.subgraph.api_key.is_none() {
            log::warn!(
                "No GRAPH_API_KEY configured; subgraph queries against {} will likely be rejected",
                settings.subgraph.gateway_url
            );
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_track_mainnet_tokens() {
        let settings = Settings::default();
        assert_eq!(settings.tokens.len(), 10);
        assert!(settings.tokens.iter().any(|t| t.symbol == "WETH"));
        assert_eq!(settings.subgraph.page_size, 1000);
        assert_eq!(settings.sync.backfill_days, 90);
    }

    #[test]
    fn test_endpoint_includes_api_key() {
        let mut subgraph = SubgraphSettings::default();
        subgraph.api_key = Some("abc123".to_string());
        assert_eq!(
            subgraph.endpoint(),
            format!(
                "https://gateway.thegraph.com/api/abc123/subgraphs/id/{}",
                subgraph.subgraph_id
            )
        );
    }

    #[test]
    fn test_endpoint_placeholder_without_key() {
        let subgraph = SubgraphSettings::default();
        assert!(subgraph.endpoint().contains("/[api-key]/"));
    }

    #[test]
    fn test_default_fallback_prices_cover_stables() {
        let analysis = AnalysisSettings::default();
        assert_eq!(analysis.fallback_prices.get("USDC"), Some(&1.0));
        assert_eq!(analysis.fallback_prices.get("EURCV"), Some(&1.05));
    }
}
