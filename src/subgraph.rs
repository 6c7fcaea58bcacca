// src/subgraph.rs
//
// Upstream paged query interface and its production implementation against
// The Graph's Uniswap V3 subgraph. The `SwapPageSource` trait is the seam
// the fetch engine paginates over; tests script it, production posts
// GraphQL over HTTP with bounded exponential-backoff retries.

use crate::errors::FetchError;
use crate::settings::SubgraphSettings;
use crate::types::RawSwap;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Which leg of the pool the address filter applies to. A single upstream
/// query cannot express "token appears in either leg", so a full window is
/// fetched once per variant and merged downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegFilter {
    Leg0,
    Leg1,
}

impl LegFilter {
    /// Subgraph `where` field for this filter.
    pub fn field(&self) -> &'static str {
        match self {
            LegFilter::Leg0 => "token0_in",
            LegFilter::Leg1 => "token1_in",
        }
    }
}

/// One page request: ascending-timestamp window query with a leg filter.
#[derive(Debug, Clone)]
pub struct PageRequest<'a> {
    /// Inclusive lower bound (the pagination cursor).
    pub cursor: i64,
    /// Inclusive upper bound of the window.
    pub end: i64,
    pub filter: LegFilter,
    /// Lowercase token addresses the filtered leg must be in.
    pub addresses: &'a [String],
    pub page_size: usize,
    /// Optional caller deadline; checked before every retry sleep.
    pub deadline: Option<Instant>,
}

/// Upstream paged data source for raw swap records.
#[async_trait]
pub trait SwapPageSource: Send + Sync {
    /// Fetches one page, at most `page_size` records ordered ascending by
    /// timestamp. Transport failures are retried internally; exhaustion
    /// surfaces as [`FetchError::Transport`]. An in-band upstream error
    /// payload surfaces as [`FetchError::UpstreamQuery`].
    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Vec<RawSwap>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct GraphResponse {
    data: Option<GraphData>,
    errors: Option<Vec<GraphErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphData {
    #[serde(default)]
    swaps: Vec<RawSwap>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorEntry {
    message: String,
}

/// GraphQL client for the Uniswap V3 subgraph.
pub struct SubgraphClient {
    http: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl SubgraphClient {
    pub fn new(settings: &SubgraphSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            endpoint: settings.endpoint(),
            max_retries: settings.max_retries.max(1),
            backoff_base: Duration::from_millis(settings.backoff_base_ms),
        })
    }

    fn build_query(request: &PageRequest<'_>) -> String {
        let addr_list =
            serde_json::to_string(request.addresses).unwrap_or_else(|_| "[]".to_string());
        format!(
            r#"{{
  swaps(
    first: {page_size}
    orderBy: timestamp
    orderDirection: asc
    where: {{
      timestamp_gte: {cursor}
      timestamp_lte: {end}
      {field}: {addr_list}
    }}
  ) {{
    id
    timestamp
    transaction {{ id }}
    token0 {{ id symbol }}
    token1 {{ id symbol }}
    amount0
    amount1
    amountUSD
    pool {{ feeTier }}
  }}
}}"#,
            page_size = request.page_size,
            cursor = request.cursor,
            end = request.end,
            field = request.filter.field(),
        )
    }

    async fn execute(&self, body: &serde_json::Value) -> Result<GraphResponse, reqwest::Error> {
        self.http
            .post(&self.endpoint)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json::<GraphResponse>()
            .await
    }
}

#[async_trait]
impl SwapPageSource for SubgraphClient {
    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Vec<RawSwap>, FetchError> {
        let query = Self::build_query(request);
        let body = serde_json::json!({ "query": query });

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.execute(&body).await {
                Ok(response) => {
                    if let Some(errors) = response.errors {
                        let joined = errors
                            .iter()
                            .map(|e| e.message.as_str())
                            .collect::<Vec<_>>()
                            .join("; ");
                        return Err(FetchError::UpstreamQuery(joined));
                    }
                    let swaps = response.data.map(|d| d.swaps).unwrap_or_default();
                    debug!(
                        filter = request.filter.field(),
                        cursor = request.cursor,
                        count = swaps.len(),
                        "fetched subgraph page"
                    );
                    return Ok(swaps);
                }
                Err(e) => {
                    warn!(
                        "subgraph request failed (attempt {}/{}): {}",
                        attempt, self.max_retries, e
                    );
                    if attempt >= self.max_retries {
                        return Err(FetchError::Transport {
                            attempts: attempt,
                            source: e.into(),
                        });
                    }
                    // Base delay doubling per attempt.
                    let delay = self.backoff_base * 2u32.pow(attempt - 1);
                    if let Some(deadline) = request.deadline {
                        if Instant::now() + delay >= deadline {
                            return Err(FetchError::DeadlineExceeded("retry"));
                        }
                    }
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_shape() {
        let addresses = vec!["0xaaa".to_string(), "0xbbb".to_string()];
        let request = PageRequest {
            cursor: 100,
            end: 200,
            filter: LegFilter::Leg0,
            addresses: &addresses,
            page_size: 1000,
            deadline: None,
        };
        let query = SubgraphClient::build_query(&request);
        assert!(query.contains("first: 1000"));
        assert!(query.contains("timestamp_gte: 100"));
        assert!(query.contains("timestamp_lte: 200"));
        assert!(query.contains(r#"token0_in: ["0xaaa","0xbbb"]"#));
        assert!(query.contains("orderDirection: asc"));
        assert!(query.contains("pool { feeTier }"));
    }

    #[test]
    fn test_leg_filter_fields() {
        assert_eq!(LegFilter::Leg0.field(), "token0_in");
        assert_eq!(LegFilter::Leg1.field(), "token1_in");
    }

    #[test]
    fn test_graph_response_with_errors_decodes() {
        let payload = r#"{"errors":[{"message":"rate limited"}]}"#;
        let response: GraphResponse = serde_json::from_str(payload).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors.unwrap()[0].message, "rate limited");
    }

    #[test]
    fn test_graph_response_decodes_swaps() {
        let payload = r#"{"data":{"swaps":[{"id":"0xtx#1","timestamp":"1700000000",
            "transaction":{"id":"0xtx"},
            "token0":{"id":"0xAAA","symbol":"FOO"},
            "token1":{"id":"0xBBB","symbol":"BAR"},
            "amount0":"1.0","amount1":"-2.0","amountUSD":"3.0",
            "pool":{"feeTier":"3000"}}]}}"#;
        let response: GraphResponse = serde_json::from_str(payload).unwrap();
        let swaps = response.data.unwrap().swaps;
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].id.as_deref(), Some("0xtx#1"));
        assert_eq!(swaps[0].amount_usd.as_deref(), Some("3.0"));
    }
}
