// src/fetcher.rs
//
// Exhaustive windowed fetch engine. Paginates the upstream source with a
// timestamp cursor, runs the leg-0 and leg-1 filter passes concurrently,
// normalizes per page, and merges the two passes into one id-unique,
// timestamp-ordered result.

use crate::dedup::merge_filtered_sets;
use crate::errors::FetchError;
use crate::normalization::normalize_swap;
use crate::subgraph::{LegFilter, PageRequest, SwapPageSource};
use crate::tokens::TokenRegistry;
use crate::types::Swap;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Destination for normalized page batches, used for incremental
/// persistence while a long window is still being paginated. Implemented by
/// the Postgres store; inserts are idempotent by swap id, so replaying a
/// batch is harmless.
#[async_trait]
pub trait SwapSink: Send + Sync {
    async fn store_batch(&self, swaps: &[Swap]) -> Result<()>;
}

/// Windowed swap fetcher over any [`SwapPageSource`].
pub struct SwapFetcher<S: SwapPageSource> {
    source: Arc<S>,
    registry: Arc<TokenRegistry>,
    page_size: usize,
}

impl<S: SwapPageSource> SwapFetcher<S> {
    pub fn new(source: Arc<S>, registry: Arc<TokenRegistry>, page_size: usize) -> Self {
        Self {
            source,
            registry,
            page_size,
        }
    }

    /// Fetches the complete set of swaps in `[start, end]` (inclusive,
    /// second resolution) where either leg is a tracked token.
    ///
    /// `token_filter` narrows the tracked set to specific symbols; an
    /// unknown symbol fails fast. `deadline` aborts before the next page
    /// request or retry. Each normalized page batch is handed to `sink`
    /// as it arrives, before the merge.
    ///
    /// The two filter passes share no mutable state and are joined by a
    /// pure merge, so they run concurrently.
    pub async fn fetch_swaps(
        &self,
        start: i64,
        end: i64,
        token_filter: Option<&[String]>,
        deadline: Option<Instant>,
        sink: Option<&dyn SwapSink>,
    ) -> Result<Vec<Swap>, FetchError> {
        let addresses = match token_filter {
            Some(symbols) => self
                .registry
                .addresses_for(symbols)
                .map_err(|e| FetchError::InvalidFilter(e.to_string()))?,
            None => self.registry.addresses(),
        };

        info!(
            start,
            end,
            tracked = addresses.len(),
            "fetching swaps for window"
        );

        let (leg0, leg1) = tokio::try_join!(
            self.fetch_filtered(start, end, LegFilter::Leg0, &addresses, deadline, sink),
            self.fetch_filtered(start, end, LegFilter::Leg1, &addresses, deadline, sink),
        )?;

        let merged = merge_filtered_sets(leg0, leg1);
        info!(total = merged.len(), "fetch complete, merged unique swaps");
        Ok(merged)
    }

    /// One exhaustive pagination pass for a single leg filter.
    ///
    /// Termination: an empty page stops immediately; a short page is the
    /// last one (appended, then stop); otherwise the cursor advances to the
    /// last record's timestamp. When a full page shares one timestamp the
    /// cursor cannot advance, so it is bumped by one second: a lossy but
    /// guaranteed-terminating escape that may drop swaps packed into that
    /// boundary second.
    async fn fetch_filtered(
        &self,
        start: i64,
        end: i64,
        filter: LegFilter,
        addresses: &[String],
        deadline: Option<Instant>,
        sink: Option<&dyn SwapSink>,
    ) -> Result<Vec<Swap>, FetchError> {
        let mut found: Vec<Swap> = Vec::new();
        let mut cursor = start;

        loop {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(FetchError::DeadlineExceeded("page request"));
                }
            }

            let request = PageRequest {
                cursor,
                end,
                filter,
                addresses,
                page_size: self.page_size,
                deadline,
            };

            let raw_page = match self.source.fetch_page(&request).await {
                Ok(page) => page,
                Err(FetchError::UpstreamQuery(message)) => {
                    warn!(
                        filter = filter.field(),
                        "upstream query error, stopping window pagination: {}", message
                    );
                    break;
                }
                Err(other) => return Err(other),
            };

            if raw_page.is_empty() {
                break;
            }

            let page_len = raw_page.len();
            let batch: Vec<Swap> = raw_page
                .iter()
                .map(|raw| normalize_swap(raw, &self.registry))
                .collect();
            let last_timestamp = batch.last().map(|s| s.timestamp).unwrap_or(cursor);

            if let Some(sink) = sink {
                sink.store_batch(&batch)
                    .await
                    .map_err(FetchError::Storage)?;
            }

            found.extend(batch);
            debug!(
                filter = filter.field(),
                page = page_len,
                total = found.len(),
                last_timestamp,
                "fetched page"
            );

            if page_len < self.page_size {
                break;
            }

            cursor = if last_timestamp == cursor {
                cursor + 1
            } else {
                last_timestamp
            };
        }

        Ok(found)
    }
}
