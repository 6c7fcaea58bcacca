//! # Swap Routing SDK
//!
//! A Rust library for exhaustive ingestion of Uniswap V3 swap events and
//! reconstruction of multi-hop trading routes between two tokens.
//!
//! ## Overview
//!
//! The SDK covers the full path from the upstream data source to route
//! statistics:
//!
//! - **Fetch**: cursor-paginated, exhaustive retrieval of swap events for a
//!   time window from The Graph's Uniswap V3 subgraph, with bounded retries
//!   and a guaranteed-terminating pagination cursor.
//! - **Normalize**: total coercion of loosely typed upstream records into a
//!   canonical [`Swap`](types::Swap) with an explicit symbol fallback chain.
//! - **Persist**: idempotent, append-only PostgreSQL sink keyed by swap id,
//!   read back by timestamp window.
//! - **Analyze**: per-transaction route reconstruction from signed amounts
//!   (positive leg = input, negative leg = output) plus per-pair and
//!   per-token volume aggregation.
//!
//! ## Architecture
//!
//! Fetching runs the leg-0 and leg-1 filter passes concurrently and joins
//! them with a pure id-unique merge. Analysis is stateless: every request
//! re-reads the sink and rebuilds its aggregates from scratch.

// Core types
/// Canonical swap record and raw subgraph payloads
pub mod types;
/// Tracked-token registry and symbol resolution
pub mod tokens;
/// Fetch pipeline error taxonomy
pub mod errors;

// Fetch pipeline
/// Upstream paged query interface and GraphQL client
pub mod subgraph;
/// Exhaustive windowed fetch engine
pub mod fetcher;
/// Raw record -> canonical swap coercion
pub mod normalization;
/// Merge of the two filtered passes (unique by id, timestamp order)
pub mod dedup;

// Analysis
/// Multi-hop route reconstruction and per-path aggregation
pub mod route_analyzer;
/// Per-pair and per-token volume aggregation
pub mod aggregator;
/// Static reference-price fallback for unpriced pools
pub mod pricing;

// Infrastructure
/// PostgreSQL sink (idempotent insert, windowed read-back)
pub mod database;
/// Incremental fetch-and-store pass
pub mod data_pipeline;
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use aggregator::SwapAggregator;
pub use data_pipeline::SwapIngestPipeline;
pub use errors::FetchError;
pub use fetcher::{SwapFetcher, SwapSink};
pub use pricing::FallbackPrices;
pub use route_analyzer::RouteAnalyzer;
pub use settings::Settings;
pub use subgraph::{SubgraphClient, SwapPageSource};
pub use tokens::TokenRegistry;
pub use types::Swap;
