// src/errors.rs
//
// Error taxonomy for the fetch pipeline. Data anomalies are never errors
// (the normalizer coerces them) and storage conflicts are silent no-ops, so
// the only failures that cross into callers are listed here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network/timeout failure that survived every retry. Fatal for the
    /// invocation that hit it.
    #[error("transport failure after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        source: anyhow::Error,
    },

    /// In-band error payload from the upstream query engine (malformed
    /// query, rate limit). Non-fatal: ends the current window's pagination.
    #[error("upstream query error: {0}")]
    UpstreamQuery(String),

    /// Caller-supplied deadline elapsed before the next page request or
    /// retry sleep.
    #[error("deadline exceeded before {0}")]
    DeadlineExceeded(&'static str),

    /// Caller-supplied filter references a symbol outside the tracked token
    /// table.
    #[error("invalid token filter: {0}")]
    InvalidFilter(String),

    /// The batch sink rejected a page of normalized swaps.
    #[error("storage sink failure: {0}")]
    Storage(anyhow::Error),
}
