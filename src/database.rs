// src/database.rs
//
// PostgreSQL sink for normalized swaps. Append-only: inserts are idempotent
// per swap id (conflict -> no-op), reads are windowed by timestamp with an
// optional leg address filter, ascending order.

use crate::fetcher::SwapSink;
use crate::settings::DatabaseSettings;
use crate::types::Swap;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, Row};
use std::env;
use std::time::Duration;

/// PostgreSQL connection pool type alias.
pub type DbPool = Pool<Postgres>;

/// Database schema name.
pub const SCHEMA: &str = "swap_routing";

const SWAP_COLUMNS: &str = "id, timestamp, tx_hash, token0_address, token1_address, \
     token0_symbol, token1_symbol, amount0, amount1, amount_usd, fee_tier";

/// Connects to PostgreSQL and bootstraps the schema.
///
/// Retries with capped exponential backoff to survive DNS/startup races in
/// Compose-style deployments. The URL comes from settings or DATABASE_URL.
pub async fn connect(settings: &DatabaseSettings) -> Result<DbPool> {
    let database_url = settings
        .url
        .clone()
        .or_else(|| env::var("DATABASE_URL").ok())
        .ok_or_else(|| anyhow!("database.url is not configured and DATABASE_URL is not set"))?;

    let mut last_err: Option<anyhow::Error> = None;
    let max_attempts = settings.connect_attempts.max(1);
    for attempt in 1..=max_attempts {
        match PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&database_url)
            .await
        {
            Ok(pool) => match initialize_schema(&pool).await {
                Ok(()) => {
                    log::info!(
                        "Connected to database (attempt {}/{}), schema ready.",
                        attempt,
                        max_attempts
                    );
                    return Ok(pool);
                }
                Err(e) => last_err = Some(e),
            },
            Err(e) => last_err = Some(e.into()),
        }

        let delay_ms = (1u64 << attempt.min(6)) * 200; // 400ms, 800ms, ... capped at ~12.8s
        log::warn!(
            "DB connect/init attempt {}/{} failed. Retrying in {} ms...",
            attempt,
            max_attempts,
            delay_ms
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
    Err(last_err.unwrap_or_else(|| anyhow!("unknown DB connection error")))
}

/// Idempotent schema bootstrap: schema, swaps table, timestamp index.
pub async fn initialize_schema(pool: &DbPool) -> Result<()> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", SCHEMA))
        .execute(pool)
        .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {}.uniswap_v3_swaps (
            id TEXT PRIMARY KEY,
            timestamp TIMESTAMPTZ NOT NULL,
            tx_hash TEXT NOT NULL,
            token0_address VARCHAR(66) NOT NULL,
            token1_address VARCHAR(66) NOT NULL,
            token0_symbol VARCHAR(32) NOT NULL,
            token1_symbol VARCHAR(32) NOT NULL,
            amount0 DOUBLE PRECISION NOT NULL,
            amount1 DOUBLE PRECISION NOT NULL,
            amount_usd DOUBLE PRECISION NOT NULL,
            fee_tier VARCHAR(16)
        )",
        SCHEMA
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_swaps_timestamp ON {}.uniswap_v3_swaps (timestamp)",
        SCHEMA
    ))
    .execute(pool)
    .await?;

    Ok(())
}

fn to_datetime(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Inserts a batch of swaps, skipping ids already present. Returns the
/// number of rows actually written; duplicates are not an error.
pub async fn insert_swaps(pool: &DbPool, swaps: &[Swap]) -> Result<u64> {
    if swaps.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0u64;
    let query = format!(
        "INSERT INTO {}.uniswap_v3_swaps ({})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT (id) DO NOTHING",
        SCHEMA, SWAP_COLUMNS
    );
    for swap in swaps {
        let result = sqlx::query(&query)
            .bind(&swap.id)
            .bind(to_datetime(swap.timestamp))
            .bind(&swap.tx_hash)
            .bind(&swap.token0_address)
            .bind(&swap.token1_address)
            .bind(&swap.token0_symbol)
            .bind(&swap.token1_symbol)
            .bind(swap.amount0)
            .bind(swap.amount1)
            .bind(swap.amount_usd)
            .bind(&swap.fee_tier)
            .execute(pool)
            .await?;
        inserted += result.rows_affected();
    }

    log::debug!("Inserted {}/{} swaps (rest were duplicates)", inserted, swaps.len());
    Ok(inserted)
}

/// Loads swaps with `timestamp BETWEEN start AND end` (epoch seconds,
/// inclusive), optionally requiring either leg's address to be in
/// `address_filter`, ordered ascending by timestamp.
pub async fn load_swaps(
    pool: &DbPool,
    start: i64,
    end: i64,
    address_filter: Option<&[String]>,
) -> Result<Vec<Swap>> {
    let mut query = format!(
        "SELECT {} FROM {}.uniswap_v3_swaps WHERE timestamp >= $1 AND timestamp <= $2",
        SWAP_COLUMNS, SCHEMA
    );
    if address_filter.is_some() {
        query.push_str(" AND (token0_address = ANY($3) OR token1_address = ANY($3))");
    }
    query.push_str(" ORDER BY timestamp ASC");

    let mut q = sqlx::query(&query)
        .bind(to_datetime(start))
        .bind(to_datetime(end));
    if let Some(addresses) = address_filter {
        q = q.bind(addresses);
    }

    let rows = q.fetch_all(pool).await?;
    let mut swaps = Vec::with_capacity(rows.len());
    for row in rows {
        swaps.push(Swap {
            id: row.try_get("id")?,
            timestamp: row.try_get::<DateTime<Utc>, _>("timestamp")?.timestamp(),
            tx_hash: row.try_get("tx_hash")?,
            token0_address: row.try_get("token0_address")?,
            token1_address: row.try_get("token1_address")?,
            token0_symbol: row.try_get("token0_symbol")?,
            token1_symbol: row.try_get("token1_symbol")?,
            amount0: row.try_get("amount0")?,
            amount1: row.try_get("amount1")?,
            amount_usd: row.try_get("amount_usd")?,
            fee_tier: row.try_get::<Option<String>, _>("fee_tier")?.unwrap_or_default(),
        });
    }

    log::info!("Loaded {} swaps from sink for window [{}, {}]", swaps.len(), start, end);
    Ok(swaps)
}

/// Timestamp of the newest stored swap, or `None` when the table is empty.
/// Drives incremental sync resumption.
pub async fn last_swap_timestamp(pool: &DbPool) -> Result<Option<i64>> {
    let row = sqlx::query(&format!(
        "SELECT MAX(timestamp) AS last_ts FROM {}.uniswap_v3_swaps",
        SCHEMA
    ))
    .fetch_one(pool)
    .await?;
    let last: Option<DateTime<Utc>> = row.try_get("last_ts")?;
    Ok(last.map(|dt| dt.timestamp()))
}

/// Postgres-backed batch sink for the fetch engine.
pub struct SwapStore {
    pool: DbPool,
}

impl SwapStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl SwapSink for SwapStore {
    async fn store_batch(&self, swaps: &[Swap]) -> Result<()> {
        insert_swaps(&self.pool, swaps).await.map(|_| ())
    }
}
