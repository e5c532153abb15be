//! SQLite-backed time-series store.
//!
//! Each bucket is a `WITHOUT ROWID` table keyed by the text key, so the
//! primary-key B-tree is the ordered index that range scans walk. Tables
//! are created lazily inside the first write transaction that needs them.
//!
//! Writes go through a single-connection pool, which serialises write
//! transactions inside the process. Reads use a separate pool so scans
//! never queue behind the writer.
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market::{Depth, Trade};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tracing::{debug, info, instrument, warn};

use super::RecordStore;
use crate::bucket::{bound_key, decode_ts, encode_key, key_prefix};
use crate::{Bucket, FeatureRecord, FiniteFields, PriceRecord, StoreError};

pub const DB_FILE_NAME: &str = "market-data.db";

const BUSY_TIMEOUT: Duration = Duration::from_secs(1);
const READER_CONNECTIONS: u32 = 4;

#[derive(Debug, Clone)]
pub struct SqliteTimeSeriesStore {
    writer: SqlitePool,
    reader: SqlitePool,
    path: PathBuf,
}

impl SqliteTimeSeriesStore {
    /// Opens (creating if needed) `<dir>/market-data.db`. The directory
    /// itself must already exist.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(StoreError::InvalidDataDir {
                path: dir.to_path_buf(),
                reason: "not an existing directory".into(),
            });
        }

        let path = dir.join(DB_FILE_NAME);
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .busy_timeout(BUSY_TIMEOUT);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                options
                    .clone()
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal),
            )
            .await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options)
            .await?;

        info!(path = %path.display(), "time-series store opened");
        Ok(Self {
            writer,
            reader,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `record` under `symbol`/`ts` in one transaction, replacing any
    /// record already stored under the same key.
    ///
    /// A record with a NaN or infinite field is refused before the
    /// transaction opens.
    #[instrument(level = "debug", skip_all, fields(bucket = %bucket, symbol = %symbol))]
    pub async fn put<T>(
        &self,
        bucket: Bucket,
        symbol: &str,
        ts: DateTime<Utc>,
        record: &T,
    ) -> Result<(), StoreError>
    where
        T: Serialize + FiniteFields + Sync + ?Sized,
    {
        if let Some(field) = record.non_finite_field() {
            return Err(StoreError::NonFinite { field });
        }
        let key = encode_key(symbol, ts)?;
        let value = serde_json::to_vec(record)?;

        let mut tx = self.writer.begin().await?;
        sqlx::query(&create_table_sql(bucket))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "INSERT OR REPLACE INTO {bucket} (key, value) VALUES (?, ?)"
        ))
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Records for `symbol` with `start <= ts <= end`, oldest first.
    ///
    /// A bucket that was never written yields an empty result. Rows that do
    /// not decode are skipped.
    pub async fn range_scan<T>(
        &self,
        bucket: Bucket,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        if !self.bucket_exists(bucket).await? {
            return Ok(Vec::new());
        }

        let prefix = key_prefix(symbol);
        let rows: Vec<(String, Vec<u8>)> = sqlx::query_as(&format!(
            "SELECT key, value FROM {bucket} WHERE key >= ? AND key <= ? ORDER BY key"
        ))
        .bind(bound_key(symbol, start))
        .bind(bound_key(symbol, end))
        .fetch_all(&self.reader)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for (key, value) in rows {
            if decode_ts(&key, &prefix).is_none() {
                debug!(bucket = %bucket, key = %key, "skipping foreign key");
                continue;
            }
            match serde_json::from_slice::<T>(&value) {
                Ok(record) => out.push(record),
                Err(e) => warn!(bucket = %bucket, key = %key, error = %e, "skipping malformed record"),
            }
        }
        Ok(out)
    }

    /// Number of stored records; 0 for a bucket never written.
    pub async fn bucket_len(&self, bucket: Bucket) -> Result<u64, StoreError> {
        if !self.bucket_exists(bucket).await? {
            return Ok(0);
        }
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {bucket}"))
            .fetch_one(&self.reader)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn bucket_exists(&self, bucket: Bucket) -> Result<bool, StoreError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(bucket.as_str())
                .fetch_one(&self.reader)
                .await?;
        Ok(count > 0)
    }
}

fn create_table_sql(bucket: Bucket) -> String {
    format!("CREATE TABLE IF NOT EXISTS {bucket} (key TEXT PRIMARY KEY NOT NULL, value BLOB NOT NULL) WITHOUT ROWID")
}

#[async_trait]
impl RecordStore for SqliteTimeSeriesStore {
    async fn store_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        self.put(Bucket::Trades, &trade.symbol, trade.ts, trade).await
    }

    async fn store_depth(&self, depth: &Depth) -> Result<(), StoreError> {
        self.put(Bucket::Depths, &depth.symbol, depth.ts, depth).await
    }

    async fn store_features(&self, record: &FeatureRecord) -> Result<(), StoreError> {
        self.put(Bucket::Features, &record.symbol, record.timestamp, record)
            .await
    }

    async fn store_price(&self, record: &PriceRecord) -> Result<(), StoreError> {
        self.put(Bucket::Prices, &record.symbol, record.timestamp, record)
            .await
    }

    async fn get_trades(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Trade>, StoreError> {
        self.range_scan(Bucket::Trades, symbol, start, end).await
    }

    async fn get_depths(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Depth>, StoreError> {
        self.range_scan(Bucket::Depths, symbol, start, end).await
    }

    /// Strict on both ends, unlike the other scans.
    async fn get_features_in_range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FeatureRecord>, StoreError> {
        let records: Vec<FeatureRecord> =
            self.range_scan(Bucket::Features, symbol, start, end).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.timestamp > start && r.timestamp < end)
            .collect())
    }

    async fn get_prices(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        self.range_scan(Bucket::Prices, symbol, start, end).await
    }

    async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
        info!(path = %self.path.display(), "time-series store closed");
    }
}
