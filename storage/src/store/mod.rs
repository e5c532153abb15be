pub mod sqlite_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market::{Depth, Trade};

use crate::{FeatureRecord, PriceRecord, StoreError};

/// Typed persistence operations used by the pipeline.
///
/// Trade, depth and price scans include both endpoints. Feature scans
/// exclude both.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn store_trade(&self, trade: &Trade) -> Result<(), StoreError>;
    async fn store_depth(&self, depth: &Depth) -> Result<(), StoreError>;
    async fn store_features(&self, record: &FeatureRecord) -> Result<(), StoreError>;
    async fn store_price(&self, record: &PriceRecord) -> Result<(), StoreError>;

    async fn get_trades(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Trade>, StoreError>;

    async fn get_depths(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Depth>, StoreError>;

    async fn get_features_in_range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FeatureRecord>, StoreError>;

    async fn get_prices(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceRecord>, StoreError>;

    async fn close(&self);
}
