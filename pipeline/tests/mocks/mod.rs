#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use market::{Depth, Trade};
use pipeline::decision::{DecisionSink, Observation};
use storage::{FeatureRecord, PriceRecord, RecordStore, StoreError};

/// In-memory RecordStore for pipeline tests.
#[derive(Default)]
pub struct InMemoryStore {
    pub trades: Mutex<Vec<Trade>>,
    pub depths: Mutex<Vec<Depth>>,
    pub features: Mutex<Vec<FeatureRecord>>,
    pub prices: Mutex<Vec<PriceRecord>>,
}

fn within(ts: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    ts >= start && ts <= end
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn store_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        self.trades.lock().push(trade.clone());
        Ok(())
    }

    async fn store_depth(&self, depth: &Depth) -> Result<(), StoreError> {
        self.depths.lock().push(depth.clone());
        Ok(())
    }

    async fn store_features(&self, record: &FeatureRecord) -> Result<(), StoreError> {
        self.features.lock().push(record.clone());
        Ok(())
    }

    async fn store_price(&self, record: &PriceRecord) -> Result<(), StoreError> {
        self.prices.lock().push(record.clone());
        Ok(())
    }

    async fn get_trades(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Trade>, StoreError> {
        Ok(self
            .trades
            .lock()
            .iter()
            .filter(|t| t.symbol == symbol && within(t.ts, start, end))
            .cloned()
            .collect())
    }

    async fn get_depths(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Depth>, StoreError> {
        Ok(self
            .depths
            .lock()
            .iter()
            .filter(|d| d.symbol == symbol && within(d.ts, start, end))
            .cloned()
            .collect())
    }

    async fn get_features_in_range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FeatureRecord>, StoreError> {
        Ok(self
            .features
            .lock()
            .iter()
            .filter(|r| r.symbol == symbol && r.timestamp > start && r.timestamp < end)
            .cloned()
            .collect())
    }

    async fn get_prices(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        Ok(self
            .prices
            .lock()
            .iter()
            .filter(|r| r.symbol == symbol && within(r.timestamp, start, end))
            .cloned()
            .collect())
    }

    async fn close(&self) {}
}

/// Store whose writes always fail.
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn store_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        Err(StoreError::TimestampOutOfRange(trade.ts))
    }

    async fn store_depth(&self, depth: &Depth) -> Result<(), StoreError> {
        Err(StoreError::TimestampOutOfRange(depth.ts))
    }

    async fn store_features(&self, record: &FeatureRecord) -> Result<(), StoreError> {
        Err(StoreError::TimestampOutOfRange(record.timestamp))
    }

    async fn store_price(&self, record: &PriceRecord) -> Result<(), StoreError> {
        Err(StoreError::TimestampOutOfRange(record.timestamp))
    }

    async fn get_trades(
        &self,
        _symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<Trade>, StoreError> {
        Ok(Vec::new())
    }

    async fn get_depths(
        &self,
        _symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<Depth>, StoreError> {
        Ok(Vec::new())
    }

    async fn get_features_in_range(
        &self,
        _symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<FeatureRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn get_prices(
        &self,
        _symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn close(&self) {}
}

/// DecisionSink that keeps every observation.
#[derive(Default)]
pub struct RecordingSink {
    pub seen: Mutex<Vec<Observation>>,
}

impl DecisionSink for RecordingSink {
    fn attempt_decision(&self, obs: &Observation) {
        self.seen.lock().push(obs.clone());
    }
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_714_564_800 + secs, 0).unwrap()
}

pub fn trade(symbol: &str, price: f64, qty: f64, secs: i64) -> Trade {
    Trade {
        symbol: symbol.into(),
        price,
        qty,
        ts: ts(secs),
    }
}

pub fn depth(symbol: &str, bid_vol: f64, ask_vol: f64, secs: i64) -> Depth {
    Depth {
        symbol: symbol.into(),
        bid_vol,
        ask_vol,
        last_price: 0.0,
        ts: ts(secs),
    }
}

/// Polls `cond` every few milliseconds for up to five seconds.
pub async fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    cond()
}
