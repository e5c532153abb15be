//! Optional persistence. Every write site tolerates a missing store.
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::logger::warn_if_slow;
use market::{Depth, Trade};
use storage::{FeatureRecord, PriceRecord, RecordStore, SqliteTimeSeriesStore, StoreError};
use tracing::{error, info, warn};

use crate::metrics::{Counters, bump};

const SLOW_WRITE: Duration = Duration::from_millis(50);

/// Opens the store under `data_dir`, or `None` when persistence is off or
/// the store cannot be opened. Never fails startup.
pub async fn open_store(data_dir: Option<&Path>) -> Option<Arc<dyn RecordStore>> {
    let Some(dir) = data_dir else {
        info!("DATA_PATH not set; persistence disabled");
        return None;
    };

    match SqliteTimeSeriesStore::open(dir).await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "cannot open store; persistence disabled");
            None
        }
    }
}

/// Write-side facade over an optional [`RecordStore`].
///
/// Failed writes are logged, counted in `store_failures` and dropped.
#[derive(Clone)]
pub struct Persistence {
    store: Option<Arc<dyn RecordStore>>,
    counters: Counters,
}

impl Persistence {
    pub fn new(store: Option<Arc<dyn RecordStore>>, counters: Counters) -> Self {
        Self { store, counters }
    }

    pub fn disabled(counters: Counters) -> Self {
        Self::new(None, counters)
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn trade(&self, trade: &Trade) -> bool {
        match &self.store {
            Some(store) => {
                self.write("store_trade", &trade.symbol, store.store_trade(trade))
                    .await
            }
            None => false,
        }
    }

    pub async fn depth(&self, depth: &Depth) -> bool {
        match &self.store {
            Some(store) => {
                self.write("store_depth", &depth.symbol, store.store_depth(depth))
                    .await
            }
            None => false,
        }
    }

    pub async fn features(&self, record: &FeatureRecord) -> bool {
        match &self.store {
            Some(store) => {
                self.write("store_features", &record.symbol, store.store_features(record))
                    .await
            }
            None => false,
        }
    }

    pub async fn price(&self, record: &PriceRecord) -> bool {
        match &self.store {
            Some(store) => {
                self.write("store_price", &record.symbol, store.store_price(record))
                    .await
            }
            None => false,
        }
    }

    /// True when the record was stored.
    async fn write<F>(&self, op: &'static str, symbol: &str, fut: F) -> bool
    where
        F: Future<Output = Result<(), StoreError>>,
    {
        match warn_if_slow(op, SLOW_WRITE, fut).await {
            Ok(()) => true,
            Err(e) => {
                bump(&self.counters.store_failures);
                error!(op, symbol = %symbol, error = %e, "persist failed; record dropped");
                false
            }
        }
    }
}
