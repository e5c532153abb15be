use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Monotonic counters for operational visibility.
#[derive(Clone, Default, Debug)]
pub struct Counters {
    pub trades_received: Arc<AtomicU64>,
    pub depths_received: Arc<AtomicU64>,
    pub samples_processed: Arc<AtomicU64>,

    pub vwap_calculations: Arc<AtomicU64>,
    pub decisions_dispatched: Arc<AtomicU64>,
    pub features_recorded: Arc<AtomicU64>,

    pub trade_batches: Arc<AtomicU64>,
    pub depth_batches: Arc<AtomicU64>,

    // faults
    pub errors_total: Arc<AtomicU64>,
    pub reconnects: Arc<AtomicU64>,
    pub feature_errors: Arc<AtomicU64>,
    pub store_failures: Arc<AtomicU64>,
    pub unknown_symbols: Arc<AtomicU64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub trades_received: u64,
    pub depths_received: u64,
    pub samples_processed: u64,
    pub vwap_calculations: u64,
    pub decisions_dispatched: u64,
    pub features_recorded: u64,
    pub trade_batches: u64,
    pub depth_batches: u64,
    pub errors_total: u64,
    pub reconnects: u64,
    pub feature_errors: u64,
    pub store_failures: u64,
    pub unknown_symbols: u64,
}

pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Counters {
    pub fn snapshot(&self) -> CountersSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CountersSnapshot {
            trades_received: get(&self.trades_received),
            depths_received: get(&self.depths_received),
            samples_processed: get(&self.samples_processed),
            vwap_calculations: get(&self.vwap_calculations),
            decisions_dispatched: get(&self.decisions_dispatched),
            features_recorded: get(&self.features_recorded),
            trade_batches: get(&self.trade_batches),
            depth_batches: get(&self.depth_batches),
            errors_total: get(&self.errors_total),
            reconnects: get(&self.reconnects),
            feature_errors: get(&self.feature_errors),
            store_failures: get(&self.store_failures),
            unknown_symbols: get(&self.unknown_symbols),
        }
    }
}

/// Logs a snapshot every `period` until cancelled.
pub async fn run_counter_logger(counters: Counters, period: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                tracing::info!(counters = ?counters.snapshot(), "pipeline counters");
            }
        }
    }
}
