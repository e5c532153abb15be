//! Per-event work done by the trade and depth consumers.
use std::sync::Arc;

use async_trait::async_trait;
use market::features::depth_imbalance;
use market::{Depth, FeatureBook, Trade};
use storage::{FeatureRecord, PriceRecord};
use tracing::{debug, warn};

use crate::batch::BatchHandler;
use crate::decision::{DecisionSink, Observation};
use crate::metrics::{Counters, bump};
use crate::persist::Persistence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOutcome {
    /// Folded into feature state with this tick sign.
    Applied(i8),
    /// Non-finite or negative price/qty; nothing changed.
    Rejected,
    UnknownSymbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthOutcome {
    Dispatched,
    /// Non-finite or negative volume or price; nothing stored.
    Rejected,
    /// No trade seen yet for the symbol.
    NoPrice,
    /// VWAP dispersion is zero, the signal is undefined.
    ZeroDispersion,
    UnknownSymbol,
}

pub struct FeatureProcessor {
    book: Arc<FeatureBook>,
    sink: Arc<dyn DecisionSink>,
    persistence: Persistence,
    counters: Counters,
}

impl FeatureProcessor {
    pub fn new(
        book: Arc<FeatureBook>,
        sink: Arc<dyn DecisionSink>,
        persistence: Persistence,
        counters: Counters,
    ) -> Self {
        Self {
            book,
            sink,
            persistence,
            counters,
        }
    }

    pub async fn process_trade(&self, trade: &Trade) -> TradeOutcome {
        bump(&self.counters.trades_received);

        let Some(state) = self.book.get(&trade.symbol) else {
            bump(&self.counters.unknown_symbols);
            debug!(symbol = %trade.symbol, "trade for unconfigured symbol");
            return TradeOutcome::UnknownSymbol;
        };

        let sign = match state.apply_trade(trade.price, trade.qty) {
            Ok(sign) => sign,
            Err(e) => {
                bump(&self.counters.feature_errors);
                warn!(symbol = %trade.symbol, error = %e, "trade rejected");
                return TradeOutcome::Rejected;
            }
        };

        self.persistence.trade(trade).await;
        bump(&self.counters.samples_processed);
        TradeOutcome::Applied(sign)
    }

    /// Raw depth is stored before the warm-up checks, so a depth that
    /// cannot be dispatched is still persisted. Invalid depth is not.
    pub async fn process_depth(&self, depth: &Depth) -> DepthOutcome {
        bump(&self.counters.depths_received);

        let Some(state) = self.book.get(&depth.symbol) else {
            bump(&self.counters.unknown_symbols);
            debug!(symbol = %depth.symbol, "depth for unconfigured symbol");
            return DepthOutcome::UnknownSymbol;
        };

        if let Err(e) = depth.validate() {
            bump(&self.counters.feature_errors);
            warn!(symbol = %depth.symbol, error = %e, "depth rejected");
            return DepthOutcome::Rejected;
        }

        self.persistence.depth(depth).await;
        bump(&self.counters.samples_processed);

        let Some(price) = state.last_price() else {
            return DepthOutcome::NoPrice;
        };

        let stats = state.vwap();
        bump(&self.counters.vwap_calculations);
        if stats.std_dev == 0.0 {
            return DepthOutcome::ZeroDispersion;
        }

        let obs = Observation {
            symbol: depth.symbol.clone(),
            price,
            vwap: stats.vwap,
            std_dev: stats.std_dev,
            tick_ratio: state.tick_ratio(),
            depth_ratio: depth_imbalance(depth.bid_vol, depth.ask_vol),
            bid_vol: depth.bid_vol,
            ask_vol: depth.ask_vol,
        };
        self.sink.attempt_decision(&obs);
        bump(&self.counters.decisions_dispatched);

        let features = FeatureRecord {
            symbol: obs.symbol.clone(),
            timestamp: depth.ts,
            tick_ratio: obs.tick_ratio,
            depth_ratio: obs.depth_ratio,
            price_dist: (obs.price - obs.vwap) / obs.std_dev,
            price: obs.price,
            vwap: obs.vwap,
            std_dev: obs.std_dev,
            bid_vol: obs.bid_vol,
            ask_vol: obs.ask_vol,
        };
        if self.persistence.features(&features).await {
            bump(&self.counters.features_recorded);
        }

        let snapshot = PriceRecord {
            symbol: obs.symbol,
            timestamp: depth.ts,
            price: obs.price,
            vwap: obs.vwap,
            std_dev: obs.std_dev,
        };
        self.persistence.price(&snapshot).await;

        DepthOutcome::Dispatched
    }
}

#[async_trait]
impl BatchHandler<Trade> for FeatureProcessor {
    async fn handle_batch(&self, batch: Vec<Trade>) {
        bump(&self.counters.trade_batches);
        for trade in &batch {
            self.process_trade(trade).await;
        }
    }
}

#[async_trait]
impl BatchHandler<Depth> for FeatureProcessor {
    async fn handle_batch(&self, batch: Vec<Depth>) {
        bump(&self.counters.depth_batches);
        for depth in &batch {
            self.process_depth(depth).await;
        }
    }
}
