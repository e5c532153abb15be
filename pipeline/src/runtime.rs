//! Wires queues, accumulators and the fault reporter together.
use std::sync::Arc;

use market::{Depth, FeatureBook, Trade};
use storage::RecordStore;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::batch::BatchAccumulator;
use crate::config::PipelineConfig;
use crate::decision::DecisionSink;
use crate::faults::run_fault_reporter;
use crate::feed::{FeedError, FeedSinks, MarketFeed};
use crate::metrics::{Counters, bump};
use crate::persist::Persistence;
use crate::processor::FeatureProcessor;
use crate::shutdown::ShutdownCoordinator;

pub struct Pipeline {
    config: PipelineConfig,
    processor: Arc<FeatureProcessor>,
    counters: Counters,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        book: Arc<FeatureBook>,
        sink: Arc<dyn DecisionSink>,
        store: Option<Arc<dyn RecordStore>>,
        counters: Counters,
    ) -> Self {
        let persistence = Persistence::new(store, counters.clone());
        let processor = Arc::new(FeatureProcessor::new(
            book,
            sink,
            persistence,
            counters.clone(),
        ));
        Self {
            config,
            processor,
            counters,
        }
    }

    pub fn processor(&self) -> &Arc<FeatureProcessor> {
        &self.processor
    }

    /// Spawns both accumulators and the fault reporter under `coordinator`
    /// and returns the producer side of their queues.
    ///
    /// Accumulators stop on cancellation, or once every returned sender
    /// is dropped.
    pub fn start(&self, coordinator: &ShutdownCoordinator) -> FeedSinks {
        let cfg = &self.config;
        let (trade_tx, trade_rx) = mpsc::channel::<Trade>(cfg.event_channel_capacity);
        let (depth_tx, depth_rx) = mpsc::channel::<Depth>(cfg.event_channel_capacity);
        let (error_tx, error_rx) = mpsc::channel::<FeedError>(cfg.error_channel_capacity);

        let trades = BatchAccumulator::new(
            "trades",
            trade_rx,
            cfg.trade_batch_size,
            cfg.flush_interval,
        );
        let processor = Arc::clone(&self.processor);
        let token = coordinator.token();
        coordinator.spawn("trade-accumulator", async move {
            let exit = trades.run(processor, token).await;
            debug!(?exit, "trade accumulator exited");
        });

        let depths = BatchAccumulator::new(
            "depths",
            depth_rx,
            cfg.depth_batch_size,
            cfg.flush_interval,
        );
        let processor = Arc::clone(&self.processor);
        let token = coordinator.token();
        coordinator.spawn("depth-accumulator", async move {
            let exit = depths.run(processor, token).await;
            debug!(?exit, "depth accumulator exited");
        });

        coordinator.spawn(
            "fault-reporter",
            run_fault_reporter(error_rx, self.counters.clone(), coordinator.token()),
        );

        FeedSinks {
            trades: trade_tx,
            depths: depth_tx,
            errors: error_tx,
        }
    }

    /// Runs `feed` under `coordinator`. A fatal feed fault is logged and
    /// forwarded to the fault reporter, or counted here if the error queue
    /// cannot take it.
    pub fn spawn_feed(
        &self,
        coordinator: &ShutdownCoordinator,
        feed: Arc<dyn MarketFeed>,
        sinks: FeedSinks,
    ) {
        let token = coordinator.token();
        let symbols = self.config.symbols.clone();
        let counters = self.counters.clone();
        coordinator.spawn("feed", async move {
            let errors = sinks.errors.clone();
            if let Err(e) = feed.stream(token, &symbols, sinks).await {
                error!(error = %e, "feed stopped");
                if let Err(unsent) = errors.try_send(e) {
                    let fault = unsent.into_inner();
                    bump(&counters.errors_total);
                    if fault.is_disconnect() {
                        bump(&counters.reconnects);
                    }
                    warn!(error = %fault, "fault reporter unavailable; feed fault counted directly");
                }
            }
        });
    }
}
