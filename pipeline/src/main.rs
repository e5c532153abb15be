use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::logger::init_logger;
use market::FeatureBook;
use pipeline::{
    config::PipelineConfig,
    decision::{DecisionSink, LogDecisionSink},
    feed::ReplayFeed,
    metrics::{Counters, run_counter_logger},
    persist::open_store,
    runtime::Pipeline,
    shutdown::{ShutdownCoordinator, ShutdownOutcome, wait_for_signal},
};

const COUNTER_LOG_PERIOD: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = PipelineConfig::from_env().context("invalid pipeline configuration")?;
    init_logger("pipeline", cfg.json_logs);

    tracing::info!(symbols = ?cfg.symbols, "starting market data pipeline");

    let counters = Counters::default();
    let store = open_store(cfg.data_path.as_deref()).await;

    let book = Arc::new(FeatureBook::new(
        cfg.symbols.iter().cloned(),
        cfg.feature_config(),
    ));
    let sink: Arc<dyn DecisionSink> = Arc::new(LogDecisionSink);

    let pipeline = Pipeline::new(cfg.clone(), book, sink, store.clone(), counters.clone());
    let coordinator = ShutdownCoordinator::new(cfg.shutdown_timeout);

    let sinks = pipeline.start(&coordinator);

    // Without a feed the senders are held here so the accumulators stay up.
    let _idle_sinks = match &cfg.feed_path {
        Some(path) => {
            let feed = Arc::new(ReplayFeed::new(path.clone(), cfg.feed_pace));
            pipeline.spawn_feed(&coordinator, feed, sinks);
            None
        }
        None => {
            tracing::warn!("FEED_PATH not set; running without a feed");
            Some(sinks)
        }
    };

    coordinator.spawn(
        "counter-logger",
        run_counter_logger(counters.clone(), COUNTER_LOG_PERIOD, coordinator.token()),
    );

    wait_for_signal().await.context("cannot listen for shutdown signals")?;
    tracing::info!("Shutdown signal received");

    if coordinator.shutdown().await == ShutdownOutcome::TimedOut {
        tracing::warn!(timeout = ?cfg.shutdown_timeout, "forced shutdown after drain timeout");
    }

    if let Some(store) = store {
        store.close().await;
    }

    tracing::info!(counters = ?counters.snapshot(), "pipeline stopped");
    Ok(())
}
