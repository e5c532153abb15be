//! Ingestion, batching, feature state and persistence for the market data daemon.

pub mod batch;
pub mod config;
pub mod decision;
pub mod faults;
pub mod feed;
pub mod metrics;
pub mod persist;
pub mod processor;
pub mod runtime;
pub mod shutdown;
