use std::path::PathBuf;
use std::time::Duration;

use market::FeatureConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?} as an unsigned integer")]
    NotANumber { key: &'static str, value: String },

    #[error("{key} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("SYMBOLS must name at least one symbol")]
    NoSymbols,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Symbols that get feature state. Events for anything else are dropped.
    pub symbols: Vec<String>,

    /// Directory holding the store file. `None` runs without persistence.
    pub data_path: Option<PathBuf>,

    /// JSON-lines file replayed by the bundled feed.
    pub feed_path: Option<PathBuf>,

    /// Delay between replayed events.
    pub feed_pace: Duration,

    // =========================
    // Feature accumulators
    // =========================
    /// Maximum trades held by each VWAP window.
    pub vwap_size: usize,

    /// Age limit for trades contributing to VWAP.
    pub vwap_window: Duration,

    /// Tick directions held by each imbalance window.
    pub tick_size: usize,

    // =========================
    // Batching
    // =========================
    pub trade_batch_size: usize,
    pub depth_batch_size: usize,

    /// Timer trigger shared by both accumulators.
    ///
    /// A partially filled batch never waits longer than this.
    pub flush_interval: Duration,

    // =========================
    // Channels and lifecycle
    // =========================
    /// Capacity of the trade and depth queues. Producers block when full.
    pub event_channel_capacity: usize,
    pub error_channel_capacity: usize,

    /// Upper bound on the shutdown drain before tasks are aborted.
    pub shutdown_timeout: Duration,

    /// JSON log output, selected by `APP_ENV=production`.
    pub json_logs: bool,
}

impl PipelineConfig {
    pub const MIN_VWAP_SIZE: u64 = 10;
    pub const MAX_VWAP_SIZE: u64 = 10_000;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let num = |key: &'static str, default: u64, min: u64, max: u64| -> Result<u64, ConfigError> {
            let value = match get(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map_err(|_| ConfigError::NotANumber { key, value: raw })?,
                None => default,
            };
            if value < min || value > max {
                return Err(ConfigError::OutOfRange {
                    key,
                    value,
                    min,
                    max,
                });
            }
            Ok(value)
        };

        let symbols: Vec<String> = get("SYMBOLS")
            .unwrap_or_else(|| "BTCUSDT,ETHUSDT".to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }

        const MAX: u64 = u32::MAX as u64;

        Ok(Self {
            symbols,
            data_path: get("DATA_PATH").map(PathBuf::from),
            feed_path: get("FEED_PATH").map(PathBuf::from),
            feed_pace: Duration::from_millis(num("FEED_PACE_MS", 0, 0, MAX)?),

            vwap_size: num("VWAP_SIZE", 600, Self::MIN_VWAP_SIZE, Self::MAX_VWAP_SIZE)? as usize,
            vwap_window: Duration::from_secs(num("VWAP_WINDOW_SECS", 60, 1, MAX)?),
            tick_size: num("TICK_SIZE", 50, 1, MAX)? as usize,

            trade_batch_size: num("TRADE_BATCH_SIZE", 20, 1, MAX)? as usize,
            depth_batch_size: num("DEPTH_BATCH_SIZE", 10, 1, MAX)? as usize,
            flush_interval: Duration::from_millis(num("FLUSH_INTERVAL_MS", 1, 1, MAX)?),

            event_channel_capacity: num("EVENT_CHANNEL_CAPACITY", 64, 1, MAX)? as usize,
            error_channel_capacity: num("ERROR_CHANNEL_CAPACITY", 32, 1, MAX)? as usize,
            shutdown_timeout: Duration::from_secs(num("SHUTDOWN_TIMEOUT_SECS", 10, 1, MAX)?),

            json_logs: get("APP_ENV").is_some_and(|v| v == "production"),
        })
    }

    pub fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            vwap_size: self.vwap_size,
            vwap_window: self.vwap_window,
            tick_size: self.tick_size,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTCUSDT".into(), "ETHUSDT".into()],
            data_path: None,
            feed_path: None,
            feed_pace: Duration::ZERO,
            vwap_size: 600,
            vwap_window: Duration::from_secs(60),
            tick_size: 50,
            trade_batch_size: 20,
            depth_batch_size: 10,
            flush_interval: Duration::from_millis(1),
            event_channel_capacity: 64,
            error_channel_capacity: 32,
            shutdown_timeout: Duration::from_secs(10),
            json_logs: false,
        }
    }
}
