use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::features::{FeatureError, TickImbalance, Vwap, VwapStats, tick_sign};

/// Sizing of the per-symbol accumulators.
#[derive(Debug, Clone, Copy)]
pub struct FeatureConfig {
    pub vwap_size: usize,
    pub vwap_window: Duration,
    pub tick_size: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            vwap_size: 600,
            vwap_window: Duration::from_secs(60),
            tick_size: 50,
        }
    }
}

/// Rolling state for one symbol.
///
/// The accumulators are written by the trade consumer only. The last-price
/// cell is written by the trade consumer and read by the depth consumer;
/// readers see the most recent committed write and nothing stronger.
#[derive(Debug)]
pub struct SymbolFeatures {
    vwap: RwLock<Vwap>,
    ticks: Mutex<TickImbalance>,
    /// f64 bits; 0.0 means no trade seen yet.
    last_price: AtomicU64,
}

impl SymbolFeatures {
    pub fn new(cfg: &FeatureConfig) -> Self {
        Self {
            vwap: RwLock::new(Vwap::new(cfg.vwap_size, cfg.vwap_window)),
            ticks: Mutex::new(TickImbalance::new(cfg.tick_size)),
            last_price: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    /// Folds one trade into the accumulators and returns its tick sign.
    ///
    /// An invalid trade leaves every accumulator and the last price untouched.
    pub fn apply_trade(&self, price: f64, qty: f64) -> Result<i8, FeatureError> {
        self.vwap.write().add(price, qty)?;

        let prev = f64::from_bits(self.last_price.swap(price.to_bits(), Ordering::AcqRel));
        let sign = tick_sign(prev, price);
        self.ticks.lock().add(sign);

        Ok(sign)
    }

    pub fn last_price(&self) -> Option<f64> {
        let price = f64::from_bits(self.last_price.load(Ordering::Acquire));
        (price != 0.0).then_some(price)
    }

    pub fn vwap(&self) -> VwapStats {
        self.vwap.read().calc()
    }

    pub fn tick_ratio(&self) -> f64 {
        self.ticks.lock().ratio()
    }

    pub fn last_tick(&self) -> Option<i8> {
        self.ticks.lock().last()
    }
}

/// Symbol-keyed feature state, fixed at construction.
///
/// The map is never mutated after `new`, so lookups take no lock and
/// symbols never contend with each other.
#[derive(Debug, Default)]
pub struct FeatureBook {
    symbols: HashMap<String, Arc<SymbolFeatures>>,
}

impl FeatureBook {
    pub fn new<I, S>(symbols: I, cfg: FeatureConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let symbols = symbols
            .into_iter()
            .map(|s| (s.into(), Arc::new(SymbolFeatures::new(&cfg))))
            .collect();
        Self { symbols }
    }

    pub fn get(&self, symbol: &str) -> Option<&Arc<SymbolFeatures>> {
        self.symbols.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> + '_ {
        self.symbols.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
