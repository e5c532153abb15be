use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::features::FeatureError;

/// One executed transaction as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub price: f64,
    pub qty: f64,
    pub ts: DateTime<Utc>,
}

/// Order-book volume snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depth {
    pub symbol: String,
    /// Total resting bid volume.
    pub bid_vol: f64,
    /// Total resting ask volume.
    pub ask_vol: f64,
    pub last_price: f64,
    pub ts: DateTime<Utc>,
}

impl Depth {
    /// Volumes and price must be finite and non-negative.
    pub fn validate(&self) -> Result<(), FeatureError> {
        let ok = [self.bid_vol, self.ask_vol, self.last_price]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0);
        if ok {
            Ok(())
        } else {
            Err(FeatureError::InvalidDepth {
                bid_vol: self.bid_vol,
                ask_vol: self.ask_vol,
                last_price: self.last_price,
            })
        }
    }
}

/// Tagged wrapper used where both streams share one encoding,
/// e.g. `{"kind":"trade","symbol":"BTCUSDT",...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MarketEvent {
    Trade(Trade),
    Depth(Depth),
}

impl MarketEvent {
    pub fn symbol(&self) -> &str {
        match self {
            MarketEvent::Trade(t) => &t.symbol,
            MarketEvent::Depth(d) => &d.symbol,
        }
    }
}
