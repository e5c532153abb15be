use chrono::{DateTime, Utc};
use market::{Depth, Trade};
use serde::{Deserialize, Serialize};

/// Observation derived from a depth snapshot combined with trade-side state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub tick_ratio: f64,
    pub depth_ratio: f64,
    /// `(price - vwap) / std_dev`
    pub price_dist: f64,
    pub price: f64,
    pub vwap: f64,
    pub std_dev: f64,
    pub bid_vol: f64,
    pub ask_vol: f64,
}

/// Lightweight price snapshot used for labelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub vwap: f64,
    pub std_dev: f64,
}

/// Records whose float fields must be finite to be stored.
///
/// JSON has no encoding for NaN or infinity (they would come back as
/// `null` and fail to decode), so such records are refused on write.
pub trait FiniteFields {
    /// Name of the first NaN or infinite field, if any.
    fn non_finite_field(&self) -> Option<&'static str>;
}

fn first_non_finite(fields: &[(&'static str, f64)]) -> Option<&'static str> {
    fields
        .iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| *name)
}

impl FiniteFields for Trade {
    fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[("price", self.price), ("qty", self.qty)])
    }
}

impl FiniteFields for Depth {
    fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[
            ("bid_vol", self.bid_vol),
            ("ask_vol", self.ask_vol),
            ("last_price", self.last_price),
        ])
    }
}

impl FiniteFields for FeatureRecord {
    fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[
            ("tick_ratio", self.tick_ratio),
            ("depth_ratio", self.depth_ratio),
            ("price_dist", self.price_dist),
            ("price", self.price),
            ("vwap", self.vwap),
            ("std_dev", self.std_dev),
            ("bid_vol", self.bid_vol),
            ("ask_vol", self.ask_vol),
        ])
    }
}

impl FiniteFields for PriceRecord {
    fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[
            ("price", self.price),
            ("vwap", self.vwap),
            ("std_dev", self.std_dev),
        ])
    }
}
