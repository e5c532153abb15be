mod imbalance;
mod vwap;

pub use imbalance::{TickImbalance, depth_imbalance, tick_sign};
pub use vwap::{Vwap, VwapStats};

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("invalid sample: price={price}, qty={qty}")]
    InvalidSample { price: f64, qty: f64 },

    #[error("invalid depth: bid_vol={bid_vol}, ask_vol={ask_vol}, last_price={last_price}")]
    InvalidDepth {
        bid_vol: f64,
        ask_vol: f64,
        last_price: f64,
    },
}
