//! Market events and the per-symbol rolling features derived from them.

pub mod features;
pub mod rolling_window;
pub mod state;
pub mod types;

pub use features::FeatureError;
pub use state::{FeatureBook, FeatureConfig, SymbolFeatures};
pub use types::{Depth, MarketEvent, Trade};
