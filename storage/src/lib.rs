//! Durable time-series store for market events and derived records.
//!
//! Records live in one SQLite file under four buckets (`trades`, `depths`,
//! `features`, `prices`). Keys are `<symbol>_<nanos>` with the timestamp
//! zero padded to 20 digits, so byte order equals time order per symbol.

pub mod bucket;
pub mod error;
pub mod records;
pub mod store;

pub use bucket::Bucket;
pub use error::StoreError;
pub use records::{FeatureRecord, FiniteFields, PriceRecord};
pub use store::RecordStore;
pub use store::sqlite_store::SqliteTimeSeriesStore;
