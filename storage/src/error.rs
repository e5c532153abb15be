use std::path::PathBuf;

use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("field `{field}` is not finite")]
    NonFinite { field: &'static str },

    #[error("timestamp {0} cannot be stored (before the unix epoch or beyond year 2262)")]
    TimestampOutOfRange(DateTime<Utc>),

    #[error("data directory {} is not usable: {reason}", path.display())]
    InvalidDataDir { path: PathBuf, reason: String },
}
