use std::fmt;

use chrono::{DateTime, Utc};

use crate::StoreError;

const TS_DIGITS: usize = 20;

/// Logical namespace holding one record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Trades,
    Depths,
    Features,
    Prices,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [Bucket::Trades, Bucket::Depths, Bucket::Features, Bucket::Prices];

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Trades => "trades",
            Bucket::Depths => "depths",
            Bucket::Features => "features",
            Bucket::Prices => "prices",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Key under which a record for `symbol` at `ts` is written.
pub fn encode_key(symbol: &str, ts: DateTime<Utc>) -> Result<String, StoreError> {
    let nanos = ts
        .timestamp_nanos_opt()
        .filter(|n| *n >= 0)
        .ok_or(StoreError::TimestampOutOfRange(ts))?;
    Ok(format_key(symbol, nanos))
}

/// Scan bound for `ts`, clamped into the encodable range.
pub(crate) fn bound_key(symbol: &str, ts: DateTime<Utc>) -> String {
    let nanos = match ts.timestamp_nanos_opt() {
        Some(n) => n.max(0),
        None if ts.timestamp() < 0 => 0,
        None => i64::MAX,
    };
    format_key(symbol, nanos)
}

pub(crate) fn key_prefix(symbol: &str) -> String {
    format!("{symbol}_")
}

/// Timestamp part of `key` if it belongs to `prefix` and is well formed.
pub(crate) fn decode_ts(key: &str, prefix: &str) -> Option<i64> {
    let digits = key.strip_prefix(prefix)?;
    if digits.len() != TS_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn format_key(symbol: &str, nanos: i64) -> String {
    format!("{symbol}_{nanos:0width$}", width = TS_DIGITS)
}
