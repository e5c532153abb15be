use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use storage::{Bucket, RecordStore, SqliteTimeSeriesStore};
use tracing::info;

use crate::cli::{OutputFormat, RangeArgs};

#[derive(Debug, Clone, Copy)]
pub enum RangeKind {
    Trades,
    Depths,
    Prices,
}

pub async fn stats<W: Write>(store: &SqliteTimeSeriesStore, out: &mut W) -> anyhow::Result<()> {
    for bucket in Bucket::ALL {
        let n = store
            .bucket_len(bucket)
            .await
            .with_context(|| format!("cannot count {bucket}"))?;
        writeln!(out, "{bucket:<10} {n}")?;
    }
    Ok(())
}

/// Writes the matching records to `out`; returns how many were written.
pub async fn dump_range<W: Write>(
    store: &SqliteTimeSeriesStore,
    kind: RangeKind,
    args: &RangeArgs,
    out: &mut W,
) -> anyhow::Result<usize> {
    let (from, to) = args.window();
    let symbol = args.symbol.as_str();

    match kind {
        RangeKind::Trades => write_records(&store.get_trades(symbol, from, to).await?, args.format, out),
        RangeKind::Depths => write_records(&store.get_depths(symbol, from, to).await?, args.format, out),
        RangeKind::Prices => write_records(&store.get_prices(symbol, from, to).await?, args.format, out),
    }
}

/// Writes the feature records as a JSON array; returns how many.
///
/// The store refuses non-finite values, so every exported record is
/// finite.
pub async fn export_features(
    store: &SqliteTimeSeriesStore,
    args: &RangeArgs,
    path: &Path,
) -> anyhow::Result<usize> {
    let (from, to) = args.window();
    let records = store
        .get_features_in_range(&args.symbol, from, to)
        .await?;

    let body = serde_json::to_vec_pretty(&records)?;
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("cannot write {}", path.display()))?;

    info!(
        symbol = %args.symbol,
        exported = records.len(),
        path = %path.display(),
        "features exported"
    );
    Ok(records.len())
}

fn write_records<T: Serialize, W: Write>(
    records: &[T],
    format: OutputFormat,
    out: &mut W,
) -> anyhow::Result<usize> {
    for record in records {
        match format {
            OutputFormat::Jsonl => serde_json::to_writer(&mut *out, record)?,
            OutputFormat::Pretty => serde_json::to_writer_pretty(&mut *out, record)?,
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use market::Trade;
    use storage::FeatureRecord;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn args(dir: &Path, symbol: &str) -> RangeArgs {
        RangeArgs {
            data: dir.to_path_buf(),
            symbol: symbol.into(),
            from: Some(t0() - Duration::seconds(1)),
            to: Some(t0() + Duration::seconds(10)),
            format: OutputFormat::Jsonl,
        }
    }

    fn feature(secs: i64, price_dist: f64) -> FeatureRecord {
        FeatureRecord {
            symbol: "BTCUSDT".into(),
            timestamp: t0() + Duration::seconds(secs),
            tick_ratio: 0.0,
            depth_ratio: 0.0,
            price_dist,
            price: 1.0,
            vwap: 1.0,
            std_dev: 1.0,
            bid_vol: 1.0,
            ask_vol: 1.0,
        }
    }

    #[tokio::test]
    async fn dumps_trades_as_json_lines() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SqliteTimeSeriesStore::open(dir.path()).await?;
        for (secs, price) in [(0, 50_000.0), (1, 50_010.0)] {
            store
                .store_trade(&Trade {
                    symbol: "BTCUSDT".into(),
                    price,
                    qty: 1.0,
                    ts: t0() + Duration::seconds(secs),
                })
                .await?;
        }

        let mut out = Vec::new();
        let n = dump_range(&store, RangeKind::Trades, &args(dir.path(), "BTCUSDT"), &mut out).await?;

        let text = String::from_utf8(out)?;
        let lines: Vec<Trade> = text
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(n, 2);
        assert_eq!(lines[1].price, 50_010.0);
        Ok(())
    }

    #[tokio::test]
    async fn stats_lists_every_bucket() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SqliteTimeSeriesStore::open(dir.path()).await?;
        store.store_features(&feature(1, 0.5)).await?;

        let mut out = Vec::new();
        stats(&store, &mut out).await?;
        let text = String::from_utf8(out)?;

        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().any(|l| l.starts_with("features") && l.ends_with(" 1")));
        assert!(text.lines().any(|l| l.starts_with("trades") && l.ends_with(" 0")));
        Ok(())
    }

    #[tokio::test]
    async fn export_writes_records_strictly_inside_window() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SqliteTimeSeriesStore::open(dir.path()).await?;
        // window is [t0 - 1s, t0 + 10s]; the first record sits on its start
        store.store_features(&feature(-1, 9.0)).await?;
        store.store_features(&feature(1, 0.5)).await?;
        store.store_features(&feature(3, -1.25)).await?;
        assert!(store.store_features(&feature(2, f64::INFINITY)).await.is_err());

        let path = dir.path().join("features.json");
        let n = export_features(&store, &args(dir.path(), "BTCUSDT"), &path).await?;

        let written: Vec<FeatureRecord> = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(n, 2);
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].price_dist, 0.5);
        assert_eq!(written[1].price_dist, -1.25);
        Ok(())
    }
}
