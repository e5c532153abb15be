use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;
use tempfile::TempDir;

use market::{Depth, Trade};
use storage::store::sqlite_store::DB_FILE_NAME;
use storage::{Bucket, FeatureRecord, PriceRecord, RecordStore, SqliteTimeSeriesStore, StoreError};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn trade(symbol: &str, price: f64, ts: DateTime<Utc>) -> Trade {
    Trade {
        symbol: symbol.into(),
        price,
        qty: 0.5,
        ts,
    }
}

fn feature(symbol: &str, ts: DateTime<Utc>) -> FeatureRecord {
    FeatureRecord {
        symbol: symbol.into(),
        timestamp: ts,
        tick_ratio: 0.2,
        depth_ratio: -0.1,
        price_dist: 1.5,
        price: 50_010.0,
        vwap: 50_000.0,
        std_dev: 6.5,
        bid_vol: 12.0,
        ask_vol: 14.5,
    }
}

async fn open_temp() -> anyhow::Result<(TempDir, SqliteTimeSeriesStore)> {
    let dir = tempfile::tempdir()?;
    let store = SqliteTimeSeriesStore::open(dir.path()).await?;
    Ok((dir, store))
}

#[tokio::test]
async fn test_open_creates_database_file() -> anyhow::Result<()> {
    let (dir, store) = open_temp().await?;

    assert!(dir.path().join(DB_FILE_NAME).exists());
    assert_eq!(store.path(), dir.path().join(DB_FILE_NAME));

    store.close().await;
    Ok(())
}

#[tokio::test]
async fn test_open_rejects_missing_directory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("nope");

    let err = SqliteTimeSeriesStore::open(&missing).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidDataDir { .. }));
    Ok(())
}

/// Three BTCUSDT trades at T, T+1s, T+10s; the window [T-1s, T+5s] holds the first two.
#[tokio::test]
async fn test_trade_range_scan_scenario() -> anyhow::Result<()> {
    let (_dir, store) = open_temp().await?;
    let t = t0();

    store.store_trade(&trade("BTCUSDT", 50_000.0, t)).await?;
    store
        .store_trade(&trade("BTCUSDT", 50_010.0, t + Duration::seconds(1)))
        .await?;
    store
        .store_trade(&trade("BTCUSDT", 49_990.0, t + Duration::seconds(10)))
        .await?;
    store
        .store_trade(&trade("ETHUSDT", 3_000.0, t + Duration::seconds(2)))
        .await?;

    let got = store
        .get_trades("BTCUSDT", t - Duration::seconds(1), t + Duration::seconds(5))
        .await?;

    let prices: Vec<f64> = got.iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![50_000.0, 50_010.0]);
    assert!(got.iter().all(|t| t.symbol == "BTCUSDT"));
    Ok(())
}

#[tokio::test]
async fn test_trade_scan_includes_both_endpoints() -> anyhow::Result<()> {
    let (_dir, store) = open_temp().await?;
    let t = t0();
    let end = t + Duration::seconds(3);

    store.store_trade(&trade("BTCUSDT", 1.0, t)).await?;
    store.store_trade(&trade("BTCUSDT", 2.0, end)).await?;

    let got = store.get_trades("BTCUSDT", t, end).await?;
    assert_eq!(got.len(), 2);

    let inverted = store.get_trades("BTCUSDT", end, t).await?;
    assert!(inverted.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_round_trip_preserves_all_fields() -> anyhow::Result<()> {
    let (_dir, store) = open_temp().await?;
    let ts = t0() + Duration::nanoseconds(123_456_789);

    let original = trade("BTCUSDT", 50_000.123_456_789, ts);
    store.store_trade(&original).await?;

    let got = store.get_trades("BTCUSDT", ts, ts).await?;
    assert_eq!(got, vec![original]);
    Ok(())
}

#[tokio::test]
async fn test_symbol_prefix_does_not_leak() -> anyhow::Result<()> {
    let (_dir, store) = open_temp().await?;
    let t = t0();

    store.store_trade(&trade("BTC", 1.0, t)).await?;
    store.store_trade(&trade("BTC_PERP", 2.0, t)).await?;
    store.store_trade(&trade("BTCUSDT", 3.0, t)).await?;

    let far = Utc.with_ymd_and_hms(2200, 1, 1, 0, 0, 0).unwrap();
    let got = store
        .get_trades("BTC", DateTime::<Utc>::UNIX_EPOCH, far)
        .await?;

    assert_eq!(got.len(), 1);
    assert_eq!(got[0].price, 1.0);
    Ok(())
}

#[tokio::test]
async fn test_unwritten_bucket_scans_empty() -> anyhow::Result<()> {
    let (_dir, store) = open_temp().await?;
    let t = t0();

    assert!(store.get_trades("BTCUSDT", t, t).await?.is_empty());
    assert!(store.get_depths("BTCUSDT", t, t).await?.is_empty());
    assert!(store.get_prices("BTCUSDT", t, t).await?.is_empty());
    assert!(
        store
            .get_features_in_range("BTCUSDT", t, t + Duration::hours(1))
            .await?
            .is_empty()
    );
    assert_eq!(store.bucket_len(Bucket::Features).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_feature_scan_excludes_endpoints() -> anyhow::Result<()> {
    let (_dir, store) = open_temp().await?;
    let t = t0();

    for secs in [0, 1, 2, 3] {
        store
            .store_features(&feature("BTCUSDT", t + Duration::seconds(secs)))
            .await?;
    }
    store
        .store_features(&feature("ETHUSDT", t + Duration::seconds(1)))
        .await?;

    let got = store
        .get_features_in_range("BTCUSDT", t, t + Duration::seconds(3))
        .await?;

    let stamps: Vec<_> = got.iter().map(|r| r.timestamp).collect();
    assert_eq!(
        stamps,
        vec![t + Duration::seconds(1), t + Duration::seconds(2)]
    );
    assert_eq!(got[0], feature("BTCUSDT", t + Duration::seconds(1)));
    Ok(())
}

#[tokio::test]
async fn test_malformed_record_is_skipped() -> anyhow::Result<()> {
    let (dir, store) = open_temp().await?;
    let t = t0();

    store.store_trade(&trade("BTCUSDT", 1.0, t)).await?;
    store
        .store_trade(&trade("BTCUSDT", 3.0, t + Duration::seconds(2)))
        .await?;

    let raw_key = format!(
        "BTCUSDT_{:020}",
        (t + Duration::seconds(1)).timestamp_nanos_opt().unwrap()
    );
    let url = format!("sqlite://{}", dir.path().join(DB_FILE_NAME).display());
    let raw = SqlitePool::connect(&url).await?;
    sqlx::query("INSERT INTO trades (key, value) VALUES (?, ?)")
        .bind(raw_key)
        .bind(b"{not json".to_vec())
        .execute(&raw)
        .await?;
    raw.close().await;

    let got = store
        .get_trades("BTCUSDT", t, t + Duration::seconds(2))
        .await?;
    let prices: Vec<f64> = got.iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![1.0, 3.0]);
    Ok(())
}

#[tokio::test]
async fn test_pre_epoch_write_is_rejected() -> anyhow::Result<()> {
    let (_dir, store) = open_temp().await?;
    let old = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 59).unwrap();

    let err = store
        .store_trade(&trade("BTCUSDT", 1.0, old))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::TimestampOutOfRange(_)));
    assert_eq!(store.bucket_len(Bucket::Trades).await?, 0);
    Ok(())
}

/// NaN would encode as `null` and never scan back, so nothing may be committed.
#[tokio::test]
async fn test_non_finite_depth_is_rejected() -> anyhow::Result<()> {
    let (_dir, store) = open_temp().await?;
    let t = t0();
    let depth = Depth {
        symbol: "BTCUSDT".into(),
        bid_vol: f64::NAN,
        ask_vol: 3.0,
        last_price: 50_000.0,
        ts: t,
    };

    let err = store.store_depth(&depth).await.unwrap_err();
    assert!(matches!(err, StoreError::NonFinite { field: "bid_vol" }));
    assert_eq!(store.bucket_len(Bucket::Depths).await?, 0);
    assert!(store.get_depths("BTCUSDT", t, t).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_infinite_feature_is_rejected() -> anyhow::Result<()> {
    let (_dir, store) = open_temp().await?;
    let mut record = feature("BTCUSDT", t0());
    record.price_dist = f64::INFINITY;

    let err = store.store_features(&record).await.unwrap_err();
    assert!(matches!(err, StoreError::NonFinite { field: "price_dist" }));
    assert_eq!(store.bucket_len(Bucket::Features).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_depth_and_price_round_trip() -> anyhow::Result<()> {
    let (_dir, store) = open_temp().await?;
    let t = t0();

    let depth = Depth {
        symbol: "ETHUSDT".into(),
        bid_vol: 120.5,
        ask_vol: 80.25,
        last_price: 3_001.5,
        ts: t,
    };
    let price = PriceRecord {
        symbol: "ETHUSDT".into(),
        timestamp: t,
        price: 3_001.5,
        vwap: 3_000.0,
        std_dev: 1.25,
    };
    store.store_depth(&depth).await?;
    store.store_price(&price).await?;

    assert_eq!(store.get_depths("ETHUSDT", t, t).await?, vec![depth]);
    assert_eq!(store.get_prices("ETHUSDT", t, t).await?, vec![price]);
    Ok(())
}

#[tokio::test]
async fn test_same_key_overwrites_and_counts() -> anyhow::Result<()> {
    let (_dir, store) = open_temp().await?;
    let t = t0();

    store.store_trade(&trade("BTCUSDT", 1.0, t)).await?;
    store.store_trade(&trade("BTCUSDT", 2.0, t)).await?;
    store
        .store_trade(&trade("ETHUSDT", 3.0, t + Duration::seconds(1)))
        .await?;

    assert_eq!(store.bucket_len(Bucket::Trades).await?, 2);
    let got = store.get_trades("BTCUSDT", t, t).await?;
    assert_eq!(got[0].price, 2.0);
    Ok(())
}

#[tokio::test]
async fn test_records_survive_reopen() -> anyhow::Result<()> {
    let (dir, store) = open_temp().await?;
    let t = t0();

    store.store_features(&feature("BTCUSDT", t)).await?;
    store.close().await;

    let reopened = SqliteTimeSeriesStore::open(dir.path()).await?;
    assert_eq!(reopened.bucket_len(Bucket::Features).await?, 1);
    Ok(())
}
