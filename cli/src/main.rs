pub mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use common::logger::init_logger;
use storage::{RecordStore, SqliteTimeSeriesStore};

use cli::{Cli, Command};
use commands::RangeKind;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger("tsdb", false);

    let data = match &cli.command {
        Command::Stats { data } => data,
        Command::Trades(args) | Command::Depths(args) | Command::Prices(args) => &args.data,
        Command::ExportFeatures { range, .. } => &range.data,
    };
    let store = SqliteTimeSeriesStore::open(data)
        .await
        .with_context(|| format!("cannot open store in {}", data.display()))?;

    let mut stdout = std::io::stdout().lock();
    let result = match &cli.command {
        Command::Stats { .. } => commands::stats(&store, &mut stdout).await,
        Command::Trades(args) => {
            commands::dump_range(&store, RangeKind::Trades, args, &mut stdout)
                .await
                .map(drop)
        }
        Command::Depths(args) => {
            commands::dump_range(&store, RangeKind::Depths, args, &mut stdout)
                .await
                .map(drop)
        }
        Command::Prices(args) => {
            commands::dump_range(&store, RangeKind::Prices, args, &mut stdout)
                .await
                .map(drop)
        }
        Command::ExportFeatures { range, out } => {
            commands::export_features(&store, range, out).await.map(drop)
        }
    };

    store.close().await;
    result
}
