use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[clap(name = "tsdb", version, about = "Inspect the market data store")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record count per bucket
    Stats {
        /// Directory holding market-data.db
        #[clap(long)]
        data: PathBuf,
    },

    /// Trades for one symbol, both bounds inclusive
    Trades(RangeArgs),

    /// Depth snapshots for one symbol, both bounds inclusive
    Depths(RangeArgs),

    /// Price records for one symbol, both bounds inclusive
    Prices(RangeArgs),

    /// Write feature records (bounds exclusive) to a JSON array file.
    /// Records holding NaN or infinite values are left out.
    ExportFeatures {
        #[clap(flatten)]
        range: RangeArgs,

        #[clap(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One compact JSON object per line
    Jsonl,
    /// Indented JSON objects
    Pretty,
}

#[derive(Debug, Args)]
pub struct RangeArgs {
    /// Directory holding market-data.db
    #[clap(long)]
    pub data: PathBuf,

    #[clap(long)]
    pub symbol: String,

    /// RFC 3339 start, defaults to the unix epoch
    #[clap(long, value_parser = parse_ts)]
    pub from: Option<DateTime<Utc>>,

    /// RFC 3339 end, defaults to now
    #[clap(long, value_parser = parse_ts)]
    pub to: Option<DateTime<Utc>>,

    #[clap(long, value_enum, default_value_t = OutputFormat::Jsonl)]
    pub format: OutputFormat,
}

impl RangeArgs {
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.from.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            self.to.unwrap_or_else(Utc::now),
        )
    }
}

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 timestamp: {e}"))
}
