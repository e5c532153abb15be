//! Feed adapter seam and the bundled JSON-lines replay feed.
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use market::{Depth, MarketEvent, Trade};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed disconnected: {0}")]
    Disconnected(String),

    #[error("malformed payload at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("feed io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    pub fn is_disconnect(&self) -> bool {
        matches!(self, FeedError::Disconnected(_))
    }
}

/// Producer ends of the pipeline queues.
#[derive(Clone, Debug)]
pub struct FeedSinks {
    pub trades: mpsc::Sender<Trade>,
    pub depths: mpsc::Sender<Depth>,
    pub errors: mpsc::Sender<FeedError>,
}

/// Source of market events.
///
/// Implementations push into `sinks` until cancelled or a fatal fault.
/// Recoverable faults go to `sinks.errors`; the return value is reserved
/// for the fault that ended the stream.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    async fn stream(
        &self,
        token: CancellationToken,
        symbols: &[String],
        sinks: FeedSinks,
    ) -> Result<(), FeedError>;
}

/// Replays a file of tagged events, one JSON object per line.
pub struct ReplayFeed {
    path: PathBuf,
    pace: Duration,
}

impl ReplayFeed {
    pub fn new(path: impl Into<PathBuf>, pace: Duration) -> Self {
        Self {
            path: path.into(),
            pace,
        }
    }
}

#[async_trait]
impl MarketFeed for ReplayFeed {
    async fn stream(
        &self,
        token: CancellationToken,
        symbols: &[String],
        sinks: FeedSinks,
    ) -> Result<(), FeedError> {
        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut line_no = 0usize;
        let mut replayed = 0u64;

        loop {
            let next = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                line = lines.next_line() => line?,
            };
            let Some(line) = next else {
                info!(path = %self.path.display(), replayed, "replay finished");
                return Ok(());
            };
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let event = match serde_json::from_str::<MarketEvent>(&line) {
                Ok(ev) => ev,
                Err(e) => {
                    let fault = FeedError::Malformed {
                        line: line_no,
                        reason: e.to_string(),
                    };
                    if !forward(&token, &sinks.errors, fault).await {
                        return Ok(());
                    }
                    continue;
                }
            };

            if !symbols.iter().any(|s| s == event.symbol()) {
                debug!(symbol = event.symbol(), "ignoring unsubscribed symbol");
                continue;
            }

            let delivered = match event {
                MarketEvent::Trade(t) => forward(&token, &sinks.trades, t).await,
                MarketEvent::Depth(d) => forward(&token, &sinks.depths, d).await,
            };
            if !delivered {
                if token.is_cancelled() {
                    return Ok(());
                }
                return Err(FeedError::Disconnected("event consumer dropped".into()));
            }
            replayed += 1;

            if !self.pace.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(self.pace) => {}
                }
            }
        }
    }
}

/// Blocking send that gives up on cancellation. False when not delivered.
async fn forward<T: Send>(token: &CancellationToken, tx: &mpsc::Sender<T>, value: T) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        res = tx.send(value) => res.is_ok(),
    }
}
