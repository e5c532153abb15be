//! Size-or-time batching of a single event stream.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, warn};

/// Consumer of flushed batches.
#[async_trait]
pub trait BatchHandler<T>: Send + Sync {
    async fn handle_batch(&self, batch: Vec<T>);
}

/// Why an accumulator stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorExit {
    /// Cancelled; any partial batch was dropped.
    Cancelled { discarded: usize },
    /// All producers went away; the remainder was flushed.
    Closed,
}

/// Drains a channel into batches of at most `max_batch` events.
///
/// A batch is flushed as soon as it is full, and a partial batch on every
/// timer tick. Empty batches are never flushed.
pub struct BatchAccumulator<T> {
    stream: &'static str,
    rx: mpsc::Receiver<T>,
    max_batch: usize,
    flush_every: Duration,
}

impl<T: Send + 'static> BatchAccumulator<T> {
    pub fn new(
        stream: &'static str,
        rx: mpsc::Receiver<T>,
        max_batch: usize,
        flush_every: Duration,
    ) -> Self {
        Self {
            stream,
            rx,
            max_batch: max_batch.max(1),
            flush_every: flush_every.max(Duration::from_millis(1)),
        }
    }

    pub async fn run<H>(self, handler: Arc<H>, token: CancellationToken) -> AccumulatorExit
    where
        H: BatchHandler<T> + ?Sized,
    {
        let Self {
            stream,
            mut rx,
            max_batch,
            flush_every,
        } = self;

        let mut buf: Vec<T> = Vec::with_capacity(max_batch);
        let mut ticker = interval_at(Instant::now() + flush_every, flush_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    if !buf.is_empty() {
                        warn!(stream, discarded = buf.len(), "dropping unflushed batch on shutdown");
                    }
                    return AccumulatorExit::Cancelled { discarded: buf.len() };
                }
                msg = rx.recv() => match msg {
                    Some(event) => {
                        buf.push(event);
                        if buf.len() >= max_batch {
                            flush(stream, &mut buf, max_batch, handler.as_ref()).await;
                        }
                    }
                    None => {
                        if !buf.is_empty() {
                            flush(stream, &mut buf, max_batch, handler.as_ref()).await;
                        }
                        debug!(stream, "input closed; accumulator stopped");
                        return AccumulatorExit::Closed;
                    }
                },
                _ = ticker.tick() => {
                    if !buf.is_empty() {
                        flush(stream, &mut buf, max_batch, handler.as_ref()).await;
                    }
                }
            }
        }
    }
}

async fn flush<T, H>(stream: &'static str, buf: &mut Vec<T>, max_batch: usize, handler: &H)
where
    H: BatchHandler<T> + ?Sized,
{
    let batch = std::mem::replace(buf, Vec::with_capacity(max_batch));
    let span = debug_span!("flush", stream, size = batch.len());
    handler.handle_batch(batch).instrument(span).await;
}
