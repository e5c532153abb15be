use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::feed::FeedError;
use crate::metrics::{Counters, bump};

/// Drains the error queue: every fault is logged and counted, and
/// disconnects also count as reconnects.
pub async fn run_fault_reporter(
    mut rx: mpsc::Receiver<FeedError>,
    counters: Counters,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            msg = rx.recv() => {
                let Some(fault) = msg else { break };
                bump(&counters.errors_total);
                if fault.is_disconnect() {
                    bump(&counters.reconnects);
                }
                error!(error = %fault, "feed fault");
            }
        }
    }
    debug!("fault reporter stopped");
}
