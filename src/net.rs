use std::io;

use tokio::time::{sleep, Duration};
use tracing::warn;

/// Largest UDP payload, so a datagram is never cut short on receive.
pub(crate) const MAX_DATAGRAM_SIZE: usize = 65_507;

pub(crate) const RECV_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Reports a failed receive and pauses before the listener tries again.
pub(crate) async fn recv_failed(listener: &str, err: &io::Error) {
    warn!("[{listener}] receive failed ({err}), retrying...");
    sleep(RECV_RETRY_DELAY).await;
}
