//! Single-retry policy for transient provider failures.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::debug;

use crate::error::ProviderError;

/// Configuration: 2 total attempts, base 500ms, max 2s.
pub const MAX_ATTEMPTS: u32 = 2;
const INITIAL_INTERVAL_MILLIS: u64 = 500;
const MAX_INTERVAL_MILLIS: u64 = 2_000;

/// Run `attempt`, retrying once after a short backoff if it fails with a
/// transient error (connect failure, timeout, 5xx).
///
/// Non-transient errors and the error of the final attempt are returned
/// as-is.
pub async fn retry_transient<T, Fut, F>(mut attempt: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut backoff = ExponentialBackoff {
        initial_interval: Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        max_interval: Duration::from_millis(MAX_INTERVAL_MILLIS),
        max_elapsed_time: None,
        ..Default::default()
    };

    let mut attempts = 0;
    loop {
        attempts += 1;

        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempts < MAX_ATTEMPTS => {
                debug!("Attempt {attempts}/{MAX_ATTEMPTS} failed: {e}");
                if let Some(wait_duration) = backoff.next_backoff() {
                    debug!("Retrying in {}ms", wait_duration.as_millis());
                    tokio::time::sleep(wait_duration).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
}
