//! Polling Driver
//!
//! Fetches an interpretation on a fixed interval until it is done, the time
//! budget runs out, or the caller cancels. Requests never overlap: the next
//! sleep starts only after the previous fetch returned.

use crate::fetcher::{require_found, InterpretationSource};
use crate::{ClientError, Result};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use webtarot_common::config::PollingConfig;
use webtarot_common::InterpretationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Wait between the end of one fetch and the start of the next
    pub interval: Duration,
    /// Budget measured from the start of polling
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        PollOptions::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollOptions {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            timeout: config.timeout(),
        }
    }
}

/// Poll until `done`
///
/// Returns the first done result (success or failure text alike). Fails with
/// `Timeout` carrying the last pending result once the budget is spent,
/// `NotFound` when the backend does not know the id, `Cancelled` as soon as
/// `cancel` fires, or the first fetch error.
#[instrument(skip(source, options, cancel))]
pub async fn poll_interpretation<S>(
    source: &S,
    id: &str,
    options: &PollOptions,
    cancel: &CancellationToken,
) -> Result<InterpretationResult>
where
    S: InterpretationSource + ?Sized,
{
    let start = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            result = source.fetch(id) => require_found(id, result?)?,
        };

        let elapsed = start.elapsed();
        debug!(
            attempt,
            elapsed_ms = elapsed.as_millis() as u64,
            done = result.done,
            "Polled interpretation"
        );

        if result.done {
            return Ok(result);
        }
        if elapsed >= options.timeout {
            return Err(ClientError::Timeout {
                last: Box::new(result),
                elapsed,
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            _ = tokio::time::sleep(options.interval) => {}
        }
    }
}
