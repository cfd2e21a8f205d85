//! Timer-driven polling scheduler.
//!
//! Owns the repeating status fetch for one tracked job. The loop is strictly
//! sequential: fetch, apply the snapshot, then either stop or sleep one
//! interval. Because the next fetch is only issued after the previous one
//! settles, at most one request is ever in flight and snapshots are applied
//! in the order their fetches were issued.
//!
//! Stop conditions:
//!
//! - terminal phase (`completed` / `failed`): stop permanently for this job
//! - `awaiting_verification`: stop until captcha resolution succeeds, at
//!   which point the client restarts the scheduler from scratch
//! - cancellation: stop immediately, dropping any in-flight fetch
//!
//! A failed fetch is transient: the phase is untouched, the diagnostic is
//! recorded next to the last good snapshot, and the loop retries on the next
//! interval. The fixed interval is the throttle; there is no extra backoff.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::capabilities::StatusFetcher;
use crate::error::CapabilityError;
use crate::types::{JobId, JobPhase, JobState};

/// Configuration for the polling scheduler.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between a settled fetch and the next one.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

impl PollConfig {
    /// Create a config with a specific poll interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }
}

/// Why the poll loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollExit {
    /// A terminal snapshot was observed; never poll this job again.
    Terminal,
    /// The job is paused on a captcha challenge.
    AwaitingVerification,
    /// The loop was cancelled.
    Cancelled,
}

/// Poll `job_id` until a stop condition is reached, publishing every applied
/// snapshot through `state_tx`.
pub(crate) async fn poll_job(
    fetcher: Arc<dyn StatusFetcher>,
    job_id: JobId,
    config: PollConfig,
    state_tx: watch::Sender<JobState>,
    cancel: CancellationToken,
) -> PollExit {
    loop {
        let fetched = tokio::select! {
            _ = cancel.cancelled() => return PollExit::Cancelled,
            res = fetcher.fetch_status(&job_id, cancel.child_token()) => res,
        };

        match fetched {
            Ok(snapshot) => {
                let phase = snapshot.phase;
                debug!(job_id = %job_id, phase = ?phase, "applied job snapshot");
                state_tx.send_modify(|state| {
                    state.fetch_error = None;
                    state.snapshot = Some(snapshot);
                });

                if phase.is_terminal() {
                    info!(job_id = %job_id, phase = ?phase, "job reached terminal phase");
                    return PollExit::Terminal;
                }
                if phase == JobPhase::AwaitingVerification {
                    info!(job_id = %job_id, "job awaiting captcha verification");
                    return PollExit::AwaitingVerification;
                }
            }
            Err(CapabilityError::Cancelled) => return PollExit::Cancelled,
            Err(err) => {
                // Transient: keep the last good snapshot, retry next tick.
                warn!(job_id = %job_id, error = %err, "status fetch failed, will retry");
                state_tx.send_modify(|state| state.fetch_error = Some(err.to_string()));
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return PollExit::Cancelled,
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}
