//! Job lifecycle client.
//!
//! The orchestrating state machine surfaced to callers. It composes the
//! three capability traits with the polling scheduler:
//!
//! ```text
//! JobClient
//!     │
//!     ├─► create(input) ──► JobCreator ──► spawn poll task
//!     │                                        │
//!     │                  StatusFetcher ◄───────┘ (one fetch at a time)
//!     │                        │
//!     ├─► state()/subscribe() ◄┘ snapshots published via watch channel
//!     │
//!     ├─► resolve_captcha(v) ──► stop polling ──► CaptchaSubmitter ──► resume
//!     └─► cancel() ──► abort in-flight fetch, unschedule polls
//! ```
//!
//! One job is tracked at a time; a new `create` abandons observation of the
//! previous job. All mutation of the tracked identifier and the poll task
//! goes through a single mutex, so `create`, `resolve_captcha` and `cancel`
//! are serialized against each other, and the sequential poll loop guarantees
//! at most one status fetch in flight.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::capabilities::{CaptchaSubmitter, JobCreator, StatusFetcher};
use crate::error::{CaptchaError, CreateError};
use crate::poller::{poll_job, PollConfig, PollExit};
use crate::types::{JobId, JobInput, JobPhase, JobSnapshot, JobState};

/// A running poll task and the token that stops it.
struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<PollExit>,
}

/// Mutable client internals, guarded by one lock.
struct Inner {
    job_id: Option<JobId>,
    poll: Option<PollHandle>,
}

/// Client for one remote extraction job at a time.
///
/// Instances are independent and share no state; wrap in an [`Arc`] to share
/// one across tasks. Dropping the client cancels any background polling.
pub struct JobClient {
    creator: Arc<dyn JobCreator>,
    fetcher: Arc<dyn StatusFetcher>,
    submitter: Arc<dyn CaptchaSubmitter>,
    config: PollConfig,
    /// Parent of every token handed to capability calls and poll tasks.
    root: CancellationToken,
    state_tx: watch::Sender<JobState>,
    inner: Mutex<Inner>,
}

impl JobClient {
    /// Create a client with the default poll interval.
    pub fn new(
        creator: Arc<dyn JobCreator>,
        fetcher: Arc<dyn StatusFetcher>,
        submitter: Arc<dyn CaptchaSubmitter>,
    ) -> Self {
        Self::with_config(creator, fetcher, submitter, PollConfig::default())
    }

    /// Create a client with a custom poll configuration.
    pub fn with_config(
        creator: Arc<dyn JobCreator>,
        fetcher: Arc<dyn StatusFetcher>,
        submitter: Arc<dyn CaptchaSubmitter>,
        config: PollConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(JobState::default());
        Self {
            creator,
            fetcher,
            submitter,
            config,
            root: CancellationToken::new(),
            state_tx,
            inner: Mutex::new(Inner {
                job_id: None,
                poll: None,
            }),
        }
    }

    /// Submit input for a new job and begin observing it.
    ///
    /// Any previously tracked job is abandoned first. On failure the tracked
    /// identifier is left unset, so retrying is simply calling `create`
    /// again.
    pub async fn create(&self, input: JobInput) -> Result<JobId, CreateError> {
        let mut inner = self.inner.lock().await;
        self.stop_poll(&mut inner).await;
        inner.job_id = None;
        self.state_tx.send_replace(JobState::default());

        let id = self
            .creator
            .create_job(&input, self.root.child_token())
            .await
            .map_err(CreateError)?;
        info!(job_id = %id, "job created");

        inner.job_id = Some(id.clone());
        self.state_tx.send_replace(JobState {
            job_id: Some(id.clone()),
            snapshot: Some(JobSnapshot::new(id.clone(), JobPhase::Created)),
            fetch_error: None,
        });
        self.start_poll(&mut inner, id.clone());
        Ok(id)
    }

    /// Resume observing an existing job by identifier, without recreating it.
    ///
    /// Used when the caller persisted the active job id across sessions. Any
    /// previously tracked job is abandoned.
    pub async fn attach(&self, id: JobId) {
        let mut inner = self.inner.lock().await;
        self.stop_poll(&mut inner).await;
        info!(job_id = %id, "attached to existing job");

        inner.job_id = Some(id.clone());
        self.state_tx.send_replace(JobState {
            job_id: Some(id.clone()),
            snapshot: None,
            fetch_error: None,
        });
        self.start_poll(&mut inner, id);
    }

    /// Submit a captcha solution for the tracked job.
    ///
    /// Valid only while the current phase is `awaiting_verification`;
    /// otherwise rejected without side effects. On success polling resumes
    /// exactly as if observation had just started. On failure the job stays
    /// paused and the caller resubmits a value.
    pub async fn resolve_captcha(&self, solution: &str) -> Result<(), CaptchaError> {
        let mut inner = self.inner.lock().await;
        if !self.state_tx.borrow().is_awaiting_verification() {
            return Err(CaptchaError::NotAwaitingVerification);
        }
        let id = inner
            .job_id
            .clone()
            .ok_or(CaptchaError::NotAwaitingVerification)?;

        // The submission must not race an in-flight status fetch.
        self.stop_poll(&mut inner).await;

        self.submitter
            .submit_captcha(&id, solution, self.root.child_token())
            .await?;
        info!(job_id = %id, "captcha accepted, resuming observation");

        self.start_poll(&mut inner, id);
        Ok(())
    }

    /// Stop observation: abort any in-flight fetch and unschedule future
    /// polls. The remote job is untouched and the last snapshot stays
    /// readable. Once this returns, no further state updates occur.
    pub async fn cancel(&self) {
        let mut inner = self.inner.lock().await;
        self.stop_poll(&mut inner).await;
        debug!(job_id = ?inner.job_id, "observation cancelled");
    }

    /// The tracked job identifier, if creation has succeeded.
    pub fn job_id(&self) -> Option<JobId> {
        self.state_tx.borrow().job_id.clone()
    }

    /// Snapshot of the current observable state.
    pub fn state(&self) -> JobState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to state updates as they are applied.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state_tx.subscribe()
    }

    fn start_poll(&self, inner: &mut Inner, id: JobId) {
        let cancel = self.root.child_token();
        let task = tokio::spawn(poll_job(
            Arc::clone(&self.fetcher),
            id,
            self.config.clone(),
            self.state_tx.clone(),
            cancel.clone(),
        ));
        inner.poll = Some(PollHandle { cancel, task });
    }

    /// Cancel the poll task and wait for it to settle, so no snapshot is
    /// applied after this returns.
    async fn stop_poll(&self, inner: &mut Inner) {
        if let Some(poll) = inner.poll.take() {
            poll.cancel.cancel();
            let _ = poll.task.await;
        }
    }
}

impl Drop for JobClient {
    fn drop(&mut self) {
        // Detach any still-running poll task.
        self.root.cancel();
    }
}
