//! Mock capabilities for testing.
//!
//! [`MockPortal`] implements all three capability traits with scripted
//! outcome queues and call recording, in the spirit of a fake remote job
//! portal. Clones share state, so a test can keep a handle while the client
//! owns another.
//!
//! Fetches can additionally be gated: [`MockPortal::hold_fetches`] makes
//! every status fetch block until [`MockPortal::release_fetch`] grants it a
//! permit, which lets tests pin a request in flight to exercise the
//! one-in-flight and cancellation guarantees.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::capabilities::{CaptchaSubmitter, JobCreator, StatusFetcher};
use crate::error::{CapabilityError, CapabilityResult};
use crate::types::{JobId, JobInput, JobPhase, JobSnapshot};

#[derive(Default)]
struct MockPortalInner {
    create_script: Mutex<VecDeque<CapabilityResult<JobId>>>,
    fetch_script: Mutex<VecDeque<CapabilityResult<JobSnapshot>>>,
    captcha_script: Mutex<VecDeque<CapabilityResult<()>>>,

    create_calls: Mutex<Vec<JobInput>>,
    fetch_calls: Mutex<Vec<JobId>>,
    captcha_calls: Mutex<Vec<(JobId, String)>>,

    fetches_started: AtomicUsize,
    fetches_settled: AtomicUsize,

    /// When set, fetches wait for one permit each before settling.
    fetch_gate: Mutex<Option<Arc<Semaphore>>>,
}

/// Scriptable fake of the remote job portal.
#[derive(Clone, Default)]
pub struct MockPortal {
    inner: Arc<MockPortalInner>,
}

impl MockPortal {
    pub fn new() -> Self {
        Self::default()
    }

    // -- scripting ----------------------------------------------------------

    /// Queue a successful creation returning `id`.
    pub fn push_create_ok(&self, id: impl Into<JobId>) {
        self.inner
            .create_script
            .lock()
            .unwrap()
            .push_back(Ok(id.into()));
    }

    /// Queue a rejected creation with the given diagnostic.
    pub fn push_create_err(&self, message: impl Into<String>) {
        self.inner
            .create_script
            .lock()
            .unwrap()
            .push_back(Err(CapabilityError::Rejected {
                status: 429,
                message: message.into(),
            }));
    }

    /// Queue a snapshot to be returned by the next unscripted fetch.
    pub fn push_snapshot(&self, snapshot: JobSnapshot) {
        self.inner
            .fetch_script
            .lock()
            .unwrap()
            .push_back(Ok(snapshot));
    }

    /// Queue a transient fetch failure.
    pub fn push_fetch_err(&self, message: impl Into<String>) {
        self.inner
            .fetch_script
            .lock()
            .unwrap()
            .push_back(Err(CapabilityError::transport(message.into())));
    }

    /// Queue a rejected captcha submission.
    pub fn push_captcha_err(&self, message: impl Into<String>) {
        self.inner
            .captcha_script
            .lock()
            .unwrap()
            .push_back(Err(CapabilityError::Rejected {
                status: 400,
                message: message.into(),
            }));
    }

    // -- gating -------------------------------------------------------------

    /// Make every subsequent fetch block until a permit is released.
    pub fn hold_fetches(&self) {
        *self.inner.fetch_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held fetch proceed.
    pub fn release_fetch(&self) {
        if let Some(gate) = self.inner.fetch_gate.lock().unwrap().as_ref() {
            gate.add_permits(1);
        }
    }

    /// Remove the gate; fetches settle immediately again.
    pub fn open_fetches(&self) {
        if let Some(gate) = self.inner.fetch_gate.lock().unwrap().take() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    // -- inspection ---------------------------------------------------------

    pub fn create_call_count(&self) -> usize {
        self.inner.create_calls.lock().unwrap().len()
    }

    pub fn fetch_call_count(&self) -> usize {
        self.inner.fetch_calls.lock().unwrap().len()
    }

    pub fn captcha_calls(&self) -> Vec<(JobId, String)> {
        self.inner.captcha_calls.lock().unwrap().clone()
    }

    /// Fetches issued but not yet settled (completed, failed or cancelled).
    pub fn fetches_in_flight(&self) -> usize {
        self.inner.fetches_started.load(Ordering::SeqCst)
            - self.inner.fetches_settled.load(Ordering::SeqCst)
    }

    fn settle_fetch(&self) {
        self.inner.fetches_settled.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobCreator for MockPortal {
    async fn create_job(
        &self,
        input: &JobInput,
        _cancel: CancellationToken,
    ) -> CapabilityResult<JobId> {
        self.inner.create_calls.lock().unwrap().push(input.clone());
        let scripted = self.inner.create_script.lock().unwrap().pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => {
                let n = self.create_call_count();
                Ok(JobId::new(format!("job-{n}")))
            }
        }
    }
}

#[async_trait]
impl StatusFetcher for MockPortal {
    async fn fetch_status(
        &self,
        id: &JobId,
        cancel: CancellationToken,
    ) -> CapabilityResult<JobSnapshot> {
        self.inner.fetch_calls.lock().unwrap().push(id.clone());
        self.inner.fetches_started.fetch_add(1, Ordering::SeqCst);

        let gate = self.inner.fetch_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.settle_fetch();
                    return Err(CapabilityError::Cancelled);
                }
                permit = gate.acquire() => {
                    // Gate is never closed while held by the mock.
                    permit.expect("fetch gate closed").forget();
                }
            }
        }

        self.settle_fetch();
        let scripted = self.inner.fetch_script.lock().unwrap().pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => Ok(JobSnapshot::new(id.clone(), JobPhase::Running)),
        }
    }
}

#[async_trait]
impl CaptchaSubmitter for MockPortal {
    async fn submit_captcha(
        &self,
        id: &JobId,
        solution: &str,
        _cancel: CancellationToken,
    ) -> CapabilityResult<()> {
        self.inner
            .captcha_calls
            .lock()
            .unwrap()
            .push((id.clone(), solution.to_string()));
        let scripted = self.inner.captcha_script.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(()))
    }
}
