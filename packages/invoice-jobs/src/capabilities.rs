//! Capability traits the lifecycle client depends on.
//!
//! Each trait is one abstract remote operation. Implementations own the wire
//! shape (see the `portal-client` package for the HTTP one); the client only
//! sees typed inputs and outputs.
//!
//! # Contract
//!
//! - No internal retries: all retry policy lives in the polling scheduler,
//!   or with the caller for creation and captcha submission.
//! - Cooperative cancellation: every call receives a [`CancellationToken`];
//!   once it fires, the call settles with
//!   [`CapabilityError::Cancelled`](crate::error::CapabilityError::Cancelled)
//!   and must not deliver a late result.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::CapabilityResult;
use crate::types::{JobId, JobInput, JobSnapshot};

/// Submits initial input and obtains a job identifier. Called once per job.
#[async_trait]
pub trait JobCreator: Send + Sync {
    async fn create_job(
        &self,
        input: &JobInput,
        cancel: CancellationToken,
    ) -> CapabilityResult<JobId>;
}

/// Retrieves the current status snapshot for a job.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch_status(
        &self,
        id: &JobId,
        cancel: CancellationToken,
    ) -> CapabilityResult<JobSnapshot>;
}

/// Resolves a pending captcha challenge for a job.
#[async_trait]
pub trait CaptchaSubmitter: Send + Sync {
    async fn submit_captcha(
        &self,
        id: &JobId,
        solution: &str,
        cancel: CancellationToken,
    ) -> CapabilityResult<()>;
}
