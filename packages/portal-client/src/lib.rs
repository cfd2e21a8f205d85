//! HTTP adapter for the invoice-job portal API.
//!
//! Implements the three capability traits from `invoice-jobs` over the
//! portal's REST surface:
//!
//! - `POST /invoice-jobs` — submit an access key, get a job id
//! - `GET /invoice-jobs/{id}` — current job snapshot
//! - `POST /invoice-jobs/{id}/captcha` — submit a captcha solution
//!
//! The adapter owns the wire shape and does nothing else: no retries (retry
//! policy lives in the polling scheduler) and no deadline beyond the HTTP
//! client timeout. Every call races its cancellation token, so an aborted
//! request settles as `Cancelled` without delivering a late result.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use invoice_jobs::{JobClient, JobInput};
//! use portal_client::PortalClient;
//!
//! let portal = Arc::new(PortalClient::new("http://localhost:8080/api")?);
//! let client = JobClient::new(portal.clone(), portal.clone(), portal);
//! client.create(JobInput::new(access_key)).await?;
//! ```

pub mod error;
mod types;

pub use error::{PortalError, Result};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use invoice_jobs::{
    CapabilityError, CapabilityResult, CaptchaSubmitter, JobCreator, JobId, JobInput, JobSnapshot,
    StatusFetcher,
};

use types::{CreateJobRequest, CreateJobResponse, JobResponse, SubmitCaptchaRequest};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the portal's invoice-job REST API.
pub struct PortalClient {
    client: Client,
    base_url: String,
}

impl PortalClient {
    /// Create a client against the given API base URL
    /// (e.g. `http://localhost:8080/api`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create with a pre-configured `reqwest` client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    async fn create_job_inner(&self, input: &JobInput) -> Result<JobId> {
        let url = format!("{}/invoice-jobs", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CreateJobRequest {
                access_key: &input.access_key,
            })
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: CreateJobResponse = response.json().await?;
        debug!(job_id = %body.job_id, "portal accepted job");
        Ok(JobId::new(body.job_id))
    }

    async fn fetch_status_inner(&self, id: &JobId) -> Result<JobSnapshot> {
        let url = format!("{}/invoice-jobs/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;
        let response = check_status(response).await?;

        let body: JobResponse = response.json().await?;
        body.into_snapshot()
    }

    async fn submit_captcha_inner(&self, id: &JobId, solution: &str) -> Result<()> {
        let url = format!("{}/invoice-jobs/{}/captcha", self.base_url, id);
        let response = self
            .client
            .post(&url)
            .json(&SubmitCaptchaRequest { solution })
            .send()
            .await?;
        check_status(response).await?;
        debug!(job_id = %id, "portal accepted captcha solution");
        Ok(())
    }
}

/// Turn a non-success response into an API error carrying the body as
/// diagnostic.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(PortalError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl JobCreator for PortalClient {
    async fn create_job(
        &self,
        input: &JobInput,
        cancel: CancellationToken,
    ) -> CapabilityResult<JobId> {
        tokio::select! {
            _ = cancel.cancelled() => Err(CapabilityError::Cancelled),
            res = self.create_job_inner(input) => res.map_err(Into::into),
        }
    }
}

#[async_trait]
impl StatusFetcher for PortalClient {
    async fn fetch_status(
        &self,
        id: &JobId,
        cancel: CancellationToken,
    ) -> CapabilityResult<JobSnapshot> {
        tokio::select! {
            _ = cancel.cancelled() => Err(CapabilityError::Cancelled),
            res = self.fetch_status_inner(id) => res.map_err(Into::into),
        }
    }
}

#[async_trait]
impl CaptchaSubmitter for PortalClient {
    async fn submit_captcha(
        &self,
        id: &JobId,
        solution: &str,
        cancel: CancellationToken,
    ) -> CapabilityResult<()> {
        tokio::select! {
            _ = cancel.cancelled() => Err(CapabilityError::Cancelled),
            res = self.submit_captcha_inner(id, solution) => res.map_err(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = PortalClient::with_client(Client::new(), "http://localhost:8080/api/");
        assert_eq!(client.base_url, "http://localhost:8080/api");
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let client = PortalClient::with_client(Client::new(), "http://localhost:1");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client
            .fetch_status(&JobId::new("j1"), cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
