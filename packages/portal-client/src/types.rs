//! Wire types for the portal REST API.
//!
//! The portal speaks camelCase JSON, except the captcha challenge whose
//! fields are capitalized. Job status strings map onto
//! [`JobPhase`](invoice_jobs::JobPhase); the wire calls the verification
//! pause `waiting_captcha`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invoice_jobs::{CaptchaChallenge, JobId, JobPhase, JobSnapshot};

use crate::error::PortalError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateJobRequest<'a> {
    pub access_key: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateJobResponse {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitCaptchaRequest<'a> {
    pub solution: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CaptchaResponse {
    #[serde(rename = "ID")]
    pub id: String,
    /// Base64-encoded image bytes.
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "ContentType")]
    pub content_type: Option<String>,
    #[serde(rename = "Metadata")]
    pub metadata: Option<HashMap<String, String>>,
}

impl From<CaptchaResponse> for CaptchaChallenge {
    fn from(c: CaptchaResponse) -> Self {
        CaptchaChallenge {
            id: c.id,
            image: c.image,
            content_type: c.content_type.filter(|ct| !ct.is_empty()),
            metadata: c.metadata.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobResponse {
    pub id: String,
    pub status: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub captcha: Option<CaptchaResponse>,
}

impl JobResponse {
    /// Map the wire job onto a snapshot, enforcing that the payload matches
    /// the reported status.
    pub(crate) fn into_snapshot(self) -> Result<JobSnapshot, PortalError> {
        let id = JobId::new(self.id);
        let snapshot = match self.status.as_str() {
            "created" => JobSnapshot::new(id, JobPhase::Created),
            "running" => JobSnapshot::new(id, JobPhase::Running),
            "waiting_captcha" => {
                let captcha = self.captcha.ok_or_else(|| {
                    PortalError::Decode("waiting_captcha job without a challenge".into())
                })?;
                JobSnapshot::awaiting_verification(id, captcha.into())
            }
            "completed" => {
                let result = self.result.ok_or_else(|| {
                    PortalError::Decode("completed job without a result".into())
                })?;
                JobSnapshot::completed(id, result)
            }
            "failed" => JobSnapshot::failed(id, self.error.unwrap_or_default()),
            other => {
                return Err(PortalError::Decode(format!("unknown job status: {other}")));
            }
        };
        Ok(snapshot.with_created_at(self.created_at))
    }
}
