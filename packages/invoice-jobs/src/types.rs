//! Core job model types.
//!
//! A job is a remote unit of work identified by a [`JobId`]. Its progress is
//! observed through [`JobSnapshot`]s: each snapshot fully replaces the
//! previous one, there is no partial merge. The client publishes a
//! [`JobState`] that pairs the latest snapshot with auxiliary observation
//! state (the tracked id and the last transient fetch error).

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier for a remote extraction job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a raw identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle phase of a job.
///
/// `Created`, `Running` and `AwaitingVerification` are non-terminal;
/// `Completed` and `Failed` are terminal and never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Created,
    Running,
    AwaitingVerification,
    Completed,
    Failed,
}

impl JobPhase {
    /// True for phases from which no further transition occurs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }

    /// True while the remote side is still working (no input needed).
    pub fn is_processing(&self) -> bool {
        matches!(self, JobPhase::Created | JobPhase::Running)
    }
}

/// Input submitted when creating a job.
///
/// The client performs no validation; well-formedness is the caller's
/// responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    /// Invoice access key to extract.
    pub access_key: String,
}

impl JobInput {
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
        }
    }
}

/// A captcha challenge the caller must resolve before the job can proceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaChallenge {
    /// Challenge identifier assigned by the remote side.
    pub id: String,

    /// Base64-encoded challenge image.
    pub image: String,

    /// MIME type of the image, if known.
    pub content_type: Option<String>,

    /// Challenge-specific metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CaptchaChallenge {
    pub fn new(id: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image: image.into(),
            content_type: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// An immutable, complete description of a job at one point in time.
///
/// `result`, `error` and `challenge` are mutually exclusive; the constructors
/// below are the only way payloads are attached, so a snapshot can never
/// carry more than one of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub phase: JobPhase,

    /// Success payload, present only when `phase` is `Completed`. Opaque to
    /// the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Diagnostic, present only when `phase` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Pending challenge, present only when `phase` is `AwaitingVerification`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<CaptchaChallenge>,

    /// When the remote side created the job.
    pub created_at: DateTime<Utc>,
}

impl JobSnapshot {
    /// A payload-free snapshot in the given phase.
    pub fn new(id: JobId, phase: JobPhase) -> Self {
        Self {
            id,
            phase,
            result: None,
            error: None,
            challenge: None,
            created_at: Utc::now(),
        }
    }

    /// Terminal success snapshot carrying the extraction result.
    pub fn completed(id: JobId, result: serde_json::Value) -> Self {
        Self {
            result: Some(result),
            ..Self::new(id, JobPhase::Completed)
        }
    }

    /// Terminal failure snapshot carrying the remote diagnostic.
    pub fn failed(id: JobId, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(id, JobPhase::Failed)
        }
    }

    /// Snapshot paused on a captcha challenge.
    pub fn awaiting_verification(id: JobId, challenge: CaptchaChallenge) -> Self {
        Self {
            challenge: Some(challenge),
            ..Self::new(id, JobPhase::AwaitingVerification)
        }
    }

    /// Override the creation timestamp (used by adapters that know it).
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Observable state published by the lifecycle client.
///
/// The derived flags are pure projections of the snapshot phase, computed on
/// access so they can never diverge from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobState {
    /// The tracked job identifier, set once creation succeeds.
    pub job_id: Option<JobId>,

    /// Latest snapshot applied, if any fetch has succeeded yet.
    pub snapshot: Option<JobSnapshot>,

    /// Diagnostic from the most recent failed status fetch. Auxiliary only:
    /// a failed fetch never replaces the last good snapshot.
    pub fetch_error: Option<String>,
}

impl JobState {
    /// Current phase, if a snapshot has been observed.
    pub fn phase(&self) -> Option<JobPhase> {
        self.snapshot.as_ref().map(|s| s.phase)
    }

    /// Job is still being worked on remotely (`created` or `running`).
    pub fn is_processing(&self) -> bool {
        self.phase().is_some_and(|p| p.is_processing())
    }

    /// Job is paused on a captcha challenge.
    pub fn is_awaiting_verification(&self) -> bool {
        self.phase() == Some(JobPhase::AwaitingVerification)
    }

    /// Job finished with a result.
    pub fn is_completed(&self) -> bool {
        self.phase() == Some(JobPhase::Completed)
    }

    /// Job finished with a failure.
    pub fn is_failed(&self) -> bool {
        self.phase() == Some(JobPhase::Failed)
    }

    /// Success payload of a completed job.
    pub fn result(&self) -> Option<&serde_json::Value> {
        self.snapshot.as_ref().and_then(|s| s.result.as_ref())
    }

    /// Diagnostic of a failed job.
    pub fn error(&self) -> Option<&str> {
        self.snapshot.as_ref().and_then(|s| s.error.as_deref())
    }

    /// Pending captcha challenge, if any.
    pub fn challenge(&self) -> Option<&CaptchaChallenge> {
        self.snapshot.as_ref().and_then(|s| s.challenge.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_phase_classification() {
        assert!(JobPhase::Created.is_processing());
        assert!(JobPhase::Running.is_processing());
        assert!(!JobPhase::AwaitingVerification.is_processing());
        assert!(!JobPhase::Completed.is_processing());

        assert!(JobPhase::Completed.is_terminal());
        assert!(JobPhase::Failed.is_terminal());
        assert!(!JobPhase::AwaitingVerification.is_terminal());
    }

    #[test]
    fn test_snapshot_payloads_are_exclusive() {
        let id = JobId::new("job-1");

        let done = JobSnapshot::completed(id.clone(), json!({"total": 42}));
        assert!(done.result.is_some());
        assert!(done.error.is_none() && done.challenge.is_none());

        let failed = JobSnapshot::failed(id.clone(), "portal unreachable");
        assert!(failed.error.is_some());
        assert!(failed.result.is_none() && failed.challenge.is_none());

        let waiting =
            JobSnapshot::awaiting_verification(id, CaptchaChallenge::new("c-1", "aGVsbG8="));
        assert!(waiting.challenge.is_some());
        assert!(waiting.result.is_none() && waiting.error.is_none());
    }

    #[test]
    fn test_state_flags_follow_phase() {
        let mut state = JobState::default();
        assert!(!state.is_processing() && !state.is_completed());

        let id = JobId::new("job-1");
        state.job_id = Some(id.clone());
        state.snapshot = Some(JobSnapshot::new(id.clone(), JobPhase::Running));
        assert!(state.is_processing());

        state.snapshot = Some(JobSnapshot::completed(id, json!("done")));
        assert!(state.is_completed());
        assert!(!state.is_processing());
        assert_eq!(state.result(), Some(&json!("done")));
    }

    #[test]
    fn test_phase_serde_names() {
        let phase: JobPhase = serde_json::from_str("\"awaiting_verification\"").unwrap();
        assert_eq!(phase, JobPhase::AwaitingVerification);
        assert_eq!(
            serde_json::to_string(&JobPhase::Running).unwrap(),
            "\"running\""
        );
    }
}
