//! Typed errors for the job lifecycle client.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! A terminal `failed` phase reported by the remote side is not modeled here:
//! it is a normal snapshot outcome, delivered through observation, not an
//! error return.

use thiserror::Error;

/// Errors produced by the capability adapters (creation, status fetch,
/// captcha submission).
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The request never produced a usable response (connection, timeout,
    /// malformed body).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The remote side answered and refused the request.
    #[error("rejected by remote ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The call was aborted through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,
}

impl CapabilityError {
    /// Wrap any error source as a transport failure.
    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        CapabilityError::Transport(err.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CapabilityError::Cancelled)
    }
}

/// Job creation failed; the tracked job identifier stays unset, so the
/// caller retries by calling `create` again.
#[derive(Debug, Error)]
#[error("job creation failed: {0}")]
pub struct CreateError(#[from] pub CapabilityError);

/// Captcha resolution was rejected; the job stays in
/// `awaiting_verification` and the caller must resubmit a value.
#[derive(Debug, Error)]
pub enum CaptchaError {
    /// `resolve_captcha` was called while the job is not paused on a
    /// challenge. Rejected without side effects.
    #[error("job is not awaiting verification")]
    NotAwaitingVerification,

    /// The submission itself failed.
    #[error("captcha submission failed: {0}")]
    Submit(#[from] CapabilityError),
}

/// Result type alias for capability calls.
pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;
