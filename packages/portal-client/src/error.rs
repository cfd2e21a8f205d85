//! Typed errors for the portal HTTP adapter.

use invoice_jobs::CapabilityError;
use thiserror::Error;

/// Errors from talking to the portal API.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Request failed at the HTTP layer (connection, timeout, TLS).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The portal answered with a non-success status.
    #[error("portal API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The portal answered 2xx but the body was not what we expect.
    #[error("unexpected portal response: {0}")]
    Decode(String),
}

impl From<PortalError> for CapabilityError {
    fn from(err: PortalError) -> Self {
        match err {
            PortalError::Http(e) => CapabilityError::Transport(Box::new(e)),
            PortalError::Api { status, message } => CapabilityError::Rejected { status, message },
            PortalError::Decode(message) => CapabilityError::transport(message),
        }
    }
}

/// Result type alias for portal operations.
pub type Result<T> = std::result::Result<T, PortalError>;
