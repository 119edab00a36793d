// Error taxonomy — every collaborator failure is tagged at the boundary
// where it occurs, so retry decisions dispatch on the variant.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected before any network traffic.
    #[error("{0}")]
    Validation(String),

    /// Network-level failure: connection refused, reset, DNS.
    #[error("connection failed: {0}")]
    Transport(String),

    /// An abort budget elapsed before the backend replied.
    #[error("timed out after {budget:?}")]
    Timeout { budget: Duration },

    /// The backend answered with a non-success HTTP status.
    #[error("server error: {status}")]
    Server { status: u16, detail: Option<String> },

    /// The artifact arrived with no payload.
    #[error("downloaded file is empty")]
    EmptyArtifact,

    /// Local filesystem failure while saving an artifact.
    #[error("failed to save artifact: {0}")]
    Save(#[from] std::io::Error),
}

impl ClientError {
    /// Whether the bounded download retry policy may re-attempt after this
    /// failure. An elapsed abort budget is a hard stop.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
