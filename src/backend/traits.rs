use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ClientError;

/// A delivered HTTP reply. Status classification is the caller's job; the
/// transport only distinguishes delivered replies from transport failures.
#[derive(Debug, Clone)]
pub struct JobReply {
    pub status: u16,
    pub body: String,
}

impl JobReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Reply from the structured health endpoint.
#[derive(Debug, Clone)]
pub struct HealthReply {
    pub ok: bool,
    pub body: String,
}

/// A fetched artifact with the length the server declared up front, if any.
#[derive(Debug, Clone)]
pub struct ArtifactPayload {
    pub declared_len: Option<u64>,
    pub bytes: Bytes,
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Submit a plugin build job and wait for the full response body.
    async fn submit_job(&self, name: &str, prompt: &str) -> Result<JobReply, ClientError>;

    /// Fetch the built artifact for `name`. Non-success statuses are
    /// reported as `ClientError::Server`.
    async fn fetch_artifact(&self, name: &str) -> Result<ArtifactPayload, ClientError>;

    /// Forward one chat message about the generated plugin.
    async fn chat(&self, message: &str, plugin_name: &str) -> Result<JobReply, ClientError>;

    /// GET the structured health endpoint.
    async fn fetch_health(&self) -> Result<HealthReply, ClientError>;

    /// Capability probe against the job endpoint; returns the HTTP status of
    /// whatever answered.
    async fn probe_reachability(&self) -> Result<u16, ClientError>;
}
