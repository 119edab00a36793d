// HTTP transport for the generation backend. Each operation carries its own
// abort budget; every failure is converted into a tagged error here, at the
// boundary, never re-parsed from message text downstream.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, Url};
use serde::Serialize;
use tracing::{debug, warn};

use super::traits::{ArtifactPayload, GenerationBackend, HealthReply, JobReply};
use crate::config::Timings;
use crate::error::ClientError;

const ARTIFACT_ACCEPT: &str = "application/octet-stream, application/java-archive, */*";

pub struct HttpBackend {
    client: Client,
    base_url: Url,
    timings: Timings,
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    name: &'a str,
    prompt: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(rename = "pluginName")]
    plugin_name: &'a str,
}

impl HttpBackend {
    pub fn new(base_url: &str, timings: Timings) -> Result<Self, ClientError> {
        // A base without a trailing slash would make Url::join replace the
        // last path segment instead of appending.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| ClientError::Validation(format!("invalid backend URL: {}", e)))?;

        Ok(Self {
            client: Client::new(),
            base_url,
            timings,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Validation(format!("invalid endpoint path: {}", e)))
    }

    /// Run `fut` under `budget`, mapping expiry to a timeout error.
    async fn bounded<T, F>(budget: Duration, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout { budget }),
        }
    }
}

fn transport(e: reqwest::Error) -> ClientError {
    ClientError::Transport(e.to_string())
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn submit_job(&self, name: &str, prompt: &str) -> Result<JobReply, ClientError> {
        let url = self.endpoint("create")?;
        let request = self.client.post(url).json(&CreateRequest { name, prompt });

        Self::bounded(self.timings.generate_timeout, async {
            let resp = request.send().await.map_err(transport)?;
            let status = resp.status().as_u16();
            let body = resp.text().await.map_err(transport)?;
            debug!("job submission answered status={}", status);
            Ok(JobReply { status, body })
        })
        .await
    }

    async fn fetch_artifact(&self, name: &str) -> Result<ArtifactPayload, ClientError> {
        let url = self.endpoint(&format!("create/download/{}", name))?;
        let request = self.client.get(url).header(ACCEPT, ARTIFACT_ACCEPT);

        Self::bounded(self.timings.download_timeout, async {
            let resp = request.send().await.map_err(transport)?;
            let status = resp.status();
            if !status.is_success() {
                warn!("artifact fetch failed status={}", status.as_u16());
                return Err(ClientError::Server {
                    status: status.as_u16(),
                    detail: None,
                });
            }

            let declared_len = resp.content_length();
            let bytes = resp.bytes().await.map_err(transport)?;
            debug!("artifact fetched bytes={}", bytes.len());
            Ok(ArtifactPayload {
                declared_len,
                bytes,
            })
        })
        .await
    }

    async fn chat(&self, message: &str, plugin_name: &str) -> Result<JobReply, ClientError> {
        let url = self.endpoint("create/chat")?;
        let resp = self
            .client
            .post(url)
            .json(&ChatRequest {
                message,
                plugin_name,
            })
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(transport)?;
        Ok(JobReply { status, body })
    }

    async fn fetch_health(&self) -> Result<HealthReply, ClientError> {
        let url = self.endpoint("health/detailed")?;
        let request = self.client.get(url);

        Self::bounded(self.timings.probe_timeout, async {
            let resp = request.send().await.map_err(transport)?;
            let ok = resp.status().is_success();
            let body = resp.text().await.map_err(transport)?;
            Ok(HealthReply { ok, body })
        })
        .await
    }

    async fn probe_reachability(&self) -> Result<u16, ClientError> {
        let url = self.endpoint("create")?;
        let request = self.client.request(Method::OPTIONS, url);

        Self::bounded(self.timings.probe_timeout, async {
            let resp = request.send().await.map_err(transport)?;
            Ok(resp.status().as_u16())
        })
        .await
    }
}
