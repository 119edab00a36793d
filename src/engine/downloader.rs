// Artifact downloader — bounded sequential retry around the backend fetch,
// with an integrity check before anything touches disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::backend::traits::GenerationBackend;
use crate::config::{Timings, DOWNLOAD_MAX_ATTEMPTS};
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

/// Point-in-time view of the download task.
#[derive(Debug, Clone)]
pub struct DownloadSnapshot {
    pub state: DownloadState,
    pub attempt: u32,
}

struct TaskState {
    state: DownloadState,
    attempt: u32,
}

pub struct ArtifactDownloader {
    backend: Arc<dyn GenerationBackend>,
    download_dir: PathBuf,
    timings: Timings,
    task: Mutex<TaskState>,
}

impl ArtifactDownloader {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        download_dir: impl AsRef<Path>,
        timings: Timings,
    ) -> Self {
        Self {
            backend,
            download_dir: download_dir.as_ref().to_path_buf(),
            timings,
            task: Mutex::new(TaskState {
                state: DownloadState::Idle,
                attempt: 0,
            }),
        }
    }

    pub fn snapshot(&self) -> DownloadSnapshot {
        let task = self.task.lock();
        DownloadSnapshot {
            state: task.state,
            attempt: task.attempt,
        }
    }

    pub fn reset(&self) {
        let mut task = self.task.lock();
        task.state = DownloadState::Idle;
        task.attempt = 0;
    }

    /// Retrieve the artifact for `name` and save it as `{name}.jar` under
    /// the download directory. Attempts are strictly sequential: each retry
    /// waits for the previous attempt's full resolution. On terminal failure
    /// the last attempt's error is returned.
    pub async fn download(&self, name: &str) -> Result<PathBuf, ClientError> {
        {
            let mut task = self.task.lock();
            task.state = DownloadState::InFlight;
            task.attempt = 0;
        }

        let result = self.run_attempts(name).await;

        let mut task = self.task.lock();
        task.state = match result {
            Ok(_) => DownloadState::Succeeded,
            Err(_) => DownloadState::Failed,
        };
        result
    }

    async fn run_attempts(&self, name: &str) -> Result<PathBuf, ClientError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.task.lock().attempt = attempt;
            debug!("download attempt {} for plugin {}", attempt, name);

            match self.attempt_once(name).await {
                Ok(path) => {
                    info!(
                        "download completed name={} path={}",
                        name,
                        path.display()
                    );
                    return Ok(path);
                }
                Err(e) if attempt < DOWNLOAD_MAX_ATTEMPTS && e.is_retryable() => {
                    warn!(
                        "download attempt {} failed, retrying in {:?}: {}",
                        attempt, self.timings.download_retry_delay, e
                    );
                    tokio::time::sleep(self.timings.download_retry_delay).await;
                }
                Err(e) => {
                    warn!("download failed after {} attempt(s): {}", attempt, e);
                    return Err(e);
                }
            }
        }
    }

    async fn attempt_once(&self, name: &str) -> Result<PathBuf, ClientError> {
        let payload = self.backend.fetch_artifact(name).await?;

        // A declared zero length and an actually-empty transfer are both
        // integrity failures, never retried.
        if payload.declared_len == Some(0) || payload.bytes.is_empty() {
            return Err(ClientError::EmptyArtifact);
        }

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self.download_dir.join(format!("{}.jar", name));
        tokio::fs::write(&path, &payload.bytes).await?;
        debug!(
            "artifact saved path={} bytes={}",
            path.display(),
            payload.bytes.len()
        );
        Ok(path)
    }
}
