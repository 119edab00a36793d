// Top-level client facade — wires the generation session, artifact
// downloader, chat relay and connection monitor to one backend, and enforces
// the unlock and reset coupling between them.

use std::path::PathBuf;
use std::sync::Arc;

use crate::backend::http_backend::HttpBackend;
use crate::backend::traits::GenerationBackend;
use crate::config::EngineConfig;
use crate::engine::chat::{ChatMessage, ChatRelay};
use crate::engine::downloader::{ArtifactDownloader, DownloadSnapshot};
use crate::engine::session::{GenerationSession, SessionSnapshot, SessionStatus};
use crate::error::ClientError;
use crate::health::monitor::{ConnectionMonitor, ConnectionState};

pub struct ForgeClient {
    session: Arc<GenerationSession>,
    downloader: ArtifactDownloader,
    chat: ChatRelay,
    monitor: ConnectionMonitor,
}

impl ForgeClient {
    pub fn new(config: &EngineConfig) -> Result<Self, ClientError> {
        let backend: Arc<dyn GenerationBackend> =
            Arc::new(HttpBackend::new(&config.base_url, config.timings.clone())?);
        Ok(Self::with_backend(backend, config))
    }

    /// Build against any backend implementation. Tests script failures here.
    pub fn with_backend(backend: Arc<dyn GenerationBackend>, config: &EngineConfig) -> Self {
        Self {
            session: Arc::new(GenerationSession::new(
                Arc::clone(&backend),
                config.timings.clone(),
            )),
            downloader: ArtifactDownloader::new(
                Arc::clone(&backend),
                &config.download_dir,
                config.timings.clone(),
            ),
            chat: ChatRelay::new(Arc::clone(&backend)),
            monitor: ConnectionMonitor::new(backend),
        }
    }

    /// The silent startup probe. Consumers watch the monitor for the result.
    pub async fn start(&self) -> ConnectionState {
        self.monitor.probe().await
    }

    /// Submit a generation job. On success the downloader and chat unlock
    /// and the transcript is seeded with the greeting.
    pub async fn submit(&self, name: &str, prompt: &str) -> SessionSnapshot {
        let snapshot = self.session.submit(name, prompt).await;
        if snapshot.status == SessionStatus::Succeeded {
            self.chat.seed_greeting();
        }
        snapshot
    }

    /// Re-run the last failed submission.
    pub async fn retry(&self) -> SessionSnapshot {
        let snapshot = self.session.retry().await;
        if snapshot.status == SessionStatus::Succeeded {
            self.chat.seed_greeting();
        }
        snapshot
    }

    /// Discard the session, transcript and download state. No network call.
    pub fn reset(&self) {
        self.session.reset();
        self.downloader.reset();
        self.chat.clear();
    }

    /// Download the generated artifact. Requires a successful session; the
    /// check is local and costs no network traffic when it fails.
    pub async fn download(&self) -> Result<PathBuf, ClientError> {
        let snapshot = self.session.snapshot();
        if snapshot.status != SessionStatus::Succeeded {
            return Err(ClientError::Validation(
                "No plugin name available. Please generate a plugin first.".to_string(),
            ));
        }
        self.downloader.download(&snapshot.name).await
    }

    /// Send a chat message about the generated plugin. Requires a
    /// successful session.
    pub async fn send_chat(&self, text: &str) -> Result<(), ClientError> {
        let snapshot = self.session.snapshot();
        if snapshot.status != SessionStatus::Succeeded {
            return Err(ClientError::Validation(
                "No plugin name available. Please generate a plugin first.".to_string(),
            ));
        }
        self.chat.send(text, &snapshot.name).await;
        Ok(())
    }

    pub fn session_snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn download_snapshot(&self) -> DownloadSnapshot {
        self.downloader.snapshot()
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.chat.transcript()
    }

    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }
}
