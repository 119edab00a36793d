// Connection monitor — runs the tiered reachability probe and publishes the
// outcome through a watch channel. The monitor is the only writer of
// connection state; consumers subscribe or read the latest value.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::backend::traits::GenerationBackend;
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Checking,
    Connected,
    Disconnected,
    Error,
}

/// Last-known health document. The endpoint reports whatever it knows; every
/// field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendInfo {
    pub status: Option<String>,
    pub message: Option<String>,
    pub uptime: Option<f64>,
    pub version: Option<String>,
    pub environment: Option<String>,
    #[serde(default)]
    pub memory: MemoryInfo,
    #[serde(default)]
    pub system: SystemInfo,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryInfo {
    #[serde(rename = "heapUsed")]
    pub heap_used: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemInfo {
    pub platform: Option<String>,
    pub arch: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub message: String,
    pub snapshot: Option<BackendInfo>,
}

impl ConnectionState {
    fn checking() -> Self {
        Self {
            status: ConnectionStatus::Checking,
            message: "Checking backend connection...".to_string(),
            snapshot: None,
        }
    }
}

pub struct ConnectionMonitor {
    backend: Arc<dyn GenerationBackend>,
    tx: watch::Sender<ConnectionState>,
}

impl ConnectionMonitor {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::checking());
        Self { backend, tx }
    }

    /// Observe connection state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ConnectionState {
        self.tx.borrow().clone()
    }

    /// Run one full probe tier sequence and publish the outcome. Idempotent:
    /// probing leaves no state behind that changes the next probe's result.
    pub async fn probe(&self) -> ConnectionState {
        self.tx.send_replace(ConnectionState::checking());
        let state = self.classify().await;
        debug!(
            "probe finished status={:?} message={}",
            state.status, state.message
        );
        self.tx.send_replace(state.clone());
        state
    }

    /// Probe and additionally render a human-readable summary for the
    /// on-demand call site. Classification is shared with `probe`.
    pub async fn probe_report(&self) -> (ConnectionState, String) {
        let state = self.probe().await;
        let report = render_report(&state);
        (state, report)
    }

    async fn classify(&self) -> ConnectionState {
        // Tier 1: the structured health endpoint.
        match self.backend.fetch_health().await {
            Ok(reply) if reply.ok => {
                return match serde_json::from_str::<BackendInfo>(&reply.body) {
                    Ok(info) => ConnectionState {
                        status: ConnectionStatus::Connected,
                        message: "Backend connected and healthy".to_string(),
                        snapshot: Some(info),
                    },
                    Err(_) => ConnectionState {
                        status: ConnectionStatus::Connected,
                        message: "Backend connected (response format unexpected)".to_string(),
                        snapshot: None,
                    },
                };
            }
            Ok(_) => {
                warn!("health endpoint answered non-success");
            }
            Err(ClientError::Transport(e)) => {
                warn!("health probe failed in transit: {}", e);
            }
            Err(ClientError::Timeout { .. }) => {
                warn!("health probe timed out");
            }
            Err(e) => {
                // Not a fetch outcome: the probe machinery itself failed.
                return ConnectionState {
                    status: ConnectionStatus::Error,
                    message: format!("Connection test failed: {}", e),
                    snapshot: None,
                };
            }
        }

        // Tier 2: a capability probe against the job endpoint. Any answer,
        // including "method not allowed" or "not found", proves the server
        // is there.
        match self.backend.probe_reachability().await {
            Ok(status) if reachable_status(status) => ConnectionState {
                status: ConnectionStatus::Connected,
                message: "Backend reachable (health endpoint unavailable)".to_string(),
                snapshot: None,
            },
            Ok(status) => {
                warn!("capability probe answered status={}", status);
                ConnectionState {
                    status: ConnectionStatus::Disconnected,
                    message: "Cannot connect to backend server".to_string(),
                    snapshot: None,
                }
            }
            Err(ClientError::Transport(_)) | Err(ClientError::Timeout { .. }) => ConnectionState {
                status: ConnectionStatus::Disconnected,
                message: "Cannot connect to backend server".to_string(),
                snapshot: None,
            },
            Err(e) => ConnectionState {
                status: ConnectionStatus::Error,
                message: format!("Connection test failed: {}", e),
                snapshot: None,
            },
        }
    }
}

fn reachable_status(status: u16) -> bool {
    (200..300).contains(&status) || status == 404 || status == 405
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("unknown")
}

/// Multi-line summary of a probe outcome, one field per line.
fn render_report(state: &ConnectionState) -> String {
    let Some(info) = &state.snapshot else {
        return state.message.clone();
    };

    let uptime = info
        .uptime
        .map(|u| format!("{}s", u.round()))
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "Backend connection successful\n\
         status: {}\n\
         message: {}\n\
         uptime: {}\n\
         version: {}\n\
         environment: {}\n\
         heap used: {}\n\
         platform: {} ({})\n\
         timestamp: {}",
        field(&info.status),
        field(&info.message),
        uptime,
        field(&info.version),
        field(&info.environment),
        field(&info.memory.heap_used),
        field(&info.system.platform),
        field(&info.system.arch),
        field(&info.timestamp),
    )
}
