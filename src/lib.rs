// Client-side orchestration engine for an AI plugin generation backend.

use std::sync::Once;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod backend;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;

pub use client::ForgeClient;
pub use config::EngineConfig;
pub use error::ClientError;

static INIT_TRACING: Once = Once::new();

/// Initialize tracing for the host application. Safe to call more than once.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();

        info!("forge client tracing initialized");
    });
}
