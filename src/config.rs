use std::time::Duration;

use serde::Deserialize;

/// Maximum wait for a plugin generation request (10 minutes).
pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(600);

/// Abort budget for a single artifact download attempt.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Budget for each reachability probe tier.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of artifact download attempts.
pub const DOWNLOAD_MAX_ATTEMPTS: u32 = 3;

/// Pause between retryable download attempts.
pub const DOWNLOAD_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Pause before a retried generation resubmits.
pub const RESUBMIT_DELAY: Duration = Duration::from_millis(500);

/// Delay from submission until the displayed stage advances to AI analysis.
pub const STAGE_ANALYSIS_DELAY: Duration = Duration::from_secs(2);

/// Delay from submission until the displayed stage advances to code generation.
pub const STAGE_CODEGEN_DELAY: Duration = Duration::from_secs(4);

/// Delay from response arrival until the displayed stage advances to build.
pub const STAGE_BUILD_DELAY: Duration = Duration::from_secs(1);

/// Final delay before the displayed stage advances to complete.
pub const STAGE_COMPLETE_DELAY: Duration = Duration::from_millis(500);

/// Top-level configuration for the client engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the generation backend.
    pub base_url: String,
    /// Directory where downloaded artifacts are saved.
    pub download_dir: String,
    /// Timing profile. Not read from config files; tests shrink it.
    #[serde(skip)]
    pub timings: Timings,
}

impl EngineConfig {
    pub fn new(base_url: impl Into<String>, download_dir: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            download_dir: download_dir.into(),
            timings: Timings::default(),
        }
    }
}

/// Every timeout and delay the engine observes, in one place.
#[derive(Debug, Clone)]
pub struct Timings {
    pub generate_timeout: Duration,
    pub download_timeout: Duration,
    pub probe_timeout: Duration,
    pub download_retry_delay: Duration,
    pub resubmit_delay: Duration,
    pub stage_analysis_delay: Duration,
    pub stage_codegen_delay: Duration,
    pub stage_build_delay: Duration,
    pub stage_complete_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            generate_timeout: GENERATE_TIMEOUT,
            download_timeout: DOWNLOAD_TIMEOUT,
            probe_timeout: PROBE_TIMEOUT,
            download_retry_delay: DOWNLOAD_RETRY_DELAY,
            resubmit_delay: RESUBMIT_DELAY,
            stage_analysis_delay: STAGE_ANALYSIS_DELAY,
            stage_codegen_delay: STAGE_CODEGEN_DELAY,
            stage_build_delay: STAGE_BUILD_DELAY,
            stage_complete_delay: STAGE_COMPLETE_DELAY,
        }
    }
}
