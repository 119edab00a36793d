// Generation session state machine — one plugin build from submission to a
// terminal success or failure. Displayed stages advance on their own
// schedule; only the network outcome decides the terminal status.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::traits::{GenerationBackend, JobReply};
use crate::config::Timings;
use crate::error::ClientError;

pub const STAGE_IDLE: u8 = 0;
pub const STAGE_INIT: u8 = 1;
pub const STAGE_ANALYSIS: u8 = 2;
pub const STAGE_CODEGEN: u8 = 3;
pub const STAGE_BUILD: u8 = 4;
pub const STAGE_COMPLETE: u8 = 5;

const SUCCESS_MARKERS: [&str; 3] = ["Maven build successful", "Artifact:", "successfully"];
const FAILURE_MARKERS: [&str; 3] = ["Error:", "failed", "BUILD FAILURE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Generating,
    Succeeded,
    Failed,
}

/// Point-in-time view of the session, safe to hand to observers.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub name: String,
    pub prompt: String,
    pub stage: u8,
    pub status: SessionStatus,
    pub raw_response: String,
    pub error_detail: String,
}

struct SessionState {
    name: String,
    prompt: String,
    stage: u8,
    status: SessionStatus,
    raw_response: String,
    error_detail: String,
    timer_token: CancellationToken,
}

impl SessionState {
    fn idle() -> Self {
        Self {
            name: String::new(),
            prompt: String::new(),
            stage: STAGE_IDLE,
            status: SessionStatus::Idle,
            raw_response: String::new(),
            error_detail: String::new(),
            timer_token: CancellationToken::new(),
        }
    }

    fn begin(&mut self, name: String, prompt: String) {
        self.timer_token.cancel();
        self.timer_token = CancellationToken::new();
        self.name = name;
        self.prompt = prompt;
        self.stage = STAGE_INIT;
        self.status = SessionStatus::Generating;
        self.raw_response.clear();
        self.error_detail.clear();
    }

    fn fail(&mut self, detail: String) {
        self.timer_token.cancel();
        self.status = SessionStatus::Failed;
        self.error_detail = detail;
    }
}

pub struct GenerationSession {
    backend: Arc<dyn GenerationBackend>,
    timings: Timings,
    state: Mutex<SessionState>,
}

impl GenerationSession {
    pub fn new(backend: Arc<dyn GenerationBackend>, timings: Timings) -> Self {
        Self {
            backend,
            timings,
            state: Mutex::new(SessionState::idle()),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        snapshot_of(&self.state.lock())
    }

    /// Submit one generation job and drive it to a terminal status. The
    /// trailing stage animation may still be running when this returns.
    pub async fn submit(self: &Arc<Self>, name: &str, prompt: &str) -> SessionSnapshot {
        let name = name.trim().to_string();
        let prompt = prompt.trim().to_string();

        {
            let mut st = self.state.lock();
            if st.status == SessionStatus::Generating {
                // At most one active submission; callers disable the trigger.
                warn!("submit ignored: a generation is already in flight");
                return snapshot_of(&st);
            }

            if name.is_empty() || prompt.is_empty() {
                st.begin(name, prompt);
                st.fail("Please provide both plugin name and description.".to_string());
                return snapshot_of(&st);
            }
            if !is_valid_plugin_name(&name) {
                st.begin(name, prompt);
                st.fail(
                    "Plugin name must contain only letters, numbers, and underscores.".to_string(),
                );
                return snapshot_of(&st);
            }

            st.begin(name.clone(), prompt.clone());
        }

        info!("generation started name={}", name);
        self.spawn_stage_timer(self.timings.stage_analysis_delay, STAGE_ANALYSIS);
        self.spawn_stage_timer(self.timings.stage_codegen_delay, STAGE_CODEGEN);

        let outcome = self.backend.submit_job(&name, &prompt).await;
        self.finish(outcome);
        self.snapshot()
    }

    /// Clear the error state and resubmit the last name/prompt after a short
    /// pause, so observers see a discrete transition.
    pub async fn retry(self: &Arc<Self>) -> SessionSnapshot {
        let (name, prompt) = {
            let mut st = self.state.lock();
            if st.status != SessionStatus::Failed {
                return snapshot_of(&st);
            }
            let pair = (st.name.clone(), st.prompt.clone());
            *st = SessionState::idle();
            pair
        };

        tokio::time::sleep(self.timings.resubmit_delay).await;
        self.submit(&name, &prompt).await
    }

    /// Discard the session entirely. No network call.
    pub fn reset(&self) {
        let mut st = self.state.lock();
        st.timer_token.cancel();
        *st = SessionState::idle();
        debug!("session reset");
    }

    fn finish(self: &Arc<Self>, outcome: Result<JobReply, ClientError>) {
        match outcome {
            Ok(reply) if reply.is_success() => {
                let succeeded = classify_body(&reply.body);
                let mut st = self.state.lock();
                st.raw_response = reply.body;
                if succeeded {
                    st.status = SessionStatus::Succeeded;
                    info!("generation succeeded name={}", st.name);
                    drop(st);
                    self.spawn_completion_timers();
                } else {
                    warn!("generation reported a build failure name={}", st.name);
                    st.fail("Build failed. Please check the response for details.".to_string());
                }
            }
            Ok(reply) => {
                let detail = server_error_message(reply.status, &reply.body);
                warn!("generation failed status={}", reply.status);
                let mut st = self.state.lock();
                st.raw_response = reply.body;
                st.fail(detail);
            }
            Err(ClientError::Timeout { .. }) => {
                warn!("generation request timed out");
                self.state.lock().fail(
                    "Plugin generation timed out after 10 minutes. This may happen with \
                     complex plugins. Please try again or simplify your request."
                        .to_string(),
                );
            }
            Err(ClientError::Transport(e)) => {
                warn!("generation request failed in transit: {}", e);
                self.state.lock().fail(
                    "Connection lost to backend server. The server may have restarted or \
                     become unavailable during the long generation process."
                        .to_string(),
                );
            }
            Err(e) => {
                warn!("generation request failed: {}", e);
                self.state.lock().fail(e.to_string());
            }
        }
    }

    /// Advance the displayed stage once `delay` elapses, unless the session
    /// has already left the generating state or the timers were cancelled.
    fn spawn_stage_timer(self: &Arc<Self>, delay: Duration, stage: u8) {
        let token = self.state.lock().timer_token.clone();
        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => session.advance_stage(stage),
            }
        });
    }

    /// The trailing build/complete animation after a successful response.
    fn spawn_completion_timers(self: &Arc<Self>) {
        let token = self.state.lock().timer_token.clone();
        let session = Arc::clone(self);
        let build_delay = self.timings.stage_build_delay;
        let complete_delay = self.timings.stage_complete_delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(build_delay) => session.advance_stage(STAGE_BUILD),
            }
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(complete_delay) => session.advance_stage(STAGE_COMPLETE),
            }
        });
    }

    fn advance_stage(&self, stage: u8) {
        let mut st = self.state.lock();
        let allowed = if stage <= STAGE_CODEGEN {
            st.status == SessionStatus::Generating
        } else {
            st.status == SessionStatus::Succeeded
        };
        // Monotonic: a late timer must never roll the display back.
        if allowed && stage > st.stage {
            st.stage = stage;
            debug!("stage advanced to {} ({})", stage, stage_label(stage));
        }
    }
}

fn snapshot_of(st: &SessionState) -> SessionSnapshot {
    SessionSnapshot {
        name: st.name.clone(),
        prompt: st.prompt.clone(),
        stage: st.stage,
        status: st.status,
        raw_response: st.raw_response.clone(),
        error_detail: st.error_detail.clone(),
    }
}

pub fn is_valid_plugin_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Display label for a stage, as shown by the process list.
pub fn stage_label(stage: u8) -> &'static str {
    match stage {
        STAGE_INIT => "Initialize",
        STAGE_ANALYSIS => "AI Analysis",
        STAGE_CODEGEN => "Code Generation",
        STAGE_BUILD => "Build & Compile",
        STAGE_COMPLETE => "Complete",
        _ => "Not started",
    }
}

/// Scan a successful response body for build outcome markers. Success
/// markers win; with neither set present the body counts as a success, a
/// lenient default kept from the observed backend behavior.
fn classify_body(body: &str) -> bool {
    if SUCCESS_MARKERS.iter().any(|m| body.contains(m)) {
        return true;
    }
    if FAILURE_MARKERS.iter().any(|m| body.contains(m)) {
        return false;
    }
    true
}

/// Build the user-facing message for a non-success submission status,
/// enriched by the body when it is plain text rather than an HTML error page.
fn server_error_message(status: u16, body: &str) -> String {
    let mut msg = match status {
        502 | 503 => {
            "Backend server is not available. Please check if the server is running.".to_string()
        }
        500 => "Internal server error occurred. Please try again.".to_string(),
        _ => format!("Backend server error: {}", status),
    };

    let body = body.trim();
    if !body.is_empty() && !body.contains("<!DOCTYPE html>") {
        if body.contains("Error:") {
            msg = body.to_string();
        } else {
            msg = format!("{}: {}", msg, body);
        }
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_plugin_names() {
        assert!(is_valid_plugin_name("Economy_Plugin"));
        assert!(is_valid_plugin_name("plugin42"));
        assert!(!is_valid_plugin_name("bad name!"));
        assert!(!is_valid_plugin_name("shop-plugin"));
        assert!(!is_valid_plugin_name(""));
    }

    #[test]
    fn test_classify_success_markers() {
        assert!(classify_body("Maven build successful\nArtifact: target/a.jar"));
        assert!(classify_body("Plugin created successfully"));
    }

    #[test]
    fn test_classify_failure_markers() {
        assert!(!classify_body("BUILD FAILURE\n[ERROR] compilation problem"));
        assert!(!classify_body("Error: something broke"));
        assert!(!classify_body("the build failed"));
    }

    #[test]
    fn test_classify_success_markers_win_over_failure_markers() {
        assert!(classify_body("Maven build successful despite 2 failed tests"));
    }

    // The unmarked-body default is deliberately lenient: a body with neither
    // marker set (e.g. truncated output) counts as a success. Preserved as
    // observed, not fixed.
    #[test]
    fn test_classify_unmarked_body_is_success() {
        assert!(classify_body("plugin ready"));
        assert!(classify_body(""));
    }

    #[test]
    fn test_server_error_message_by_status() {
        assert_eq!(
            server_error_message(503, ""),
            "Backend server is not available. Please check if the server is running."
        );
        assert_eq!(
            server_error_message(500, ""),
            "Internal server error occurred. Please try again."
        );
        assert_eq!(server_error_message(418, ""), "Backend server error: 418");
    }

    #[test]
    fn test_server_error_message_body_enrichment() {
        // A plain-text body is appended.
        assert_eq!(
            server_error_message(400, "missing prompt"),
            "Backend server error: 400: missing prompt"
        );
        // A body that already carries an error line replaces the message.
        assert_eq!(
            server_error_message(400, "Error: bad prompt"),
            "Error: bad prompt"
        );
        // An HTML error page is ignored.
        assert_eq!(
            server_error_message(502, "<!DOCTYPE html><html>Bad Gateway</html>"),
            "Backend server is not available. Please check if the server is running."
        );
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(stage_label(STAGE_INIT), "Initialize");
        assert_eq!(stage_label(STAGE_COMPLETE), "Complete");
        assert_eq!(stage_label(STAGE_IDLE), "Not started");
    }
}
