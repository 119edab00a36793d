// Chat relay — append-only transcript with optimistic sends. Failures become
// assistant entries; nothing here raises to the caller.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::backend::traits::GenerationBackend;

const GREETING: &str =
    "Your plugin has been generated! How can I help you understand how it works?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

pub struct ChatRelay {
    backend: Arc<dyn GenerationBackend>,
    transcript: Mutex<Vec<ChatMessage>>,
}

impl ChatRelay {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            transcript: Mutex::new(Vec::new()),
        }
    }

    /// Reset the transcript to the single post-generation greeting.
    pub fn seed_greeting(&self) {
        let mut transcript = self.transcript.lock();
        transcript.clear();
        transcript.push(ChatMessage {
            role: ChatRole::Assistant,
            text: GREETING.to_string(),
        });
    }

    pub fn clear(&self) {
        self.transcript.lock().clear();
    }

    /// Insertion order is the display order.
    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.lock().clone()
    }

    /// Forward one message. Empty or whitespace-only text is dropped locally
    /// with no network call. The user entry is appended before the request
    /// goes out; the assistant entry carries either the raw reply or a
    /// formatted error string.
    pub async fn send(&self, text: &str, plugin_name: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        self.push(ChatRole::User, text.to_string());

        let reply = match self.backend.chat(text, plugin_name).await {
            Ok(reply) if reply.is_success() => reply.body,
            Ok(reply) => {
                warn!("chat request rejected status={}", reply.status);
                format!("Error: Chat error: {}", reply.status)
            }
            Err(e) => {
                warn!("chat request failed: {}", e);
                format!("Error: {}", e)
            }
        };

        self.push(ChatRole::Assistant, reply);
    }

    fn push(&self, role: ChatRole, text: String) {
        debug!("transcript append role={:?} len={}", role, text.len());
        self.transcript.lock().push(ChatMessage { role, text });
    }
}
