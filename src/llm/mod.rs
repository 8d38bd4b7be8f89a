//! LLM client seam
//!
//! Every specialist agent is a system prompt plus one completion call.
//! The trait keeps the orchestrator testable without network access.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::Result;

pub mod gemini;
pub use gemini::GeminiClient;

/// One completion: system prompt + input text → reply text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, input: &str) -> Result<String>;
}

/// Scripted client for tests and the offline demo. Replies are consumed
/// in order; once the script runs out, a neutral acknowledgement is
/// returned so multi-turn demos keep working.
pub struct MockLlm {
    replies: Mutex<VecDeque<String>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(reply.into());
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, _system_prompt: &str, _input: &str) -> Result<String> {
        let reply = self.replies.lock().unwrap().pop_front();
        Ok(reply.unwrap_or_else(|| {
            "Entendido. ¿Hay algo más en lo que pueda ayudarte?".to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_llm_consumes_script() {
        let llm = MockLlm::with_replies(["primera", "segunda"]);
        assert_eq!(llm.complete("sys", "in").await.unwrap(), "primera");
        assert_eq!(llm.complete("sys", "in").await.unwrap(), "segunda");
        // Script exhausted: neutral fallback.
        assert!(llm.complete("sys", "in").await.unwrap().contains("ayudarte"));
    }
}
