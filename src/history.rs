//! Conversation history threading
//!
//! History travels inside the payload and is echoed back to the caller on
//! every turn; nothing is stored server-side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Most messages kept per conversation.
const MAX_HISTORY_MESSAGES: usize = 20;

/// Messages included when building agent prompts.
pub const PROMPT_HISTORY_WINDOW: usize = 6;

/// Who sent a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A single message in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    #[serde(default = "Uuid::new_v4")]
    pub message_id: Uuid,
    pub sender: Sender,
    pub message: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl HistoryMessage {
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            sender: Sender::User,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn bot(message: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            sender: Sender::Bot,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append a user/bot exchange and trim to the retention cap.
pub fn record_exchange(
    mut history: Vec<HistoryMessage>,
    user_message: &str,
    bot_message: &str,
) -> Vec<HistoryMessage> {
    history.push(HistoryMessage::user(user_message));
    history.push(HistoryMessage::bot(bot_message));

    if history.len() > MAX_HISTORY_MESSAGES {
        let excess = history.len() - MAX_HISTORY_MESSAGES;
        history.drain(..excess);
    }

    history
}

/// The most recent messages, oldest first, for prompt building.
pub fn recent_window(history: &[HistoryMessage], count: usize) -> &[HistoryMessage] {
    let start = history.len().saturating_sub(count);
    &history[start..]
}
