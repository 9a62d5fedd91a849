use crate::Message;
use serde::{Deserialize, Serialize};

/// A single entry in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Conversation history for one workflow-building session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationSession {
    pub messages: Vec<ChatEntry>,
}

const DEFAULT_WINDOW_SIZE: usize = 5;

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: String) {
        self.messages.push(ChatEntry {
            role: ChatRole::User,
            content,
            timestamp: now_epoch_ms(),
        });
    }

    pub fn push_assistant(&mut self, content: String) {
        self.messages.push(ChatEntry {
            role: ChatRole::Assistant,
            content,
            timestamp: now_epoch_ms(),
        });
    }

    /// Messages in the recent window (last N exchanges).
    pub fn recent_window(&self, window_size: Option<usize>) -> &[ChatEntry] {
        let n = window_size.unwrap_or(DEFAULT_WINDOW_SIZE) * 2;
        let len = self.messages.len();
        if len <= n {
            &self.messages[..]
        } else {
            &self.messages[len - n..]
        }
    }

    /// The recent window as chat-completion messages.
    pub fn context_messages(&self, window_size: Option<usize>) -> Vec<Message> {
        self.recent_window(window_size)
            .iter()
            .map(|entry| match entry.role {
                ChatRole::User => Message::user(&entry.content),
                ChatRole::Assistant => Message::assistant(&entry.content),
            })
            .collect()
    }
}

fn now_epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
