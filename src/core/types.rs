//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation history
///
/// Messages are append-only; the only mutation allowed is extending the
/// content of a message that is still accumulating stream chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub role: Role,
    pub content: String,
}

/// Append-only conversation history with monotonically increasing ids
#[derive(Debug, Default)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its id
    pub fn push(&mut self, role: Role, content: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id,
            role,
            content: content.into(),
        });
        id
    }

    /// Extend the content of an open streaming message
    ///
    /// Returns false if the id is unknown (the caller's buffer was stale).
    pub fn append_content(&mut self, id: u64, chunk: &str) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content.push_str(chunk);
                true
            }
            None => false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Most recent `n` messages, oldest first (context for AI fallbacks)
    pub fn recent(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// One canonical `YYYY-MM` aggregation unit in a time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub period: String,
    pub value: f64,
}

/// A record the normalizer could not confidently place
///
/// Preserved for inspection rather than silently dropped or merged into
/// a wrong bucket.
#[derive(Debug, Clone, Serialize)]
pub struct UnmappedEntry {
    /// The label exactly as the relay returned it
    pub raw: Value,
    /// Best-effort normalization output (empty if none)
    pub normalized: String,
    pub amount: f64,
    /// The full raw record the label came from
    pub original: Value,
}
