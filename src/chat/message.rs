use crate::api::{ChatReply, Source};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shown in place of the answer when a chat request fails.
pub const FALLBACK_REPLY: &str =
    "Sorry, there was an error processing your request. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub sources: Vec<Source>,
    pub error: bool,
}

impl Message {
    pub fn user(content: &str, at: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
            timestamp: at,
            sources: Vec::new(),
            error: false,
        }
    }

    pub fn answer(reply: ChatReply) -> Self {
        let timestamp = DateTime::from_timestamp_millis(reply.timestamp).unwrap_or_else(Utc::now);
        Self {
            role: Role::Assistant,
            content: reply.message,
            timestamp,
            sources: reply.sources.unwrap_or_default(),
            error: false,
        }
    }

    pub fn failure(at: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            content: FALLBACK_REPLY.to_string(),
            timestamp: at,
            sources: Vec::new(),
            error: true,
        }
    }
}

/// Append-only message history for one conversation.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    messages: Vec<Message>,
}

impl Timeline {
    /// Append a message and return its index. Timestamps never go backwards:
    /// one earlier than the previous entry is raised to match it.
    pub fn push(&mut self, mut message: Message) -> usize {
        if let Some(last) = self.messages.last() {
            if message.timestamp < last.timestamp {
                message.timestamp = last.timestamp;
            }
        }
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }
}
