//! Message module - role-tagged conversation entries exchanged with the generator

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Prompt sent by the pipeline
    User,

    /// Completion returned by the generator
    Assistant,
}

impl Role {
    /// Get the role name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{role, content}` record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message
    pub role: Role,

    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, append-only conversation history
///
/// There is deliberately no way to remove or reorder entries: a workflow run
/// only ever grows its history, and every correction round carries the full
/// prior exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory(Vec<ChatMessage>);

impl ConversationHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a message
    pub fn push(&mut self, message: ChatMessage) {
        self.0.push(message);
    }

    /// Append several messages in order
    pub fn extend(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.0.extend(messages);
    }

    /// Return a copy of this history with `message` appended
    pub fn with(&self, message: ChatMessage) -> Self {
        let mut next = self.clone();
        next.push(message);
        next
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the entries in order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.0
    }

    /// The most recent entry, if any
    pub fn last(&self) -> Option<&ChatMessage> {
        self.0.last()
    }
}

impl From<Vec<ChatMessage>> for ConversationHistory {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self(messages)
    }
}
