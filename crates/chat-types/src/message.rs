use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Provider;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    /// The backend stores assistant replies with sender `ai`.
    #[serde(alias = "ai")]
    Assistant,
}

/// Identity of a message within a conversation.
///
/// Optimistic messages start with a `Local` placeholder and migrate to the
/// `Server` id once the backend has stored them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Server(i64),
    Local(String),
}

impl MessageId {
    /// Fresh placeholder id for a message that only exists locally.
    pub fn local() -> Self {
        MessageId::Local(uuid::Uuid::new_v4().to_string())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, MessageId::Local(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Server(id) => write!(f, "{}", id),
            MessageId::Local(id) => write!(f, "local:{}", id),
        }
    }
}

/// An image attached to a user message, as supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// Base64 payload
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ImageAttachment {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn has_payload(&self) -> bool {
        !self.data.trim().is_empty()
    }
}

/// A single entry in a conversation's message log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    /// Total order within the conversation; display order follows it.
    pub sequence: u64,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<ImageAttachment>,
    /// True while a stream is still appending to `text`
    #[serde(default)]
    pub is_streaming: bool,
    /// Set when the stream feeding this message failed
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text.into())
    }

    /// Empty assistant message that a stream will fill in.
    pub fn assistant_placeholder() -> Self {
        let mut msg = Self::new(Sender::Assistant, String::new());
        msg.is_streaming = true;
        msg
    }

    pub fn with_attachments(mut self, attachments: Vec<ImageAttachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    fn new(sender: Sender, text: String) -> Self {
        Self {
            id: MessageId::local(),
            sender,
            text,
            sequence: 0,
            created_at: chrono::Utc::now().to_rfc3339(),
            attachments: Vec::new(),
            is_streaming: false,
            is_error: false,
            provider: None,
            model: None,
        }
    }
}

/// Extra data recorded on an assistant message when its stream completes
#[derive(Debug, Clone, Default)]
pub struct FinalizeMetadata {
    pub provider: Option<Provider>,
    pub model: Option<String>,
}
