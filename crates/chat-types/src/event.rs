use serde::{Deserialize, Serialize};

use crate::error::StreamError;
use crate::message::MessageId;

/// Semantic events of one streaming session, in arrival order.
///
/// A well-formed session is `Start`, zero or more `Chunk`, then exactly one
/// of `End` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamEvent {
    Start,
    Chunk { delta: String },
    End { full_text: String },
    Error { message: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::End { .. } | StreamEvent::Error { .. })
    }
}

/// Events published by the chat controller.
/// The UI drains these to repaint without polling the store.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// User message and assistant placeholder were appended
    ReplyStarted {
        conversation_id: String,
        user_message: MessageId,
        assistant_message: MessageId,
    },

    /// Assistant text grew
    ReplyDelta {
        conversation_id: String,
        message_id: MessageId,
        delta: String,
    },

    /// Stream completed and the message holds its final text
    ReplyComplete {
        conversation_id: String,
        message_id: MessageId,
    },

    /// Stream failed; the message keeps its partial text
    ReplyFailed {
        conversation_id: String,
        message_id: MessageId,
        error: StreamError,
    },

    /// Stream was cancelled by the caller
    ReplyCancelled {
        conversation_id: String,
        message_id: MessageId,
    },

    /// Message list was replaced by the server's copy
    Reloaded { conversation_id: String },
}

impl ChatEvent {
    pub fn conversation_id(&self) -> &str {
        match self {
            ChatEvent::ReplyStarted { conversation_id, .. }
            | ChatEvent::ReplyDelta { conversation_id, .. }
            | ChatEvent::ReplyComplete { conversation_id, .. }
            | ChatEvent::ReplyFailed { conversation_id, .. }
            | ChatEvent::ReplyCancelled { conversation_id, .. }
            | ChatEvent::Reloaded { conversation_id } => conversation_id,
        }
    }
}
