use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{GenerationSettings, Provider};
use crate::message::{ImageAttachment, Message, MessageId, Sender};

/// A conversation and its in-memory message log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    /// Always sorted by `sequence`
    pub messages: Vec<Message>,
    pub created_at: String,
    pub updated_at: String,
    /// Owned by the backend; read-only here
    pub settings: GenerationSettings,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            title: "New Chat".to_string(),
            messages: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
            settings: GenerationSettings::default(),
        }
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            updated_at: self.updated_at.clone(),
            message_count: self.messages.len(),
        }
    }
}

/// Summary of a conversation for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub updated_at: String,
    pub message_count: usize,
}

// ─── Backend records ─────────────────────────────────────────

/// A conversation as returned by `GET /api/v1/chats/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl ConversationRecord {
    /// Local conversation for this record, carrying over an existing message log.
    pub fn into_conversation(self, messages: Vec<Message>) -> Conversation {
        let settings = GenerationSettings {
            model: Some(self.model),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system_prompt: self.system_prompt,
            ..GenerationSettings::default()
        };
        Conversation {
            id: self.id.to_string(),
            title: self.title,
            messages,
            created_at: self.created_at,
            updated_at: self.updated_at,
            settings,
        }
    }
}

/// Fields accepted by create/update. `None` fields are left untouched on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A stored message as returned by `GET /api/v1/chats/{id}/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub sender: Sender,
    /// Usually a string; older rows may hold structured content
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub message_order: u64,
    #[serde(default)]
    pub api_provider: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<ImageAttachment>>,
    pub created_at: String,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        let text = match record.content {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => serde_json::to_string_pretty(&other).unwrap_or_default(),
        };
        let is_assistant = record.sender == Sender::Assistant;
        Message {
            id: MessageId::Server(record.id),
            sender: record.sender,
            text,
            sequence: record.message_order,
            created_at: record.created_at,
            attachments: record.images.unwrap_or_default(),
            is_streaming: false,
            is_error: false,
            provider: record
                .api_provider
                .as_deref()
                .and_then(Provider::from_wire)
                .filter(|_| is_assistant),
            model: record.model_name.filter(|_| is_assistant),
        }
    }
}

/// Body of `POST /api/v1/chats/{id}/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub sender: Sender,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

impl From<&Message> for NewMessage {
    fn from(msg: &Message) -> Self {
        Self {
            sender: msg.sender,
            content: msg.text.clone(),
            api_provider: msg.provider.map(|p| p.wire_name().to_string()),
            model_name: msg.model.clone(),
        }
    }
}
