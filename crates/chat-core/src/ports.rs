//! Port traits: the hexagonal architecture boundary.
//!
//! These traits are defined here in `chat-core` (pure Rust).
//! Implementations live in `chat-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use async_trait::async_trait;
use chat_types::{
    Result,
    conversation::{ConversationDraft, ConversationRecord, MessageRecord, NewMessage},
    request::RequestBody,
};

// ─── Transport Port ──────────────────────────────────────────

/// One streamed-reply request as handed to the transport
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub conversation_id: String,
    pub body: RequestBody,
}

/// Pull-based source of response body bytes.
#[async_trait(?Send)]
pub trait ByteSource {
    /// Next chunk of the body, or `None` once the body has ended.
    async fn read(&mut self) -> Result<Option<Vec<u8>>>;

    /// Give the underlying stream back. Must be safe to call more than once.
    fn release(&mut self);
}

pub enum ResponseBody {
    /// Success: the body is consumed incrementally
    Stream(Box<dyn ByteSource>),
    /// Failure: the body was read in full for diagnostics
    Diagnostic(String),
}

pub struct StreamingResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl StreamingResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait(?Send)]
pub trait TransportPort {
    /// Issue the request and return once response headers are available.
    /// Connection-level failures come back as `Err`.
    async fn send(&self, request: &OutboundRequest) -> Result<StreamingResponse>;
}

// ─── Conversation Port ───────────────────────────────────────

/// CRUD collaborator for conversations and stored messages.
#[async_trait(?Send)]
pub trait ConversationPort {
    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>>;

    async fn get_conversation(&self, id: &str) -> Result<ConversationRecord>;

    async fn create_conversation(&self, draft: &ConversationDraft) -> Result<ConversationRecord>;

    async fn update_conversation(
        &self,
        id: &str,
        draft: &ConversationDraft,
    ) -> Result<ConversationRecord>;

    async fn delete_conversation(&self, id: &str) -> Result<()>;

    /// Newest-first page of stored messages
    async fn fetch_messages(
        &self,
        conversation_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MessageRecord>>;

    async fn append_message(
        &self,
        conversation_id: &str,
        message: &NewMessage,
    ) -> Result<MessageRecord>;

    async fn clear_messages(&self, conversation_id: &str) -> Result<()>;
}

// ─── Storage Port ────────────────────────────────────────────

#[async_trait(?Send)]
pub trait StoragePort {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a value
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a value
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}
