//! REST client for conversations and stored messages.
//!
//! Speaks the backend's `/api/v1/chats/` resource. Non-2xx responses come
//! back as `ChatError::Http` carrying the status and the response text.

use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder};
use serde::de::DeserializeOwned;

use chat_core::ports::ConversationPort;
use chat_types::{
    Result,
    config::ClientConfig,
    conversation::{ConversationDraft, ConversationRecord, MessageRecord, NewMessage},
};

use crate::http::{authorize, http_error, network_error};

pub struct RestConversationClient {
    config: ClientConfig,
}

impl RestConversationClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    fn url(&self, path: &str) -> String {
        self.config.endpoint(&format!("/api/v1{}", path))
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        authorize(builder, &self.config)
    }

    async fn execute<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let response = request.send().await.map_err(network_error)?;
        if !response.ok() {
            return Err(http_error(response).await);
        }
        response.json().await.map_err(network_error)
    }

    /// Like `execute`, for endpoints whose response body is irrelevant.
    async fn execute_empty(&self, request: Request) -> Result<()> {
        let response = request.send().await.map_err(network_error)?;
        if !response.ok() {
            return Err(http_error(response).await);
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl ConversationPort for RestConversationClient {
    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>> {
        let request = self
            .request(Request::get(&self.url("/chats/")))
            .build()
            .map_err(network_error)?;
        self.execute(request).await
    }

    async fn get_conversation(&self, id: &str) -> Result<ConversationRecord> {
        let request = self
            .request(Request::get(&self.url(&format!("/chats/{}", id))))
            .build()
            .map_err(network_error)?;
        self.execute(request).await
    }

    async fn create_conversation(&self, draft: &ConversationDraft) -> Result<ConversationRecord> {
        let request = self
            .request(Request::post(&self.url("/chats/")))
            .json(&creation_body(draft))
            .map_err(network_error)?;
        let record: ConversationRecord = self.execute(request).await?;
        log::info!("Created conversation {}", record.id);
        Ok(record)
    }

    async fn update_conversation(
        &self,
        id: &str,
        draft: &ConversationDraft,
    ) -> Result<ConversationRecord> {
        let request = self
            .request(Request::put(&self.url(&format!("/chats/{}", id))))
            .json(draft)
            .map_err(network_error)?;
        self.execute(request).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<()> {
        let request = self
            .request(Request::delete(&self.url(&format!("/chats/{}", id))))
            .build()
            .map_err(network_error)?;
        self.execute_empty(request).await?;
        log::info!("Deleted conversation {}", id);
        Ok(())
    }

    async fn fetch_messages(
        &self,
        conversation_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MessageRecord>> {
        let path = messages_path(conversation_id, limit, offset);
        let request = self
            .request(Request::get(&self.url(&path)))
            .build()
            .map_err(network_error)?;
        self.execute(request).await
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        message: &NewMessage,
    ) -> Result<MessageRecord> {
        let url = self.url(&format!("/chats/{}/messages", conversation_id));
        let request = self
            .request(Request::post(&url))
            .json(message)
            .map_err(network_error)?;
        self.execute(request).await
    }

    async fn clear_messages(&self, conversation_id: &str) -> Result<()> {
        let url = self.url(&format!("/chats/{}/messages", conversation_id));
        let request = self
            .request(Request::delete(&url))
            .build()
            .map_err(network_error)?;
        self.execute_empty(request).await
    }
}

/// Path of a message page. Zero values are left to the server's defaults.
pub fn messages_path(conversation_id: &str, limit: u32, offset: u32) -> String {
    let mut query = Vec::new();
    if limit > 0 {
        query.push(format!("limit={}", limit));
    }
    if offset > 0 {
        query.push(format!("offset={}", offset));
    }

    let base = format!("/chats/{}/messages", conversation_id);
    if query.is_empty() {
        base
    } else {
        format!("{}?{}", base, query.join("&"))
    }
}

/// Create requires a title; fill in the backend's defaults for what the
/// draft leaves open.
pub fn creation_body(draft: &ConversationDraft) -> ConversationDraft {
    ConversationDraft {
        title: Some(draft.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string())),
        model: draft.model.clone(),
        system_prompt: draft.system_prompt.clone(),
        temperature: Some(draft.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
        max_tokens: Some(draft.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
    }
}

const DEFAULT_TITLE: &str = "New Chat";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 2048;
