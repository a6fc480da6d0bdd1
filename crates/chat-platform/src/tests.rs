#[cfg(test)]
mod tests {
    use crate::rest::{creation_body, messages_path};
    use crate::storage::MemoryStorage;
    use crate::transport::HttpTransport;
    use chat_core::ports::StoragePort;
    use chat_types::config::ClientConfig;
    use chat_types::conversation::ConversationDraft;
    use futures::executor::block_on;

    // ─── Endpoint Tests ──────────────────────────────────────

    #[test]
    fn test_stream_url() {
        let transport = HttpTransport::new(ClientConfig::new("https://chat.example.com/"));
        assert_eq!(
            transport.stream_url("12"),
            "https://chat.example.com/api/v1/ai/chat/12"
        );
    }

    #[test]
    fn test_messages_path_query() {
        assert_eq!(messages_path("4", 20, 0), "/chats/4/messages?limit=20");
        assert_eq!(messages_path("4", 20, 40), "/chats/4/messages?limit=20&offset=40");
        assert_eq!(messages_path("4", 0, 0), "/chats/4/messages");
    }

    #[test]
    fn test_creation_body_defaults() {
        let body = creation_body(&ConversationDraft::default());
        assert_eq!(body.title.as_deref(), Some("New Chat"));
        assert_eq!(body.temperature, Some(0.7));
        assert_eq!(body.max_tokens, Some(2048));
        assert!(body.model.is_none());

        let draft = ConversationDraft {
            title: Some("Trip".into()),
            max_tokens: Some(512),
            ..Default::default()
        };
        let body = creation_body(&draft);
        assert_eq!(body.title.as_deref(), Some("Trip"));
        assert_eq!(body.max_tokens, Some(512));
    }

    // ─── MemoryStorage Tests ─────────────────────────────────

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());
        block_on(storage.set("chat:active_conversation", b"7")).unwrap();
        assert_eq!(
            block_on(storage.get("chat:active_conversation")).unwrap(),
            Some(b"7".to_vec())
        );
        assert!(block_on(storage.exists("chat:active_conversation")).unwrap());

        block_on(storage.delete("chat:active_conversation")).unwrap();
        assert!(block_on(storage.get("chat:active_conversation")).unwrap().is_none());
        assert_eq!(storage.len(), 0);
        assert_eq!(storage.backend_name(), "memory");
    }
}
