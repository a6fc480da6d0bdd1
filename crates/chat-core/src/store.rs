//! Per-conversation message log.
//!
//! All mutation of a conversation's messages goes through this type so the
//! ordering invariant holds everywhere: a conversation's message list is
//! sorted by `sequence`, and `sequence` values are unique within it.

use std::collections::{HashMap, HashSet};

use chat_types::{
    ChatError, Result,
    config::Provider,
    conversation::{Conversation, ConversationRecord, ConversationSummary},
    message::{FinalizeMetadata, Message, MessageId, Sender},
};

#[derive(Debug, Default)]
pub struct MessageStore {
    conversations: HashMap<String, Conversation>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Conversations ───────────────────────────────────────

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    /// Messages of a conversation in display order. Empty when unknown.
    pub fn messages(&self, conversation_id: &str) -> &[Message] {
        self.conversations
            .get(conversation_id)
            .map(|c| c.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn find(&self, conversation_id: &str, message_id: &MessageId) -> Option<&Message> {
        self.messages(conversation_id)
            .iter()
            .find(|m| &m.id == message_id)
    }

    /// Insert or replace a conversation. An existing message log is kept when
    /// the incoming conversation carries none.
    pub fn upsert_conversation(&mut self, mut conversation: Conversation) {
        if conversation.messages.is_empty() {
            if let Some(existing) = self.conversations.remove(&conversation.id) {
                conversation.messages = existing.messages;
            }
        }
        sort_by_sequence(&mut conversation.messages);
        self.conversations.insert(conversation.id.clone(), conversation);
    }

    /// Replace the conversation set with the server's list, keeping the
    /// message logs already loaded for conversations that survive.
    pub fn sync_conversations(&mut self, records: Vec<ConversationRecord>) {
        let mut previous = std::mem::take(&mut self.conversations);
        for record in records {
            let messages = previous
                .remove(&record.id.to_string())
                .map(|c| c.messages)
                .unwrap_or_default();
            let conversation = record.into_conversation(messages);
            self.conversations.insert(conversation.id.clone(), conversation);
        }
    }

    pub fn remove_conversation(&mut self, id: &str) -> Option<Conversation> {
        self.conversations.remove(id)
    }

    pub fn clear_messages(&mut self, conversation_id: &str) {
        if let Some(conv) = self.conversations.get_mut(conversation_id) {
            conv.messages.clear();
        }
    }

    pub fn clear(&mut self) {
        self.conversations.clear();
    }

    /// Summaries, most recently updated first
    pub fn conversation_list(&self) -> Vec<ConversationSummary> {
        let mut list: Vec<&Conversation> = self.conversations.values().collect();
        list.sort_by(|a, b| {
            timestamp_key(&b.updated_at)
                .cmp(&timestamp_key(&a.updated_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        list.into_iter().map(Conversation::summary).collect()
    }

    /// Provider and model of the latest assistant reply that recorded both
    pub fn main_model(&self, conversation_id: &str) -> Option<(Provider, String)> {
        self.messages(conversation_id)
            .iter()
            .rev()
            .filter(|m| m.sender == Sender::Assistant)
            .find_map(|m| Some((m.provider?, m.model.clone()?)))
    }

    // ─── Ordering & reconciliation ───────────────────────────

    /// Append a locally created message ahead of server confirmation.
    ///
    /// The message gets `max(sequence) + 1` (1 for an empty conversation),
    /// whatever sequence it carried. Unknown conversations are created.
    pub fn append_optimistic(&mut self, conversation_id: &str, mut message: Message) -> &Message {
        let conv = self
            .conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| Conversation::new(conversation_id));

        let next = conv.messages.iter().map(|m| m.sequence).max().unwrap_or(0) + 1;
        message.sequence = next;
        conv.updated_at = chrono::Utc::now().to_rfc3339();

        // Highest sequence in the list, so appending keeps it sorted.
        let idx = conv.messages.len();
        conv.messages.push(message);
        &conv.messages[idx]
    }

    /// Concatenate a streamed fragment onto a message. Sequence is untouched.
    pub fn append_delta(
        &mut self,
        conversation_id: &str,
        message_id: &MessageId,
        delta: &str,
    ) -> Result<()> {
        let msg = self.message_mut(conversation_id, message_id)?;
        msg.text.push_str(delta);
        Ok(())
    }

    /// Set the authoritative final text and clear the streaming flag.
    pub fn finalize(
        &mut self,
        conversation_id: &str,
        message_id: &MessageId,
        full_text: &str,
        metadata: FinalizeMetadata,
    ) -> Result<()> {
        let msg = self.message_mut(conversation_id, message_id)?;
        msg.text = full_text.to_string();
        msg.is_streaming = false;
        msg.is_error = false;
        if metadata.provider.is_some() {
            msg.provider = metadata.provider;
        }
        if metadata.model.is_some() {
            msg.model = metadata.model;
        }
        Ok(())
    }

    /// The stream feeding a message failed: keep its partial text, flag it.
    pub fn mark_failed(&mut self, conversation_id: &str, message_id: &MessageId) -> Result<()> {
        let msg = self.message_mut(conversation_id, message_id)?;
        msg.is_streaming = false;
        msg.is_error = true;
        Ok(())
    }

    /// The stream was abandoned: keep whatever text arrived, no error flag.
    pub fn stop_streaming(&mut self, conversation_id: &str, message_id: &MessageId) -> Result<()> {
        let msg = self.message_mut(conversation_id, message_id)?;
        msg.is_streaming = false;
        Ok(())
    }

    /// Migrate a placeholder id to the id the server assigned.
    ///
    /// If the server's copy is already in the list (a reload won the race),
    /// the placeholder is dropped instead.
    pub fn confirm_id(
        &mut self,
        conversation_id: &str,
        local_id: &MessageId,
        server_id: MessageId,
    ) -> Result<()> {
        let conv = self.conversation_mut(conversation_id)?;
        let idx = conv
            .messages
            .iter()
            .position(|m| &m.id == local_id)
            .ok_or_else(|| ChatError::MessageNotFound(local_id.to_string()))?;

        if conv.messages.iter().any(|m| m.id == server_id) {
            conv.messages.remove(idx);
        } else {
            conv.messages[idx].id = server_id;
        }
        Ok(())
    }

    /// Merge the server's canonical list with local state.
    ///
    /// The result is every server message plus every local message the server
    /// does not know about, sorted by sequence. A local message is known to the
    /// server when the server list holds its id or its sequence.
    pub fn reconcile_with_server(&mut self, conversation_id: &str, server_messages: Vec<Message>) {
        let conv = self
            .conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| Conversation::new(conversation_id));

        let mut merged: Vec<Message> = Vec::with_capacity(server_messages.len());
        let mut server_ids = HashSet::new();
        let mut server_sequences = HashSet::new();
        for msg in server_messages {
            if server_ids.insert(msg.id.clone()) {
                server_sequences.insert(msg.sequence);
                merged.push(msg);
            }
        }

        let local = std::mem::take(&mut conv.messages);
        let kept_local = local
            .into_iter()
            .filter(|m| !server_ids.contains(&m.id) && !server_sequences.contains(&m.sequence));
        merged.extend(kept_local);

        sort_by_sequence(&mut merged);
        conv.messages = merged;
    }

    fn conversation_mut(&mut self, conversation_id: &str) -> Result<&mut Conversation> {
        self.conversations
            .get_mut(conversation_id)
            .ok_or_else(|| ChatError::ConversationNotFound(conversation_id.to_string()))
    }

    fn message_mut(&mut self, conversation_id: &str, message_id: &MessageId) -> Result<&mut Message> {
        self.conversation_mut(conversation_id)?
            .messages
            .iter_mut()
            .find(|m| &m.id == message_id)
            .ok_or_else(|| ChatError::MessageNotFound(message_id.to_string()))
    }
}

/// Stable: equal sequences keep insertion order.
fn sort_by_sequence(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.sequence);
}

/// Sort key for RFC 3339 timestamps; unparsable values sort oldest.
fn timestamp_key(ts: &str) -> i64 {
    chrono::DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(i64::MIN)
}
