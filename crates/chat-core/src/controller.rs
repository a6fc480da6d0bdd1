//! Chat controller: the caller layer around the streaming core.
//!
//! Owns the message store and the ports, and enforces the rules the session
//! itself does not arbitrate:
//! 1. At most one active stream per conversation
//! 2. The user message and an assistant placeholder appear before the request goes out
//! 3. Stream output reaches the store only through its append/finalize operations
//! 4. The active-stream registration is removed on every exit path

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use chat_types::{
    ChatError, Result,
    conversation::ConversationDraft,
    error::StreamError,
    event::ChatEvent,
    message::{FinalizeMetadata, Message, MessageId},
    request::StreamRequest,
};

use crate::event_bus::EventBus;
use crate::ports::{ConversationPort, StoragePort, TransportPort};
use crate::session::{CancelHandle, SessionOutcome, StreamHandler, StreamSession};
use crate::store::MessageStore;

/// Storage key of the selected conversation id
pub const ACTIVE_CONVERSATION_KEY: &str = "chat:active_conversation";

/// Size of the message page fetched on reload
pub const RELOAD_PAGE_SIZE: u32 = 20;

pub struct ChatController {
    store: Rc<RefCell<MessageStore>>,
    event_bus: EventBus,
    transport: Rc<dyn TransportPort>,
    conversations: Rc<dyn ConversationPort>,
    storage: Rc<dyn StoragePort>,
    active_streams: Rc<RefCell<HashMap<String, CancelHandle>>>,
    active_conversation: RefCell<Option<String>>,
}

impl ChatController {
    pub fn new(
        transport: Rc<dyn TransportPort>,
        conversations: Rc<dyn ConversationPort>,
        storage: Rc<dyn StoragePort>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store: Rc::new(RefCell::new(MessageStore::new())),
            event_bus,
            transport,
            conversations,
            storage,
            active_streams: Rc::new(RefCell::new(HashMap::new())),
            active_conversation: RefCell::new(None),
        }
    }

    pub fn store(&self) -> Ref<'_, MessageStore> {
        self.store.borrow()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn is_streaming(&self, conversation_id: &str) -> bool {
        self.active_streams.borrow().contains_key(conversation_id)
    }

    // ─── Streaming ───────────────────────────────────────────

    /// Send a user message and stream the assistant's reply into the store.
    ///
    /// Must be spawned via `wasm_bindgen_futures::spawn_local` in the browser.
    /// Fails up front with `StreamActive` if the conversation is already
    /// streaming; stream failures are reported through the outcome and the
    /// event bus, not as `Err`.
    pub async fn send_message(&self, request: StreamRequest) -> Result<SessionOutcome> {
        let conversation_id = request.conversation_id.clone();
        let session = StreamSession::new(self.transport.as_ref());
        let _registration = self.register(&conversation_id, session.cancel_handle())?;

        let (user_id, assistant_id) = {
            let mut store = self.store.borrow_mut();
            let user = Message::user(request.message.clone()).with_attachments(request.images.clone());
            let user_id = store.append_optimistic(&conversation_id, user).id.clone();
            let assistant_id = store
                .append_optimistic(&conversation_id, Message::assistant_placeholder())
                .id
                .clone();
            (user_id, assistant_id)
        };
        self.event_bus.emit(ChatEvent::ReplyStarted {
            conversation_id: conversation_id.clone(),
            user_message: user_id,
            assistant_message: assistant_id.clone(),
        });

        let mut handler = StoreHandler {
            store: self.store.clone(),
            event_bus: self.event_bus.clone(),
            conversation_id: conversation_id.clone(),
            message_id: assistant_id.clone(),
            metadata: FinalizeMetadata {
                provider: Some(request.settings.provider),
                model: request.settings.model.clone(),
            },
        };
        let outcome = session.run(&request, &mut handler).await;

        if outcome == SessionOutcome::Cancelled {
            if let Err(e) = self
                .store
                .borrow_mut()
                .stop_streaming(&conversation_id, &assistant_id)
            {
                log::warn!("Cancelled reply vanished from the store: {}", e);
            }
            self.event_bus.emit(ChatEvent::ReplyCancelled {
                conversation_id,
                message_id: assistant_id,
            });
        }
        Ok(outcome)
    }

    /// Cancel the conversation's active stream. Returns false if none is active.
    pub fn cancel(&self, conversation_id: &str) -> bool {
        match self.active_streams.borrow().get(conversation_id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    fn register(&self, conversation_id: &str, handle: CancelHandle) -> Result<Registration> {
        let mut active = self.active_streams.borrow_mut();
        if active.contains_key(conversation_id) {
            return Err(ChatError::StreamActive(conversation_id.to_string()));
        }
        active.insert(conversation_id.to_string(), handle);
        Ok(Registration {
            active: self.active_streams.clone(),
            conversation_id: conversation_id.to_string(),
        })
    }

    // ─── Conversations ───────────────────────────────────────

    /// Load the conversation list, restore the selected conversation and its
    /// latest messages.
    pub async fn initialize(&self) -> Result<()> {
        self.load_conversations().await?;
        if let Some(id) = self.restore_active().await? {
            let needs_messages = {
                let store = self.store.borrow();
                store.conversation(&id).is_some() && store.messages(&id).is_empty()
            };
            if needs_messages {
                if let Err(e) = self.reload(&id).await {
                    log::error!("Failed to load messages of conversation {}: {}", id, e);
                }
            }
        }
        Ok(())
    }

    /// Replace the conversation list with the server's. Auth failures wipe
    /// local state.
    pub async fn load_conversations(&self) -> Result<()> {
        match self.conversations.list_conversations().await {
            Ok(records) => {
                if records.is_empty() {
                    log::warn!("Server returned an empty conversation list");
                }
                self.store.borrow_mut().sync_conversations(records);
                Ok(())
            }
            Err(e) => {
                if matches!(e, ChatError::Http { status: 401 | 403, .. }) {
                    self.store.borrow_mut().clear();
                    *self.active_conversation.borrow_mut() = None;
                }
                Err(e)
            }
        }
    }

    /// Fetch the latest page of stored messages and merge it into the store.
    pub async fn reload(&self, conversation_id: &str) -> Result<()> {
        let records = self
            .conversations
            .fetch_messages(conversation_id, RELOAD_PAGE_SIZE, 0)
            .await?;
        let messages: Vec<Message> = records.into_iter().map(Message::from).collect();
        log::debug!(
            "Reconciling {} server messages into conversation {}",
            messages.len(),
            conversation_id
        );
        self.store
            .borrow_mut()
            .reconcile_with_server(conversation_id, messages);
        self.event_bus.emit(ChatEvent::Reloaded {
            conversation_id: conversation_id.to_string(),
        });
        Ok(())
    }

    /// Create a conversation on the server and select it.
    pub async fn create_conversation(&self, draft: &ConversationDraft) -> Result<String> {
        let record = self.conversations.create_conversation(draft).await?;
        let conversation = record.into_conversation(Vec::new());
        let id = conversation.id.clone();
        self.store.borrow_mut().upsert_conversation(conversation);
        self.select_conversation(&id).await?;
        Ok(id)
    }

    pub async fn update_conversation(&self, id: &str, draft: &ConversationDraft) -> Result<()> {
        let record = self.conversations.update_conversation(id, draft).await?;
        self.store
            .borrow_mut()
            .upsert_conversation(record.into_conversation(Vec::new()));
        Ok(())
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<()> {
        self.conversations.delete_conversation(id).await?;
        self.cancel(id);
        self.store.borrow_mut().remove_conversation(id);

        let was_active = self.active_conversation.borrow().as_deref() == Some(id);
        if was_active {
            *self.active_conversation.borrow_mut() = None;
            self.storage.delete(ACTIVE_CONVERSATION_KEY).await?;
        }

        // Local removal stands even if the refresh fails.
        if let Err(e) = self.load_conversations().await {
            log::warn!("Conversation list refresh after delete failed: {}", e);
        }
        Ok(())
    }

    pub async fn clear_conversation(&self, id: &str) -> Result<()> {
        self.conversations.clear_messages(id).await?;
        self.store.borrow_mut().clear_messages(id);
        Ok(())
    }

    // ─── Active conversation ─────────────────────────────────

    pub fn active_conversation(&self) -> Option<String> {
        self.active_conversation.borrow().clone()
    }

    /// Select a conversation and persist the choice.
    pub async fn select_conversation(&self, id: &str) -> Result<()> {
        *self.active_conversation.borrow_mut() = Some(id.to_string());
        self.storage
            .set(ACTIVE_CONVERSATION_KEY, id.as_bytes())
            .await
    }

    /// Restore the persisted selection, if any.
    pub async fn restore_active(&self) -> Result<Option<String>> {
        let saved = self
            .storage
            .get(ACTIVE_CONVERSATION_KEY)
            .await?
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .filter(|id| !id.is_empty());
        if let Some(ref id) = saved {
            log::info!("Restored active conversation {} from {}", id, self.storage.backend_name());
            *self.active_conversation.borrow_mut() = Some(id.clone());
        }
        Ok(saved)
    }
}

/// Removes a conversation from the active-stream set when dropped.
struct Registration {
    active: Rc<RefCell<HashMap<String, CancelHandle>>>,
    conversation_id: String,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.active.borrow_mut().remove(&self.conversation_id);
    }
}

/// Forwards session callbacks into the store and onto the event bus.
struct StoreHandler {
    store: Rc<RefCell<MessageStore>>,
    event_bus: EventBus,
    conversation_id: String,
    message_id: MessageId,
    metadata: FinalizeMetadata,
}

impl StreamHandler for StoreHandler {
    fn on_delta(&mut self, delta: &str, _total: &str) {
        let appended = self
            .store
            .borrow_mut()
            .append_delta(&self.conversation_id, &self.message_id, delta);
        if let Err(e) = appended {
            log::warn!("Dropping delta: {}", e);
            return;
        }
        self.event_bus.emit(ChatEvent::ReplyDelta {
            conversation_id: self.conversation_id.clone(),
            message_id: self.message_id.clone(),
            delta: delta.to_string(),
        });
    }

    fn on_complete(&mut self, full_text: String) {
        let finalized = self.store.borrow_mut().finalize(
            &self.conversation_id,
            &self.message_id,
            &full_text,
            std::mem::take(&mut self.metadata),
        );
        if let Err(e) = finalized {
            log::warn!("Completed reply has no message to land in: {}", e);
        }
        self.event_bus.emit(ChatEvent::ReplyComplete {
            conversation_id: self.conversation_id.clone(),
            message_id: self.message_id.clone(),
        });
    }

    fn on_error(&mut self, error: StreamError) {
        if let Err(e) = self
            .store
            .borrow_mut()
            .mark_failed(&self.conversation_id, &self.message_id)
        {
            log::warn!("Failed reply has no message to flag: {}", e);
        }
        self.event_bus.emit(ChatEvent::ReplyFailed {
            conversation_id: self.conversation_id.clone(),
            message_id: self.message_id.clone(),
            error,
        });
    }
}
