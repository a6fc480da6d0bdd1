//! Browser platform adapters.
//!
//! Implements the chat-core ports on top of `fetch()`, Web Storage and the
//! browser console, and wires them into a ready-to-use controller.

pub mod rest;
pub mod storage;
pub mod transport;

mod http;

#[cfg(test)]
mod tests;

use std::rc::Rc;

use chat_core::controller::ChatController;
use chat_core::event_bus::EventBus;
use chat_types::{Result, config::ClientConfig};

pub use rest::RestConversationClient;
pub use storage::{MemoryStorage, WebStorage, auto_detect_storage};
pub use transport::{HttpTransport, ReaderSource};

/// Route `log` records to the browser console.
pub fn init_logging(level: log::Level) {
    wasm_logger::init(wasm_logger::Config::new(level));
}

/// Assemble a controller backed by the browser adapters and restore the
/// previous session's conversation list and selection.
pub async fn connect(config: ClientConfig) -> Result<ChatController> {
    log::info!("Connecting chat client to {}", config.api_base);

    let storage = auto_detect_storage().await?;
    let controller = ChatController::new(
        Rc::new(HttpTransport::new(config.clone())),
        Rc::new(RestConversationClient::new(config)),
        storage,
        EventBus::new(),
    );

    if let Err(e) = controller.initialize().await {
        // The controller stays usable; the list can be reloaded later.
        log::error!("Initial conversation load failed: {}", e);
    }
    Ok(controller)
}
