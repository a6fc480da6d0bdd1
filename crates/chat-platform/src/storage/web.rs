//! Web Storage (`localStorage`) backend.
//! Persistent across page reloads; values are stored as UTF-8 strings.

use async_trait::async_trait;
use web_sys::Storage;

use chat_core::ports::StoragePort;
use chat_types::{ChatError, Result};

use crate::http::{js_error, js_message};

/// Written and removed once on open to detect storage that exists but
/// refuses writes (private browsing, exhausted quota).
const PROBE_KEY: &str = "chat:probe";

pub struct WebStorage {
    storage: Storage,
}

impl WebStorage {
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| ChatError::Storage("No window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(js_error)?
            .ok_or_else(|| ChatError::Storage("localStorage not available".to_string()))?;

        storage
            .set_item(PROBE_KEY, "1")
            .map_err(|e| ChatError::Storage(format!("localStorage is read-only: {}", js_message(e))))?;
        storage.remove_item(PROBE_KEY).map_err(js_error)?;

        Ok(Self { storage })
    }
}

#[async_trait(?Send)]
impl StoragePort for WebStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .storage
            .get_item(key)
            .map_err(|e| ChatError::Storage(js_message(e)))?;
        Ok(value.map(String::into_bytes))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let text = std::str::from_utf8(value)
            .map_err(|_| ChatError::Storage(format!("Value for {} is not UTF-8", key)))?;
        self.storage
            .set_item(key, text)
            .map_err(|e| ChatError::Storage(js_message(e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| ChatError::Storage(js_message(e)))
    }

    fn backend_name(&self) -> &str {
        "localStorage"
    }
}
