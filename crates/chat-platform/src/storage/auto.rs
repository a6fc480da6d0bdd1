//! Pick the best available storage backend.
//!
//! Priority: localStorage → Memory (fallback)

use std::rc::Rc;
use chat_core::ports::StoragePort;
use chat_types::Result;
use super::{MemoryStorage, WebStorage};

/// Open localStorage if the page may use it, else fall back to memory.
/// Returns a trait object so callers are backend-agnostic.
pub async fn auto_detect_storage() -> Result<Rc<dyn StoragePort>> {
    match WebStorage::open() {
        Ok(web) => {
            log::info!("Storage backend: localStorage");
            Ok(Rc::new(web))
        }
        Err(e) => {
            log::warn!("localStorage unavailable ({}), falling back to memory", e);
            Ok(Rc::new(MemoryStorage::new()))
        }
    }
}
