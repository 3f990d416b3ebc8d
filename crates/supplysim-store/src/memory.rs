//! In-process document backend.
//!
//! Used by tests and by games configured with `store.backend: memory`.
//! Clones share the same underlying map.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::error::StoreError;

/// Shared in-memory key/value map of JSON documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<BTreeMap<String, String>>>,
    reject_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the raw JSON string at `key`.
    pub async fn get_raw(&self, key: &str) -> Option<String> {
        self.documents.read().await.get(key).cloned()
    }

    /// Store a raw JSON string at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteRejected`] while writes are being rejected.
    pub async fn set_raw(&self, key: &str, json: String) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected(key.to_owned()));
        }
        self.documents.write().await.insert(key.to_owned(), json);
        Ok(())
    }

    /// Delete a key. Missing keys are ignored.
    pub async fn delete(&self, key: &str) {
        self.documents.write().await.remove(key);
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        self.documents.read().await.keys().cloned().collect()
    }

    /// Make every subsequent write fail (or succeed again).
    ///
    /// Simulates an unreachable backend.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_documents() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set_raw("g:engine", String::from("{}")).await.unwrap();
        assert_eq!(other.get_raw("g:engine").await.as_deref(), Some("{}"));
        assert_eq!(other.keys().await, vec![String::from("g:engine")]);
    }

    #[tokio::test]
    async fn rejected_writes_do_not_land() {
        let store = MemoryStore::new();
        store.set_reject_writes(true);
        let result = store.set_raw("k", String::from("1")).await;
        assert!(matches!(result, Err(StoreError::WriteRejected(ref k)) if k == "k"));
        assert!(store.get_raw("k").await.is_none());

        store.set_reject_writes(false);
        assert!(store.set_raw("k", String::from("1")).await.is_ok());
    }
}
