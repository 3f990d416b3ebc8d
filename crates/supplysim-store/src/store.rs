//! Backend-agnostic document store handle.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::dragonfly::DragonflyStore;
use crate::error::StoreError;
use crate::memory::MemoryStore;

/// A keyed JSON document store.
///
/// Cheap to clone; every clone talks to the same backend.
#[derive(Debug, Clone)]
pub enum DocumentStore {
    /// In-process map.
    Memory(MemoryStore),
    /// `Dragonfly` (Redis-compatible) server.
    Dragonfly(DragonflyStore),
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::Memory(MemoryStore::new())
    }
}

impl DocumentStore {
    /// A fresh in-memory store.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Connect to `Dragonfly` at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the URL is invalid or the server is
    /// unreachable.
    pub async fn dragonfly(url: &str) -> Result<Self, StoreError> {
        Ok(Self::Dragonfly(DragonflyStore::connect(url).await?))
    }

    /// Load and deserialize the document at `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails or the stored JSON does not
    /// match `T`.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let raw = match self {
            Self::Memory(store) => store.get_raw(key).await,
            Self::Dragonfly(store) => store.get_raw(key).await?,
        };
        raw.map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .transpose()
    }

    /// Serialize and store `value` at `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or the write fails.
    pub async fn save<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        match self {
            Self::Memory(store) => store.set_raw(key, json).await,
            Self::Dragonfly(store) => store.set_raw(key, &json).await,
        }
    }

    /// Remove the document at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => {
                store.delete(key).await;
                Ok(())
            }
            Self::Dragonfly(store) => store.delete(key).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u32,
    }

    #[tokio::test]
    async fn missing_key_loads_none() {
        let store = DocumentStore::memory();
        let loaded: Option<Counter> = store.load("nope").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = DocumentStore::memory();
        store.save("c", &Counter { value: 3 }).await.unwrap();
        let loaded: Option<Counter> = store.load("c").await.unwrap();
        assert_eq!(loaded, Some(Counter { value: 3 }));

        store.delete("c").await.unwrap();
        let gone: Option<Counter> = store.load("c").await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn mismatched_document_is_a_serialization_error() {
        let store = DocumentStore::memory();
        store.save("c", &"not a counter").await.unwrap();
        let loaded: Result<Option<Counter>, _> = store.load("c").await;
        assert!(matches!(loaded, Err(StoreError::Serialization(_))));
    }
}
