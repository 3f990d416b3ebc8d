//! The durable state container.
//!
//! A [`Document`] binds one in-memory state value to one store key.
//! Mutations are plain closures over `&mut S`:
//!
//! - [`Document::commit`] applies the closure to a copy, persists the copy,
//!   and only then swaps it in. On any failure memory is untouched.
//! - [`Document::commit_immediate`] applies in memory only and marks the
//!   document dirty; a coordinator batches several of these and ends with
//!   one [`Document::persist`].
//!
//! When a call returns `Ok`, the backing store matches memory unless the
//! caller is mid-batch with `commit_immediate`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::DocumentStore;

/// A state value persisted under one key.
#[derive(Debug, Clone)]
pub struct Document<S> {
    key: String,
    store: DocumentStore,
    state: S,
    dirty: bool,
}

impl<S> Document<S>
where
    S: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Load the document at `key`, or create it from `init` and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read, decode, or initial write fails.
    pub async fn load_or_create(
        store: DocumentStore,
        key: impl Into<String>,
        init: impl FnOnce() -> S + Send,
    ) -> Result<Self, StoreError> {
        let key = key.into();
        if let Some(state) = store.load::<S>(&key).await? {
            debug!(key = %key, "Loaded document");
            return Ok(Self {
                key,
                store,
                state,
                dirty: false,
            });
        }

        let state = init();
        store.save(&key, &state).await?;
        debug!(key = %key, "Created document");
        Ok(Self {
            key,
            store,
            state,
            dirty: false,
        })
    }

    /// Current state.
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// Store key of this document.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether memory holds changes not yet persisted.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Apply `mutation` and persist the result.
    ///
    /// The mutation runs on a copy of the state. If it fails, or the write
    /// fails, the in-memory state is unchanged and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the mutation's error, or a [`StoreError`] converted into `E`.
    pub async fn commit<T, E, F>(&mut self, mutation: F) -> Result<T, E>
    where
        F: FnOnce(&mut S) -> Result<T, E> + Send,
        E: From<StoreError>,
    {
        let mut next = self.state.clone();
        let output = mutation(&mut next)?;
        if let Err(e) = self.store.save(&self.key, &next).await {
            warn!(key = %self.key, error = %e, "Failed to persist document");
            return Err(e.into());
        }
        self.state = next;
        self.dirty = false;
        Ok(output)
    }

    /// Apply `mutation` in memory only.
    ///
    /// A failed mutation leaves the state unchanged. Follow with
    /// [`Document::persist`].
    ///
    /// # Errors
    ///
    /// Returns the mutation's error.
    pub fn commit_immediate<T, E, F>(&mut self, mutation: F) -> Result<T, E>
    where
        F: FnOnce(&mut S) -> Result<T, E>,
    {
        let mut next = self.state.clone();
        let output = mutation(&mut next)?;
        self.state = next;
        self.dirty = true;
        Ok(output)
    }

    /// Write the current state to the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails; the document stays dirty.
    pub async fn persist(&mut self) -> Result<(), StoreError> {
        self.store.save(&self.key, &self.state).await?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::memory::MemoryStore;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Tally {
        count: u32,
    }

    #[derive(Debug, thiserror::Error)]
    enum TallyError {
        #[error("too big")]
        TooBig,
        #[error(transparent)]
        Store(#[from] StoreError),
    }

    fn bump(limit: u32) -> impl FnOnce(&mut Tally) -> Result<u32, TallyError> {
        move |t: &mut Tally| {
            let next = t.count.checked_add(1).ok_or(TallyError::TooBig)?;
            if next > limit {
                return Err(TallyError::TooBig);
            }
            t.count = next;
            Ok(next)
        }
    }

    #[tokio::test]
    async fn creates_then_reloads() {
        let store = DocumentStore::memory();
        let mut doc = Document::load_or_create(store.clone(), "t", Tally::default)
            .await
            .unwrap();
        doc.commit(bump(10)).await.unwrap();

        let reloaded = Document::load_or_create(store, "t", Tally::default)
            .await
            .unwrap();
        assert_eq!(reloaded.state().count, 1);
    }

    #[tokio::test]
    async fn failed_mutation_changes_nothing() {
        let store = DocumentStore::memory();
        let mut doc = Document::load_or_create(store, "t", Tally::default)
            .await
            .unwrap();
        let result = doc.commit(bump(0)).await;
        assert!(matches!(result, Err(TallyError::TooBig)));
        assert_eq!(doc.state().count, 0);
    }

    #[tokio::test]
    async fn failed_write_keeps_memory_consistent_with_store() {
        let memory = MemoryStore::new();
        let store = DocumentStore::Memory(memory.clone());
        let mut doc = Document::load_or_create(store.clone(), "t", Tally::default)
            .await
            .unwrap();

        memory.set_reject_writes(true);
        let result = doc.commit(bump(10)).await;
        assert!(matches!(result, Err(TallyError::Store(_))));
        assert_eq!(doc.state().count, 0);

        memory.set_reject_writes(false);
        assert_eq!(doc.commit(bump(10)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn immediate_commits_batch_into_one_persist() {
        let store = DocumentStore::memory();
        let mut doc = Document::load_or_create(store.clone(), "t", Tally::default)
            .await
            .unwrap();

        doc.commit_immediate(bump(10)).unwrap();
        doc.commit_immediate(bump(10)).unwrap();
        assert!(doc.is_dirty());
        let stored: Option<Tally> = store.load("t").await.unwrap();
        assert_eq!(stored, Some(Tally { count: 0 }));

        doc.persist().await.unwrap();
        assert!(!doc.is_dirty());
        let stored: Option<Tally> = store.load("t").await.unwrap();
        assert_eq!(stored, Some(Tally { count: 2 }));
    }
}
