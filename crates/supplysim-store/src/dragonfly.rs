//! `Dragonfly` (Redis-compatible) document backend.
//!
//! Each document is one JSON string value. Key patterns:
//!
//! | Pattern | Description |
//! |---------|-------------|
//! | `{engine}:engine` | Clock, stage and scheduled tasks of one game |
//! | `{engine}:{node}:{component}` | State of one node component |

use fred::prelude::*;

use crate::error::StoreError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyStore {
    client: Client,
}

impl core::fmt::Debug for DragonflyStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DragonflyStore").finish_non_exhaustive()
    }
}

impl DragonflyStore {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Read the raw JSON string at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the read fails.
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = self.client.get(key).await?;
        Ok(value)
    }

    /// Store a raw JSON string at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the write fails.
    pub async fn set_raw(&self, key: &str, json: &str) -> Result<(), StoreError> {
        let _: () = self.client.set(key, json, None, None, false).await?;
        Ok(())
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }
}
