//! On-disk store backed by an embedded sled database.

use std::path::Path;
use async_trait::async_trait;
use sled::Db;

use super::{DocumentStore, StoreError};

/// Persistent store. Survives restarts; one process per directory.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create a store in `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&path).map_err(|e| StoreError::Io(e.to_string()))?;
        let db = sled::open(&path)?;

        tracing::info!("Opened sled store at {:?}", path.as_ref());

        Ok(Self { db })
    }

    /// Flush dirty pages to disk.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SledStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.db.insert(key, value)?;
        self.flush().await
    }

    async fn compare_and_put(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Vec<u8>,
    ) -> Result<bool, StoreError> {
        match self.db.compare_and_swap(key, expected, Some(value))? {
            Ok(()) => {
                self.flush().await?;
                Ok(true)
            }
            Err(mismatch) => {
                tracing::debug!(
                    key,
                    current_len = mismatch.current.as_ref().map(|v| v.len()),
                    "compare_and_put lost the race"
                );
                Ok(false)
            }
        }
    }
}
