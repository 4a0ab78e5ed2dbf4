//! In-memory store for tests and throwaway servers.

use std::collections::BTreeMap;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentStore, StoreError};

/// Process-local store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn compare_and_put(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Vec<u8>,
    ) -> Result<bool, StoreError> {
        let mut data = self.data.write().await;
        if data.get(key).map(Vec::as_slice) != expected {
            return Ok(false);
        }
        data.insert(key.to_string(), value);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_put() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.put("k", b"one".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(store.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_compare_and_put() {
        let store = MemoryStore::new();

        // Absent key: only `None` matches
        assert!(!store.compare_and_put("k", Some(b"x"), b"a".to_vec()).await.unwrap());
        assert!(store.compare_and_put("k", None, b"a".to_vec()).await.unwrap());
        assert!(!store.compare_and_put("k", None, b"b".to_vec()).await.unwrap());

        // Stale expectation loses
        assert!(store.compare_and_put("k", Some(b"a"), b"b".to_vec()).await.unwrap());
        assert!(!store.compare_and_put("k", Some(b"a"), b"c".to_vec()).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(b"b".to_vec()));
    }

    #[tokio::test]
    async fn test_concurrent_writers_one_wins() {
        let store = std::sync::Arc::new(MemoryStore::new());
        store.put("k", b"base".to_vec()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.compare_and_put("k", Some(b"base"), vec![i]).await.unwrap()
            }));
        }

        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }
}
