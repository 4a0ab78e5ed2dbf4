//! Document Store
//!
//! Byte-level key/value persistence behind an async trait. The service owns
//! all encoding; stores only see opaque bytes.
//!
//! `compare_and_put` is the only concurrency primitive: a write goes through
//! only if the stored value is still exactly what the writer read.

pub mod memory;
pub mod sled_store;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

/// Key holding the current game document.
pub const GAME_KEY: &str = "game:current";

/// Key holding the all-time leaderboard.
pub const LEADERBOARD_KEY: &str = "leaderboard:all-time";

/// Store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Embedded database error.
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Filesystem error outside the database itself.
    #[error("Store I/O error: {0}")]
    Io(String),
}

/// Async byte store with atomic compare-and-put.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the value under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Overwrite the value under `key`.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Write `value` only if the current value equals `expected`
    /// (`None` meaning absent). Returns whether the write happened.
    async fn compare_and_put(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Vec<u8>,
    ) -> Result<bool, StoreError>;
}
