//! Durable backends mirrored by the persistence bridge.
//!
//! Two shapes of storage are supported:
//! - a synchronous, string-keyed local store holding whole serialized blobs
//!   (small, capacity bounded, always available);
//! - an asynchronous record store holding one entry per note keyed by `id`
//!   (opened lazily, practically unbounded).

mod local_file;
mod memory;
mod sqlite_records;

pub use local_file::FileLocalStore;
pub use memory::{MemoryLocalStore, MemoryRecordStore};
pub use sqlite_records::{SqliteRecordStore, StoreHandle};

use async_trait::async_trait;

use crate::entity::Note;
use crate::error::Result;

/// Synchronous string-keyed storage.
pub trait LocalBackend: Send + Sync {
    /// Read the blob stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing what was there.
    ///
    /// Fails with `QuotaExceeded` when the store would outgrow its capacity.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Asynchronous per-record object store, keyed by note id.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    type Handle: Send + Sync;

    /// Open the named object store, creating it when missing. Idempotent.
    async fn open_or_create(&self, store_name: &str) -> Result<Self::Handle>;

    /// Every record in the store, in ascending id order.
    async fn get_all(&self, handle: &Self::Handle) -> Result<Vec<Note>>;

    /// Insert or replace the record with the note's id.
    async fn put(&self, handle: &Self::Handle, note: &Note) -> Result<()>;

    /// Release the handle.
    async fn close(&self, _handle: Self::Handle) -> Result<()> {
        Ok(())
    }
}
