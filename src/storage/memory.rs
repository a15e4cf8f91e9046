//! In-memory backends. Clones share the same underlying data, so a caller
//! can keep one clone for inspection while the bridge owns another.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{LocalBackend, RecordBackend};
use crate::entity::{Note, NoteId};
use crate::error::{CarnetError, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLocalStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    capacity: Option<usize>,
    unavailable: bool,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::default(),
            capacity: Some(capacity),
            unavailable: false,
        }
    }

    /// A store whose reads and writes fail, like a browser with storage
    /// blocked.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Seed a value without going through the capacity check.
    pub fn insert(&self, key: &str, value: &str) {
        lock(&self.entries).insert(key.to_string(), value.to_string());
    }
}

impl MemoryLocalStore {
    fn check(&self) -> Result<()> {
        if self.unavailable {
            return Err(CarnetError::Storage("local store unavailable".to_string()));
        }
        Ok(())
    }
}

impl LocalBackend for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        let mut entries = lock(&self.entries);
        if let Some(capacity) = self.capacity {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let needed = others + value.len();
            if needed > capacity {
                return Err(CarnetError::QuotaExceeded { needed, capacity });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

type Stores = HashMap<String, BTreeMap<NoteId, Note>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    stores: Arc<Mutex<Stores>>,
    unavailable: bool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails, like a browser with the
    /// database disabled.
    pub fn unavailable() -> Self {
        Self {
            stores: Arc::default(),
            unavailable: true,
        }
    }

    /// Current records of `store_name`, in id order.
    pub fn records(&self, store_name: &str) -> Vec<Note> {
        lock(&self.stores)
            .get(store_name)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Seed records directly, as another session would have written them.
    pub fn insert(&self, store_name: &str, notes: impl IntoIterator<Item = Note>) {
        let mut stores = lock(&self.stores);
        let records = stores.entry(store_name.to_string()).or_default();
        for note in notes {
            records.insert(note.id, note);
        }
    }

    fn check(&self) -> Result<()> {
        if self.unavailable {
            return Err(CarnetError::Storage("record store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordBackend for MemoryRecordStore {
    type Handle = String;

    async fn open_or_create(&self, store_name: &str) -> Result<String> {
        self.check()?;
        lock(&self.stores).entry(store_name.to_string()).or_default();
        Ok(store_name.to_string())
    }

    async fn get_all(&self, handle: &String) -> Result<Vec<Note>> {
        self.check()?;
        Ok(self.records(handle))
    }

    async fn put(&self, handle: &String, note: &Note) -> Result<()> {
        self.check()?;
        lock(&self.stores)
            .entry(handle.clone())
            .or_default()
            .insert(note.id, note.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_clones_share_entries() {
        let store = MemoryLocalStore::new();
        let view = store.clone();
        store.set("theme", "dark").unwrap();
        assert_eq!(view.get("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_local_capacity() {
        let store = MemoryLocalStore::with_capacity(4);
        store.set("a", "1234").unwrap();
        assert!(matches!(
            store.set("b", "5"),
            Err(CarnetError::QuotaExceeded { needed: 5, capacity: 4 })
        ));
    }

    #[test]
    fn test_unavailable_local_store_fails() {
        let store = MemoryLocalStore::unavailable();
        assert!(store.get("theme").is_err());
        assert!(matches!(store.set("theme", "dark"), Err(CarnetError::Storage(_))));
    }

    #[tokio::test]
    async fn test_records_upsert_by_id() {
        let store = MemoryRecordStore::new();
        let handle = store.open_or_create("notes").await.unwrap();

        let mut note = Note::new(3);
        store.put(&handle, &note).await.unwrap();
        note.title = "changed".to_string();
        store.put(&handle, &note).await.unwrap();
        store.put(&handle, &Note::new(1)).await.unwrap();

        let all = store.get_all(&handle).await.unwrap();
        assert_eq!(all.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(all[1].title, "changed");
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryRecordStore::unavailable();
        assert!(store.open_or_create("notes").await.is_err());
    }
}
