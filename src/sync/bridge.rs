//! Reconciliation between the in-memory collection and the two durable
//! backends.
//!
//! The local store is written on every mutation and read once at startup.
//! The record store is reconciled after every mutation and connectivity
//! change: online it is authoritative (pull), offline the in-memory
//! collection is authoritative (push). Failures are logged and swallowed.

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::Connectivity;
use crate::entity::{welcome_notes, Note};
use crate::storage::{LocalBackend, RecordBackend};

pub const DEFAULT_LOCAL_KEY: &str = "userNotes";
pub const DEFAULT_STORE_NAME: &str = "notes";

/// What a reconciliation pass decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Online, and the record store holds a different collection: adopt it.
    Adopted(Vec<Note>),
    /// Nothing to change (online with an empty or already identical store).
    Unchanged,
    /// Offline: this many notes were upserted into the record store.
    Pushed(usize),
    /// The record store could not be opened, read or written.
    Failed,
}

pub struct PersistenceBridge<L, R: RecordBackend> {
    local: L,
    records: R,
    local_key: String,
    store_name: String,
    handle: OnceCell<R::Handle>,
}

impl<L: LocalBackend, R: RecordBackend> PersistenceBridge<L, R> {
    pub fn new(local: L, records: R) -> Self {
        Self::with_names(local, records, DEFAULT_LOCAL_KEY, DEFAULT_STORE_NAME)
    }

    pub fn with_names(
        local: L,
        records: R,
        local_key: impl Into<String>,
        store_name: impl Into<String>,
    ) -> Self {
        Self {
            local,
            records,
            local_key: local_key.into(),
            store_name: store_name.into(),
            handle: OnceCell::new(),
        }
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    /// Seed collection read from the local store at startup.
    ///
    /// Missing data yields the welcome notes; a blob that is not a JSON
    /// array yields an empty collection. Individual records that do not
    /// describe a note are skipped.
    pub fn load_local(&self) -> Vec<Note> {
        match self.local.get(&self.local_key) {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<serde_json::Value>>(&blob) {
                Ok(records) => {
                    let total = records.len();
                    let notes: Vec<Note> = records
                        .into_iter()
                        .enumerate()
                        .filter_map(|(index, record)| match serde_json::from_value(record) {
                            Ok(note) => Some(note),
                            Err(e) => {
                                warn!(index, error = %e, "Skipping unreadable stored note");
                                None
                            }
                        })
                        .collect();
                    debug!(count = notes.len(), total, "Loaded notes from local store");
                    notes
                }
                Err(e) => {
                    warn!(error = %e, "Stored notes are unreadable, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => welcome_notes(),
            Err(e) => {
                warn!(error = %e, "Local store unavailable, using default notes");
                welcome_notes()
            }
        }
    }

    /// Write the whole collection under the local key.
    pub fn persist_local(&self, notes: &[Note]) {
        let blob = match serde_json::to_string(notes) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "Could not serialize notes");
                return;
            }
        };
        if let Err(e) = self.local.set(&self.local_key, &blob) {
            warn!(error = %e, bytes = blob.len(), "Could not persist notes locally");
        }
    }

    async fn handle(&self) -> Option<&R::Handle> {
        let opened = self
            .handle
            .get_or_try_init(|| self.records.open_or_create(&self.store_name))
            .await;
        match opened {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, store = %self.store_name, "Could not open record store");
                None
            }
        }
    }

    /// Run one reconciliation pass against `notes` for the given state.
    pub async fn reconcile(&self, connectivity: Connectivity, notes: &[Note]) -> SyncOutcome {
        let Some(handle) = self.handle().await else {
            return SyncOutcome::Failed;
        };

        match connectivity {
            Connectivity::Online => {
                let stored = match self.records.get_all(handle).await {
                    Ok(stored) => stored,
                    Err(e) => {
                        warn!(error = %e, "Could not read record store");
                        return SyncOutcome::Failed;
                    }
                };
                if stored.is_empty() || stored.as_slice() == notes {
                    return SyncOutcome::Unchanged;
                }
                info!(count = stored.len(), "Adopting notes from record store");
                SyncOutcome::Adopted(stored)
            }
            Connectivity::Offline => {
                // Stops at the first failed write; earlier upserts stay.
                for note in notes {
                    if let Err(e) = self.records.put(handle, note).await {
                        warn!(id = note.id, error = %e, "Could not write note to record store");
                        return SyncOutcome::Failed;
                    }
                }
                debug!(count = notes.len(), "Pushed notes to record store");
                SyncOutcome::Pushed(notes.len())
            }
        }
    }

    /// Release the record store handle, if one was opened.
    pub async fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.records.close(handle).await {
                warn!(error = %e, "Could not close record store");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{NoteChange, Priority};
    use crate::storage::{MemoryLocalStore, MemoryRecordStore};

    fn notes(ids: &[i64]) -> Vec<Note> {
        ids.iter().map(|id| Note::new(*id)).collect()
    }

    fn bridge() -> (
        PersistenceBridge<MemoryLocalStore, MemoryRecordStore>,
        MemoryLocalStore,
        MemoryRecordStore,
    ) {
        let local = MemoryLocalStore::new();
        let records = MemoryRecordStore::new();
        let bridge = PersistenceBridge::new(local.clone(), records.clone());
        (bridge, local, records)
    }

    #[test]
    fn test_load_local_missing_gives_welcome_notes() {
        let (bridge, _, _) = bridge();
        let loaded = bridge.load_local();
        assert_eq!(loaded.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_load_local_corrupt_gives_empty() {
        let (bridge, local, _) = bridge();
        local.insert(DEFAULT_LOCAL_KEY, "{not json");
        assert!(bridge.load_local().is_empty());
    }

    #[test]
    fn test_load_local_read_failure_gives_welcome_notes() {
        let bridge = PersistenceBridge::new(MemoryLocalStore::unavailable(), MemoryRecordStore::new());
        let loaded = bridge.load_local();
        assert_eq!(loaded.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(loaded[0].title, "Bienvenue");
    }

    #[test]
    fn test_load_local_skips_only_unreadable_records() {
        let (bridge, local, _) = bridge();
        local.insert(
            DEFAULT_LOCAL_KEY,
            r#"[{"id":1,"title":"Courses","content":"pain"},
                {"id":2,"content":"sans titre"},
                {"id":"trois","title":"Mauvais id"},
                {"id":4,"title":"Pièces","attachments":[{"name":"a.png","url":"blob:x"}]}]"#,
        );

        let loaded = bridge.load_local();

        assert_eq!(loaded.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 2, 4]);
        assert_eq!(loaded[0].title, "Courses");
        assert_eq!(loaded[1].title, "Nouvelle Note");
        assert_eq!(loaded[1].content, "sans titre");
    }

    #[test]
    fn test_persist_then_load_round_trip() {
        let (bridge, _, _) = bridge();
        let mut stored = notes(&[10, 20]);
        stored[0].apply(NoteChange::Priority(Priority::Basse));

        bridge.persist_local(&stored);

        assert_eq!(bridge.load_local(), stored);
    }

    #[test]
    fn test_persist_over_capacity_is_swallowed() {
        let local = MemoryLocalStore::with_capacity(8);
        let bridge = PersistenceBridge::new(local.clone(), MemoryRecordStore::new());

        bridge.persist_local(&notes(&[1, 2, 3]));

        assert!(local.get(DEFAULT_LOCAL_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_online_with_empty_records_leaves_notes() {
        let (bridge, _, _) = bridge();
        let outcome = bridge.reconcile(Connectivity::Online, &notes(&[1])).await;
        assert_eq!(outcome, SyncOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_online_adopts_record_store() {
        let (bridge, _, records) = bridge();
        records.insert(DEFAULT_STORE_NAME, notes(&[5, 6]));

        let outcome = bridge.reconcile(Connectivity::Online, &notes(&[1])).await;

        assert_eq!(outcome, SyncOutcome::Adopted(notes(&[5, 6])));
    }

    #[tokio::test]
    async fn test_online_with_identical_records_is_unchanged() {
        let (bridge, _, records) = bridge();
        records.insert(DEFAULT_STORE_NAME, notes(&[1, 2, 3]));

        let outcome = bridge.reconcile(Connectivity::Online, &notes(&[1, 2, 3])).await;

        assert_eq!(outcome, SyncOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_offline_upserts_every_note() {
        let (bridge, _, records) = bridge();
        let outcome = bridge.reconcile(Connectivity::Offline, &notes(&[1, 2, 3])).await;

        assert_eq!(outcome, SyncOutcome::Pushed(3));
        assert_eq!(records.records(DEFAULT_STORE_NAME), notes(&[1, 2, 3]));
    }

    #[tokio::test]
    async fn test_offline_pass_is_idempotent() {
        let (bridge, _, records) = bridge();
        let current = notes(&[4, 8]);

        bridge.reconcile(Connectivity::Offline, &current).await;
        let first = records.records(DEFAULT_STORE_NAME);
        bridge.reconcile(Connectivity::Offline, &current).await;

        assert_eq!(records.records(DEFAULT_STORE_NAME), first);
    }

    #[tokio::test]
    async fn test_offline_never_removes_records() {
        let (bridge, _, records) = bridge();
        bridge.reconcile(Connectivity::Offline, &notes(&[1, 2])).await;
        bridge.reconcile(Connectivity::Offline, &notes(&[2])).await;

        assert_eq!(records.records(DEFAULT_STORE_NAME).len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_record_store_fails_quietly() {
        let bridge = PersistenceBridge::new(MemoryLocalStore::new(), MemoryRecordStore::unavailable());

        assert_eq!(
            bridge.reconcile(Connectivity::Online, &notes(&[1])).await,
            SyncOutcome::Failed
        );
        assert_eq!(
            bridge.reconcile(Connectivity::Offline, &notes(&[1])).await,
            SyncOutcome::Failed
        );
    }

    #[tokio::test]
    async fn test_close_releases_handle() {
        let (mut bridge, _, _) = bridge();
        bridge.reconcile(Connectivity::Offline, &notes(&[1])).await;
        bridge.close().await;
        assert!(bridge.handle.get().is_none());
    }
}
