use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use super::RecordBackend;
use crate::entity::Note;
use crate::error::{CarnetError, Result};

const SCHEMA_VERSION: &str = "1";

/// SQLite-backed record store: one table per object store, keyed by note id.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

/// An opened object store.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    table: String,
}

impl StoreHandle {
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl SqliteRecordStore {
    /// Open or create `<data_dir>/<database>.db`
    pub fn open(data_dir: &Path, database: &str) -> Result<Self> {
        let path = data_dir.join(format!("{}.db", database));
        let conn = Connection::open(&path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        // Metadata table for version tracking
        conn.execute(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?1)",
            [SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Get the stored schema version
    pub async fn schema_version(&self) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let version = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }
}

fn table_name(store_name: &str) -> Result<String> {
    let valid = !store_name.is_empty()
        && store_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(CarnetError::invalid(
            "store_name",
            format!("'{}' is not a valid object store name", store_name),
        ));
    }
    Ok(format!("store_{}", store_name))
}

#[async_trait]
impl RecordBackend for SqliteRecordStore {
    type Handle = StoreHandle;

    async fn open_or_create(&self, store_name: &str) -> Result<StoreHandle> {
        let table = table_name(store_name)?;
        let conn = self.conn.lock().await;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY,
                    body TEXT NOT NULL,
                    stored_at TEXT NOT NULL
                )",
                table
            ),
            [],
        )?;
        tracing::debug!(table = %table, "Opened object store");
        Ok(StoreHandle { table })
    }

    async fn get_all(&self, handle: &StoreHandle) -> Result<Vec<Note>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, body FROM {} ORDER BY id",
            handle.table
        ))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut notes = Vec::with_capacity(rows.len());
        for (id, body) in rows {
            match serde_json::from_str::<Note>(&body) {
                Ok(note) => notes.push(note),
                Err(e) => tracing::warn!(id, error = %e, "Skipping unreadable record"),
            }
        }
        Ok(notes)
    }

    async fn put(&self, handle: &StoreHandle, note: &Note) -> Result<()> {
        let body = serde_json::to_string(note)?;
        let conn = self.conn.lock().await;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (id, body, stored_at) VALUES (?1, ?2, ?3)",
                handle.table
            ),
            params![note.id, body, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

// Implement From for rusqlite::Error
impl From<rusqlite::Error> for CarnetError {
    fn from(e: rusqlite::Error) -> Self {
        CarnetError::Storage(format!("SQLite error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_db() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteRecordStore::open(tmp.path(), "NotesApp").unwrap();
        assert!(tmp.path().join("NotesApp.db").exists());
        assert_eq!(store.path(), Some(tmp.path().join("NotesApp.db").as_path()));
        assert_eq!(store.schema_version().await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_open_or_create_is_idempotent() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let first = store.open_or_create("notes").await.unwrap();
        store.put(&first, &Note::new(7)).await.unwrap();

        let second = store.open_or_create("notes").await.unwrap();
        assert_eq!(second.table(), "store_notes");
        assert_eq!(store.get_all(&second).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_upserts_and_get_all_orders_by_id() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let handle = store.open_or_create("notes").await.unwrap();

        let mut late = Note::new(300);
        store.put(&handle, &late).await.unwrap();
        store.put(&handle, &Note::new(100)).await.unwrap();
        late.title = "Edited".to_string();
        store.put(&handle, &late).await.unwrap();

        let notes = store.get_all(&handle).await.unwrap();
        assert_eq!(notes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![100, 300]);
        assert_eq!(notes[1].title, "Edited");
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = SqliteRecordStore::open(tmp.path(), "NotesApp").unwrap();
            let handle = store.open_or_create("notes").await.unwrap();
            store.put(&handle, &Note::new(1)).await.unwrap();
        }

        let store = SqliteRecordStore::open(tmp.path(), "NotesApp").unwrap();
        let handle = store.open_or_create("notes").await.unwrap();
        assert_eq!(store.get_all(&handle).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_skipped() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let handle = store.open_or_create("notes").await.unwrap();
        store.put(&handle, &Note::new(1)).await.unwrap();
        {
            let conn = store.conn.lock().await;
            conn.execute(
                "INSERT INTO store_notes (id, body, stored_at) VALUES (2, 'not json', 'now')",
                [],
            )
            .unwrap();
        }

        let notes = store.get_all(&handle).await.unwrap();
        assert_eq!(notes.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_store_name() {
        let store = SqliteRecordStore::in_memory().unwrap();
        assert!(store.open_or_create("notes; DROP TABLE meta").await.is_err());
    }
}
