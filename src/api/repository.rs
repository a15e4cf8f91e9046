//! SQLite table behind the REST API.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;

/// One row of the server-side `notes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRow {
    pub id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub position_x: f64,
    pub position_y: f64,
    pub created_at: String,
}

/// Body of POST and PUT. Missing positions default to 0.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    /// Only honoured on creation; defaults to now.
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub struct NoteRepository {
    conn: Mutex<Connection>,
}

const COLUMNS: &str = "id, title, content, position_x, position_y, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        position_x: row.get(3)?,
        position_y: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl NoteRepository {
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT,
                content TEXT,
                position_x REAL NOT NULL DEFAULT 0,
                position_y REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes(created_at)",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Newest first.
    ///
    /// SQLite's `LIKE` folds ASCII only, so the title match is done here on
    /// Unicode-lowercased text before paging.
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<NoteRow>> {
        let conn = self.conn.lock().await;
        let Some(title) = query.title.as_deref() else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM notes ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
                COLUMNS
            ))?;
            let limit = query.limit.map(i64::from).unwrap_or(-1);
            let offset = query.offset.map(i64::from).unwrap_or(0);
            let rows = stmt
                .query_map(params![limit, offset], from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            return Ok(rows);
        };

        let needle = title.to_lowercase();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notes WHERE title IS NOT NULL ORDER BY created_at DESC, id DESC",
            COLUMNS
        ))?;
        let rows = stmt
            .query_map([], from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        let offset = query.offset.map_or(0, |o| o as usize);
        Ok(rows
            .into_iter()
            .filter(|row| {
                row.title
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase().contains(&needle))
            })
            .skip(offset)
            .take(limit)
            .collect())
    }

    pub async fn create(&self, input: &NoteInput) -> Result<NoteRow> {
        let created_at = input
            .created_at
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        let conn = self.conn.lock().await;
        let row = conn.query_row(
            &format!(
                "INSERT INTO notes (title, content, position_x, position_y, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {}",
                COLUMNS
            ),
            params![
                input.title,
                input.content,
                input.position_x.unwrap_or(0.0),
                input.position_y.unwrap_or(0.0),
                created_at
            ],
            from_row,
        )?;
        tracing::debug!(id = row.id, "Inserted server note");
        Ok(row)
    }

    /// Replace title, content and position. `None` when no row has `id`.
    pub async fn update(&self, id: i64, input: &NoteInput) -> Result<Option<NoteRow>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                &format!(
                    "UPDATE notes SET title = ?1, content = ?2, position_x = ?3, position_y = ?4
                     WHERE id = ?5 RETURNING {}",
                    COLUMNS
                ),
                params![
                    input.title,
                    input.content,
                    input.position_x.unwrap_or(0.0),
                    input.position_y.unwrap_or(0.0),
                    id
                ],
                from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub async fn delete(&self, id: i64) -> Result<Option<NoteRow>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                &format!("DELETE FROM notes WHERE id = ?1 RETURNING {}", COLUMNS),
                [id],
                from_row,
            )
            .optional()?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, created_at: &str) -> NoteInput {
        NoteInput {
            title: Some(title.to_string()),
            content: Some(format!("{} body", title)),
            created_at: Some(created_at.to_string()),
            ..NoteInput::default()
        }
    }

    async fn seeded() -> NoteRepository {
        let repo = NoteRepository::in_memory().unwrap();
        repo.create(&input("Courses", "2024-01-01T10:00:00.000Z")).await.unwrap();
        repo.create(&input("Projet", "2024-02-01T10:00:00.000Z")).await.unwrap();
        repo.create(&input("courses bis", "2024-03-01T10:00:00.000Z")).await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_create_defaults_positions() {
        let repo = NoteRepository::in_memory().unwrap();
        let row = repo.create(&NoteInput::default()).await.unwrap();
        assert_eq!(row.id, 1);
        assert_eq!(row.position_x, 0.0);
        assert!(row.title.is_none());
        assert!(row.created_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filter() {
        let repo = seeded().await;

        let all = repo.list(&ListQuery::default()).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 2, 1]);

        let filtered = repo
            .list(&ListQuery {
                title: Some("COURSES".to_string()),
                ..ListQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 1]);
    }

    #[tokio::test]
    async fn test_title_filter_folds_accented_case() {
        let repo = seeded().await;
        repo.create(&input("Idées de vacances", "2024-04-01T10:00:00.000Z")).await.unwrap();
        repo.create(&input("ÉTÉ", "2024-05-01T10:00:00.000Z")).await.unwrap();

        let ideas = repo
            .list(&ListQuery {
                title: Some("IDÉES".to_string()),
                ..ListQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(ideas.iter().map(|r| r.id).collect::<Vec<_>>(), vec![4]);

        let summer = repo
            .list(&ListQuery {
                title: Some("été".to_string()),
                ..ListQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(summer.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5]);
    }

    #[tokio::test]
    async fn test_title_filter_then_pagination() {
        let repo = seeded().await;
        let page = repo
            .list(&ListQuery {
                title: Some("courses".to_string()),
                limit: Some(1),
                offset: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(page.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let repo = seeded().await;
        let page = repo
            .list(&ListQuery {
                limit: Some(1),
                offset: Some(1),
                ..ListQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, 2);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let repo = seeded().await;

        let updated = repo.update(2, &input("Projet v2", "ignored")).await.unwrap().unwrap();
        assert_eq!(updated.title.as_deref(), Some("Projet v2"));
        assert_eq!(updated.created_at, "2024-02-01T10:00:00.000Z");

        assert!(repo.update(99, &NoteInput::default()).await.unwrap().is_none());
        assert!(repo.delete(99).await.unwrap().is_none());
        assert_eq!(repo.delete(1).await.unwrap().unwrap().id, 1);
        assert_eq!(repo.list(&ListQuery::default()).await.unwrap().len(), 2);
    }
}
