//! Repository pattern for note storage.

use crate::db::error::DbError;
use crate::db::schema::{INIT_SCHEMA_VERSION, SCHEMA, SCHEMA_VERSION};
use crate::hash_content;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

type Result<T> = std::result::Result<T, DbError>;

/// Note content as synthesized from a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteFields {
    pub deck: String,
    pub front: String,
    pub back: String,
    pub extra: Option<String>,
    pub tags: Vec<String>,
    pub file_tag: String,
    pub source_file: String,
    /// 1-based line in the source file.
    pub line: usize,
}

impl NoteFields {
    /// Hash of the fields a study tool displays.
    ///
    /// Position (`source_file`, `line`) is left out so moving a card does
    /// not count as editing it.
    pub fn content_hash(&self) -> String {
        let tags = self.tags.join(",");
        let parts = [
            self.deck.as_str(),
            self.front.as_str(),
            self.back.as_str(),
            self.extra.as_deref().unwrap_or(""),
            tags.as_str(),
        ];
        hash_content(&parts.join("\u{1f}"))
    }
}

/// A stored note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: i64,
    #[serde(flatten)]
    pub fields: NoteFields,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for note operations.
pub trait NoteRepository {
    fn insert_note(&self, note: &NoteFields) -> Result<i64>;
    fn note_exists(&self, id: i64) -> Result<bool>;
    fn get_note(&self, id: i64) -> Result<Option<Note>>;
    /// Returns `false` when the stored content hash already matches; the
    /// source position is refreshed either way.
    fn update_note(&self, id: i64, note: &NoteFields) -> Result<bool>;
    fn find_by_file_tag(&self, file_tag: &str) -> Result<Vec<i64>>;
    fn delete_notes(&self, ids: &[i64]) -> Result<usize>;
}

/// SQLite implementation of the note repository.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.conn.execute(INIT_SCHEMA_VERSION, params![SCHEMA_VERSION])?;
        Ok(())
    }

    /// Number of stored notes.
    pub fn count_notes(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Highest note id in use, or 0 for an empty database.
    pub fn max_note_id(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COALESCE(MAX(id), 0) FROM notes", [], |row| row.get(0))
            .map_err(Into::into)
    }

    fn row_to_note(row: &rusqlite::Row) -> rusqlite::Result<Note> {
        let tags: String = row.get(5)?;
        let tags: Vec<String> = serde_json::from_str(&tags)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
        let line: i64 = row.get(8)?;

        Ok(Note {
            id: row.get(0)?,
            fields: NoteFields {
                deck: row.get(1)?,
                front: row.get(2)?,
                back: row.get(3)?,
                extra: row.get(4)?,
                tags,
                file_tag: row.get(6)?,
                source_file: row.get(7)?,
                line: line as usize,
            },
            content_hash: row.get(9)?,
            created_at: parse_timestamp(row, 10)?,
            updated_at: parse_timestamp(row, 11)?,
        })
    }
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn encode_tags(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags).map_err(|e| DbError::InvalidData(e.to_string()))
}

impl NoteRepository for SqliteRepository {
    fn insert_note(&self, note: &NoteFields) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO notes (deck, front, back, extra, tags, file_tag, source_file, line, content_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                note.deck,
                note.front,
                note.back,
                note.extra,
                encode_tags(&note.tags)?,
                note.file_tag,
                note.source_file,
                note.line as i64,
                note.content_hash(),
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn note_exists(&self, id: i64) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM notes WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn get_note(&self, id: i64) -> Result<Option<Note>> {
        self.conn
            .query_row(
                "SELECT id, deck, front, back, extra, tags, file_tag, source_file, line, content_hash, created_at, updated_at
                 FROM notes WHERE id = ?1",
                params![id],
                Self::row_to_note,
            )
            .optional()
            .map_err(Into::into)
    }

    fn update_note(&self, id: i64, note: &NoteFields) -> Result<bool> {
        let current: Option<String> = self
            .conn
            .query_row(
                "SELECT content_hash FROM notes WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Err(DbError::NoteNotFound(id));
        };

        let hash = note.content_hash();
        if current == hash {
            self.conn.execute(
                "UPDATE notes SET source_file = ?1, line = ?2 WHERE id = ?3",
                params![note.source_file, note.line as i64, id],
            )?;
            return Ok(false);
        }

        self.conn.execute(
            "UPDATE notes SET deck = ?1, front = ?2, back = ?3, extra = ?4, tags = ?5, file_tag = ?6,
                source_file = ?7, line = ?8, content_hash = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                note.deck,
                note.front,
                note.back,
                note.extra,
                encode_tags(&note.tags)?,
                note.file_tag,
                note.source_file,
                note.line as i64,
                hash,
                Utc::now().to_rfc3339(),
                id,
            ],
        )?;
        Ok(true)
    }

    fn find_by_file_tag(&self, file_tag: &str) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM notes WHERE file_tag = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![file_tag], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn delete_notes(&self, ids: &[i64]) -> Result<usize> {
        let mut count = 0;
        for id in ids {
            count += self
                .conn
                .execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        }
        Ok(count)
    }
}
