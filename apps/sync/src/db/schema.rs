//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for the note database.
pub const SCHEMA: &str = r#"
-- Notes synthesized from cloze markers
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    deck TEXT NOT NULL,
    front TEXT NOT NULL,
    back TEXT NOT NULL,
    extra TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    file_tag TEXT NOT NULL,
    source_file TEXT NOT NULL,
    line INTEGER NOT NULL,
    content_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_notes_file_tag ON notes(file_tag);
"#;

/// Record the schema version if not present.
pub const INIT_SCHEMA_VERSION: &str = "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)";
