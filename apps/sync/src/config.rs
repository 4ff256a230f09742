//! Environment configuration.
//!
//! | Variable             | Default                                  |
//! |----------------------|------------------------------------------|
//! | `MNMD_DATABASE_PATH` | `<data_local_dir>/mnmd-sync/notes.db`    |
//! | `MNMD_NOTES_DIR`     | `.`                                      |
//! | `MNMD_DECK`          | `Default`                                |
//! | `MNMD_TAGS`          | `mnmd` (comma separated)                 |
//! | `MNMD_PLACEHOLDER`   | `[...]`                                  |
//! | `MNMD_WRITE_BACK`    | `true`                                   |

use crate::error::SyncError;
use cloze_core::Options;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub database_path: PathBuf,
    /// Directory synced by `run`.
    pub notes_dir: PathBuf,
    pub deck: String,
    /// Tags added to every note, besides the per-file tag.
    pub tags: Vec<String>,
    /// Write assigned identifiers back into the markdown files. When off,
    /// syncing only previews and leaves the database alone too.
    pub write_back: bool,
    pub options: Options,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            notes_dir: PathBuf::from("."),
            deck: "Default".to_string(),
            tags: vec!["mnmd".to_string()],
            write_back: true,
            options: Options::default(),
        }
    }
}

impl SyncConfig {
    /// Load from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, SyncError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("MNMD_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("MNMD_NOTES_DIR") {
            config.notes_dir = PathBuf::from(dir);
        }
        if let Some(deck) = lookup("MNMD_DECK") {
            let deck = deck.trim();
            if deck.is_empty() {
                return Err(SyncError::Config("MNMD_DECK must not be empty".to_string()));
            }
            config.deck = deck.to_string();
        }
        if let Some(tags) = lookup("MNMD_TAGS") {
            config.tags = tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(placeholder) = lookup("MNMD_PLACEHOLDER") {
            config.options.placeholder = placeholder;
        }
        if let Some(value) = lookup("MNMD_WRITE_BACK") {
            config.write_back = parse_bool("MNMD_WRITE_BACK", &value)?;
        }

        Ok(config)
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mnmd-sync")
        .join("notes.db")
}

fn parse_bool(key: &str, value: &str) -> Result<bool, SyncError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SyncError::Config(format!("{key}: expected a boolean, got {other:?}"))),
    }
}
