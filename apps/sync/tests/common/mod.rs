//! Common test utilities for sync integration tests.
//!
//! Each `TestContext` owns a temporary notes directory and an in-memory
//! note database, so tests never touch the user's data.

pub mod fixtures;

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use mnmd_sync::{SqliteRepository, SyncConfig, Syncer};

pub struct TestContext {
    pub dir: TempDir,
    pub syncer: Syncer,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a context after adjusting the default config.
    pub fn with_config(adjust: impl FnOnce(&mut SyncConfig)) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = SyncConfig {
            database_path: dir.path().join("notes.db"),
            notes_dir: dir.path().to_path_buf(),
            ..SyncConfig::default()
        };
        adjust(&mut config);

        let repo = SqliteRepository::open_in_memory().expect("Failed to open database");
        Self {
            dir,
            syncer: Syncer::new(config, repo),
        }
    }

    /// Write a file into the notes directory.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.dir.path().join(name)).expect("Failed to read test file")
    }
}
