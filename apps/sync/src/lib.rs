//! Sync markdown cloze notes into a local note database.

pub mod config;
pub mod db;
pub mod error;
pub mod file_id;
pub mod syncer;

pub use config::SyncConfig;
pub use db::{DbError, Note, NoteFields, NoteRepository, SqliteRepository};
pub use error::SyncError;
pub use syncer::{SyncStats, Syncer};

use sha2::{Digest, Sha256};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber (`RUST_LOG`, default `info`).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Calculate SHA256 hash of content.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sync the configured notes directory.
pub fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = SyncConfig::from_env()?;
    tracing::info!(database = %config.database_path.display(), "Opening note database...");
    let syncer = Syncer::open(config)?;

    let notes_dir = syncer.config().notes_dir.clone();
    tracing::info!(dir = %notes_dir.display(), "Syncing notes...");
    syncer.sync_dir(&notes_dir)?;

    Ok(())
}
