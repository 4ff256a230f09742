//! File-level sync: markdown file in, notes and rewritten file out.

use crate::config::SyncConfig;
use crate::db::{DbError, NoteFields, NoteRepository, SqliteRepository};
use crate::error::SyncError;
use crate::file_id;
use cloze_core::{CardSpec, MemoryNoteStore, NoteStore, PipelineError, Processed, Resolution};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Sync statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    /// Files left alone because they failed to parse.
    pub skipped: usize,
}

impl SyncStats {
    pub fn merge(&mut self, other: SyncStats) {
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
    }
}

/// Where the notes of one file come from.
struct FileContext<'a> {
    config: &'a SyncConfig,
    file_tag: &'a str,
    source_file: &'a str,
    /// Lines taken by front matter above the body.
    line_offset: usize,
}

impl FileContext<'_> {
    fn fields(&self, card: &CardSpec) -> NoteFields {
        let mut tags = self.config.tags.clone();
        tags.push(self.file_tag.to_string());

        NoteFields {
            deck: self.config.deck.clone(),
            front: card.front.clone(),
            back: card.back.clone(),
            extra: card.extra.clone(),
            tags,
            file_tag: self.file_tag.to_string(),
            source_file: self.source_file.to_string(),
            line: card.line + self.line_offset,
        }
    }
}

fn note_exists(repo: &SqliteRepository, note_id: u64) -> Result<bool, DbError> {
    match i64::try_from(note_id) {
        Ok(id) => repo.note_exists(id),
        Err(_) => Ok(false),
    }
}

fn to_row_id(note_id: u64) -> Result<i64, DbError> {
    i64::try_from(note_id).map_err(|_| DbError::InvalidData(format!("note id {note_id} out of range")))
}

/// Note store that inserts new notes into the database.
struct FileNotes<'a> {
    repo: &'a SqliteRepository,
    file: &'a FileContext<'a>,
}

impl NoteStore for FileNotes<'_> {
    type Error = DbError;

    fn contains(&mut self, note_id: u64) -> Result<bool, Self::Error> {
        note_exists(self.repo, note_id)
    }

    fn allocate(&mut self, card: &CardSpec) -> Result<u64, Self::Error> {
        let id = self.repo.insert_note(&self.file.fields(card))?;
        u64::try_from(id).map_err(|_| DbError::InvalidData(format!("negative note id {id}")))
    }
}

/// Read-only note store: new notes only get ids in memory.
struct PreviewNotes<'a> {
    repo: &'a SqliteRepository,
    pending: MemoryNoteStore,
}

impl<'a> PreviewNotes<'a> {
    fn new(repo: &'a SqliteRepository) -> Result<Self, DbError> {
        let next = u64::try_from(repo.max_note_id()?).unwrap_or_default() + 1;
        Ok(Self {
            repo,
            pending: MemoryNoteStore::starting_at(next),
        })
    }
}

impl NoteStore for PreviewNotes<'_> {
    type Error = DbError;

    fn contains(&mut self, note_id: u64) -> Result<bool, Self::Error> {
        note_exists(self.repo, note_id)
    }

    fn allocate(&mut self, card: &CardSpec) -> Result<u64, Self::Error> {
        match self.pending.allocate(card) {
            Ok(id) => Ok(id),
            Err(never) => match never {},
        }
    }
}

pub struct Syncer {
    config: SyncConfig,
    repo: SqliteRepository,
}

impl Syncer {
    pub fn new(config: SyncConfig, repo: SqliteRepository) -> Self {
        Self { config, repo }
    }

    /// Open the configured database, creating its directory if needed.
    pub fn open(config: SyncConfig) -> Result<Self, SyncError> {
        if let Some(parent) = config.database_path.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }
        let repo = SqliteRepository::open(&config.database_path)?;
        Ok(Self::new(config, repo))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn repository(&self) -> &SqliteRepository {
        &self.repo
    }

    /// Sync one markdown file.
    ///
    /// The file is only rewritten after every card was parsed and stored.
    /// With write-back off nothing is stored or written; the stats tell what
    /// a real sync would do.
    pub fn sync_file(&self, path: &Path) -> Result<SyncStats, SyncError> {
        let content = fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;

        let (file_id, with_id) = file_id::ensure_file_id(&content);
        let text = with_id.as_deref().unwrap_or(&content);
        let (front_matter, body) = file_id::split_front_matter(text);
        let file_tag = file_id::file_tag(&file_id);
        let source_file = path.display().to_string();

        let file = FileContext {
            config: &self.config,
            file_tag: &file_tag,
            source_file: &source_file,
            line_offset: front_matter.lines().count(),
        };

        let stats = if self.config.write_back {
            let mut store = FileNotes {
                repo: &self.repo,
                file: &file,
            };
            let processed = self.process(path, body, &mut store)?;
            let stats = self.apply(&file, &processed)?;

            if processed.changed || with_id.is_some() {
                let updated = format!("{front_matter}{}", processed.text);
                write_atomic(path, &updated)?;
                debug!(file = %source_file, "Wrote identifiers back");
            }
            stats
        } else {
            let mut store = PreviewNotes::new(&self.repo)?;
            let processed = self.process(path, body, &mut store)?;
            self.preview(&file, &processed)?
        };

        info!(
            file = %source_file,
            created = stats.created,
            updated = stats.updated,
            unchanged = stats.unchanged,
            deleted = stats.deleted,
            preview = !self.config.write_back,
            "Synced file"
        );
        Ok(stats)
    }

    fn process<S: NoteStore<Error = DbError>>(
        &self,
        path: &Path,
        body: &str,
        store: &mut S,
    ) -> Result<Processed, SyncError> {
        match cloze_core::process(body, &self.config.options, store) {
            Ok(processed) => Ok(processed),
            Err(PipelineError::Parse(source)) => Err(SyncError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(PipelineError::Store(e)) => Err(e.into()),
        }
    }

    /// Store updates and delete orphans.
    fn apply(&self, file: &FileContext, processed: &Processed) -> Result<SyncStats, SyncError> {
        let mut stats = SyncStats::default();
        for (card, resolution) in processed.cards.iter().zip(&processed.resolutions) {
            match *resolution {
                Resolution::Created(_) => stats.created += 1,
                Resolution::Existing(id) => {
                    if self.repo.update_note(to_row_id(id)?, &file.fields(card))? {
                        stats.updated += 1;
                    } else {
                        stats.unchanged += 1;
                    }
                }
            }
        }

        let orphans = self.orphans(file, processed)?;
        if !orphans.is_empty() {
            debug!(file = %file.source_file, count = orphans.len(), "Deleting orphaned notes");
            stats.deleted = self.repo.delete_notes(&orphans)?;
        }
        Ok(stats)
    }

    /// Count what `apply` would do without touching the database.
    fn preview(&self, file: &FileContext, processed: &Processed) -> Result<SyncStats, SyncError> {
        let mut stats = SyncStats::default();
        for (card, resolution) in processed.cards.iter().zip(&processed.resolutions) {
            match *resolution {
                Resolution::Created(_) => stats.created += 1,
                Resolution::Existing(id) => {
                    let stored = self.repo.get_note(to_row_id(id)?)?;
                    let hash = file.fields(card).content_hash();
                    if stored.is_some_and(|note| note.content_hash == hash) {
                        stats.unchanged += 1;
                    } else {
                        stats.updated += 1;
                    }
                }
            }
        }
        stats.deleted = self.orphans(file, processed)?.len();
        Ok(stats)
    }

    /// Notes tagged with this file that no card resolved to.
    fn orphans(&self, file: &FileContext, processed: &Processed) -> Result<Vec<i64>, SyncError> {
        let live: HashSet<u64> = processed.resolutions.iter().map(|r| r.note_id()).collect();
        Ok(self
            .repo
            .find_by_file_tag(file.file_tag)?
            .into_iter()
            .filter(|id| u64::try_from(*id).map_or(true, |id| !live.contains(&id)))
            .collect())
    }

    /// Sync every `*.md` file directly inside `dir`.
    ///
    /// Files that fail to parse are logged and skipped.
    pub fn sync_dir(&self, dir: &Path) -> Result<SyncStats, SyncError> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| SyncError::io(dir, e))? {
            let path = entry.map_err(|e| SyncError::io(dir, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut total = SyncStats::default();
        for path in &paths {
            match self.sync_file(path) {
                Ok(stats) => total.merge(stats),
                Err(SyncError::Parse { path, source }) => {
                    warn!(file = %path.display(), error = %source, "Skipping file");
                    total.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            dir = %dir.display(),
            files = paths.len(),
            created = total.created,
            updated = total.updated,
            deleted = total.deleted,
            skipped = total.skipped,
            "Sync complete"
        );
        Ok(total)
    }
}

/// Replace a file's content through a sibling temp file.
fn write_atomic(path: &Path, content: &str) -> Result<(), SyncError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{name}.mnmd-tmp"));

    fs::write(&tmp, content).map_err(|e| SyncError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        SyncError::io(path, e)
    })
}
