//! Note store seam and identifier assignment.

use crate::base52;
use crate::types::CardSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::convert::Infallible;

/// External store that owns note ids.
pub trait NoteStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether a note with this id still exists.
    fn contains(&mut self, note_id: u64) -> Result<bool, Self::Error>;

    /// Create a note for the card and return its id.
    fn allocate(&mut self, card: &CardSpec) -> Result<u64, Self::Error>;
}

/// How a card's identifier was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The identifier in the document names a live note.
    Existing(u64),
    /// A new note was allocated.
    Created(u64),
}

impl Resolution {
    pub fn note_id(self) -> u64 {
        match self {
            Self::Existing(id) | Self::Created(id) => id,
        }
    }
}

/// Settle an identifier for every card, allocating notes as needed.
///
/// An identifier is kept when it decodes and the store still has the note.
/// Otherwise a fresh note is allocated and its encoded id replaces it.
pub fn assign_identifiers<S: NoteStore>(
    cards: &mut [CardSpec],
    store: &mut S,
) -> Result<Vec<Resolution>, S::Error> {
    let mut resolutions = Vec::with_capacity(cards.len());
    // A note claimed by one card cannot back another.
    let mut claimed = HashSet::new();

    for card in cards.iter_mut() {
        let mut existing = None;
        if let Some(Ok(id)) = card.identifier.as_deref().map(base52::decode) {
            if !claimed.contains(&id) && store.contains(id)? {
                existing = Some(id);
            }
        }

        let resolution = match existing {
            Some(id) => Resolution::Existing(id),
            None => {
                let id = store.allocate(card)?;
                tracing::debug!(note_id = id, line = card.line, "Allocated note");
                card.identifier = Some(base52::encode(id));
                Resolution::Created(id)
            }
        };
        claimed.insert(resolution.note_id());
        resolutions.push(resolution);
    }

    Ok(resolutions)
}

/// In-memory store, handy for previews and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryNoteStore {
    next_id: u64,
    notes: HashSet<u64>,
}

impl MemoryNoteStore {
    /// Store whose first allocated id is `first_id`.
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            next_id: first_id,
            notes: HashSet::new(),
        }
    }

    /// Register an id as existing.
    pub fn insert(&mut self, note_id: u64) {
        self.notes.insert(note_id);
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl NoteStore for MemoryNoteStore {
    type Error = Infallible;

    fn contains(&mut self, note_id: u64) -> Result<bool, Self::Error> {
        Ok(self.notes.contains(&note_id))
    }

    fn allocate(&mut self, _card: &CardSpec) -> Result<u64, Self::Error> {
        while self.notes.contains(&self.next_id) {
            self.next_id += 1;
        }
        let id = self.next_id;
        self.notes.insert(id);
        self.next_id += 1;
        Ok(id)
    }
}
