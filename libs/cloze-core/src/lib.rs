//! Cloze engine for markdown notes.
//!
//! Provides:
//! - Paragraph and explicit-block segmentation
//! - `{{…}}` marker scanning with groups, sequences, hints, extras and scopes
//! - Card synthesis (front/back text) for singletons, groups and sequences
//! - Base52 note identifiers and in-place identifier write-back

pub mod base52;
pub mod document;
pub mod error;
pub mod grouping;
pub mod options;
pub mod scanner;
pub mod scope;
pub mod segmenter;
pub mod store;
pub mod synth;
pub mod types;
pub mod writer;

pub use document::{process, Document, Processed};
pub use error::{ParseError, PipelineError, Result};
pub use options::Options;
pub use store::{assign_identifiers, MemoryNoteStore, NoteStore, Resolution};
pub use types::{
    CardKind, CardSpec, CardUnit, ClozeToken, IdentifierAssignment, Role, Scope, Unit, UnitKind,
    UnitLine,
};
pub use writer::write_identifiers;
