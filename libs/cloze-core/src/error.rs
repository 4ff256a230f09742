//! Error types for cloze-core.

use thiserror::Error;

/// Result type alias using ParseError.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while parsing, grouping or rewriting a document.
///
/// Offsets are byte offsets into the document text; lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed cloze at line {line}: {reason}")]
    MalformedCloze {
        unit: usize,
        offset: usize,
        line: usize,
        reason: String,
    },

    #[error("nested cloze at line {line}: marker at offset {offset} opens inside the marker at offset {outer}")]
    NestedCloze {
        unit: usize,
        offset: usize,
        outer: usize,
        line: usize,
    },

    #[error("malformed block at line {line}: {reason}")]
    MalformedBlock { line: usize, reason: String },

    #[error("group {group}: member at line {line} has no sequence order")]
    MissingOrder {
        group: String,
        offset: usize,
        line: usize,
    },

    #[error("group {group}: sequence order {order} used more than once (line {line})")]
    DuplicateOrder {
        group: String,
        order: u32,
        offset: usize,
        line: usize,
    },

    #[error("group {group}: member at line {line} has a sequence order but the group is unordered")]
    MalformedGroup {
        group: String,
        offset: usize,
        line: usize,
    },

    #[error("overlapping cloze markers at offsets {first} and {second}")]
    OverlappingToken { first: usize, second: usize },

    #[error("no cloze marker at offset {offset}")]
    StaleAssignment { offset: usize },

    #[error("invalid identifier {value:?}")]
    InvalidIdentifier { value: String },

    #[error("{} malformed clozes in document", .0.len())]
    Batch(Vec<ParseError>),
}

impl ParseError {
    /// Flatten into the individual errors (a batch yields its members).
    pub fn into_errors(self) -> Vec<ParseError> {
        match self {
            Self::Batch(errors) => errors,
            other => vec![other],
        }
    }

    /// Collapse collected errors: `None` when empty, the error itself when single.
    pub(crate) fn collect(mut errors: Vec<ParseError>) -> Option<ParseError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Batch(errors)),
        }
    }
}

/// Errors from the full pipeline, including the note-store collaborator.
#[derive(Debug, Error)]
pub enum PipelineError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("note store failed: {0}")]
    Store(#[source] E),
}
