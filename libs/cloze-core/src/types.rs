//! Core types for the cloze engine.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Kind of a document unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Text between blank-line boundaries.
    Paragraph,
    /// A quoted block opened by the `> ?` marker line.
    ExplicitBlock,
}

/// One line of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLine {
    /// 1-based line number in the document.
    pub number: usize,
    /// Bytes of the line's content in the document (quote prefix and line ending excluded).
    pub source: Range<usize>,
    /// Offset of the line's content within `Unit::content`.
    pub content_start: usize,
}

/// A paragraph or explicit block of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub index: usize,
    pub kind: UnitKind,
    pub lines: Vec<UnitLine>,
    /// Line contents joined by `\n`.
    pub content: String,
}

impl Unit {
    /// Line containing the given content offset.
    ///
    /// An offset sitting on a joining `\n` belongs to the line it terminates.
    pub fn line_at(&self, local: usize) -> &UnitLine {
        let idx = self
            .lines
            .partition_point(|line| line.content_start <= local)
            .saturating_sub(1);
        &self.lines[idx]
    }

    /// Map an offset in `content` to a byte offset in the document.
    pub fn to_source(&self, local: usize) -> usize {
        let line = self.line_at(local);
        line.source.start + (local - line.content_start)
    }

    /// Content of a single line.
    pub fn line_text(&self, line: &UnitLine) -> &str {
        let len = line.source.end - line.source.start;
        &self.content[line.content_start..line.content_start + len]
    }
}

/// Paragraphs before and after the owning unit included in a card's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scope {
    pub before: u32,
    pub after: u32,
}

impl Scope {
    /// Only the owning unit.
    pub const NONE: Scope = Scope { before: 0, after: 0 };
    /// Default for list items: the list intro paragraph before.
    pub const LIST_ITEM: Scope = Scope { before: 1, after: 0 };

    pub fn new(before: u32, after: u32) -> Self {
        Self { before, after }
    }
}

/// One parsed `{{…}}` marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClozeToken {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    /// Base52 note identifier written by a previous run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Explicit `[before,after]` suffix, if the author wrote one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    /// Whether the marker sits on a list-item line.
    pub in_list: bool,
    /// Index of the owning unit.
    pub unit: usize,
    /// Span within the unit content, scope suffix included.
    pub local: Range<usize>,
    /// Span within the document text, scope suffix included.
    pub source: Range<usize>,
    /// 1-based line of the opening braces.
    pub line: usize,
}

impl ClozeToken {
    /// Scope used for context resolution.
    pub fn effective_scope(&self) -> Scope {
        match self.scope {
            Some(scope) => scope,
            None if self.in_list => Scope::LIST_ITEM,
            None => Scope::NONE,
        }
    }

    /// Document offset of the opening `{{`.
    pub fn offset(&self) -> usize {
        self.source.start
    }
}

/// How a card unit was formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardKind {
    Singleton,
    Grouped { group: String },
    Sequenced {
        group: String,
        position: usize,
        total: usize,
    },
}

impl CardKind {
    pub fn group(&self) -> Option<&str> {
        match self {
            Self::Singleton => None,
            Self::Grouped { group } | Self::Sequenced { group, .. } => Some(group),
        }
    }
}

/// Rendering role of a token on a specific card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Hidden behind the placeholder on the front.
    Active,
    /// Shown as its answer text.
    Revealed,
    /// Removed entirely (later members of a sequence).
    Absent,
}

/// Tokens destined for one card, with resolved context.
///
/// Token and unit references are indices into the owning document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardUnit {
    pub kind: CardKind,
    /// All members of the group (or the single token), in card order.
    pub members: Vec<usize>,
    pub active: Vec<usize>,
    pub absent: Vec<usize>,
    /// Context units in document order.
    pub context: Vec<usize>,
}

impl CardUnit {
    /// Role of a token on this card; tokens outside the unit are revealed.
    pub fn role(&self, token: usize) -> Role {
        if self.active.contains(&token) {
            Role::Active
        } else if self.absent.contains(&token) {
            Role::Absent
        } else {
            Role::Revealed
        }
    }
}

/// A synthesized card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSpec {
    pub kind: CardKind,
    pub front: String,
    pub back: String,
    /// Extras of the active tokens, shown after the back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    /// The active tokens this card tests.
    pub tokens: Vec<ClozeToken>,
    pub context: Vec<usize>,
    /// 1-based line of the first active token.
    pub line: usize,
    /// Identifier to persist: existing, or assigned by the note store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl CardSpec {
    /// Back text followed by the extra segment, if any.
    pub fn back_with_extra(&self) -> String {
        match &self.extra {
            Some(extra) => format!("{}\n\n{}", self.back, extra),
            None => self.back.clone(),
        }
    }

    /// Identifier writes needed to persist this card's identifier.
    pub fn assignments(&self) -> Vec<IdentifierAssignment> {
        let Some(identifier) = &self.identifier else {
            return Vec::new();
        };
        self.tokens
            .iter()
            .map(|token| IdentifierAssignment {
                offset: token.offset(),
                identifier: identifier.clone(),
            })
            .collect()
    }
}

/// Identifier to write into the marker opening at `offset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierAssignment {
    pub offset: usize,
    pub identifier: String,
}
