//! Whole-document pipeline: parse, group, render, assign, write back.

use crate::error::{ParseError, PipelineError, Result};
use crate::grouping::build_card_units;
use crate::options::Options;
use crate::scanner::scan_collect;
use crate::segmenter::segment;
use crate::store::{assign_identifiers, NoteStore, Resolution};
use crate::synth::synthesize_all;
use crate::types::{CardSpec, CardUnit, ClozeToken, Unit};
use crate::writer::write_identifiers;

/// A parsed document snapshot.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    text: &'a str,
    options: Options,
    units: Vec<Unit>,
    tokens: Vec<ClozeToken>,
}

impl<'a> Document<'a> {
    /// Parse with default options.
    pub fn parse(text: &'a str) -> Result<Self> {
        Self::parse_with(text, &Options::default())
    }

    /// Parse a document.
    ///
    /// Every malformed marker is reported (as a batch when there are several);
    /// nested markers and malformed blocks stop parsing immediately.
    pub fn parse_with(text: &'a str, options: &Options) -> Result<Self> {
        let units = segment(text, options)?;

        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        for unit in &units {
            let scan = scan_collect(unit)?;
            tokens.extend(scan.tokens);
            errors.extend(scan.errors);
        }
        if let Some(error) = ParseError::collect(errors) {
            return Err(error);
        }

        tracing::debug!(units = units.len(), tokens = tokens.len(), "Parsed document");

        Ok(Self {
            text,
            options: options.clone(),
            units,
            tokens,
        })
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn tokens(&self) -> &[ClozeToken] {
        &self.tokens
    }

    pub fn card_units(&self) -> Result<Vec<CardUnit>> {
        build_card_units(&self.tokens, self.units.len())
    }

    /// Render every card, in order of each card's first token.
    pub fn cards(&self) -> Result<Vec<CardSpec>> {
        let card_units = self.card_units()?;
        Ok(synthesize_all(&card_units, &self.units, &self.tokens, &self.options))
    }
}

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct Processed {
    /// Cards with settled identifiers. Token offsets refer to the input text.
    pub cards: Vec<CardSpec>,
    /// One per card.
    pub resolutions: Vec<Resolution>,
    /// Document text with identifiers written into marker prefixes.
    pub text: String,
    pub changed: bool,
}

/// Run the pipeline over a document.
///
/// Nothing is written unless parsing, grouping and rendering all succeed.
pub fn process<S: NoteStore>(
    text: &str,
    options: &Options,
    store: &mut S,
) -> std::result::Result<Processed, PipelineError<S::Error>> {
    let document = Document::parse_with(text, options)?;
    let mut cards = document.cards()?;

    let resolutions = assign_identifiers(&mut cards, store).map_err(PipelineError::Store)?;

    let assignments: Vec<_> = cards.iter().flat_map(CardSpec::assignments).collect();
    let written = write_identifiers(text, &assignments)?;
    let changed = written != text;

    tracing::debug!(cards = cards.len(), changed, "Processed document");

    Ok(Processed {
        cards,
        resolutions,
        text: written,
        changed,
    })
}
