//! Paragraph segmentation.
//!
//! # Format
//! ```markdown
//! A paragraph runs until a blank line.
//! It may span several lines.
//!
//! > ?
//! > An explicit block starts at the marker line
//! >
//! > and keeps quoted blank lines.
//! ```

use crate::error::{ParseError, Result};
use crate::options::Options;
use crate::types::{Unit, UnitKind, UnitLine};

/// Split a document into paragraphs and explicit blocks, in document order.
pub fn segment(text: &str, options: &Options) -> Result<Vec<Unit>> {
    let mut segmenter = Segmenter::new(text, options);

    let mut offset = 0;
    for (idx, raw) in text.split('\n').enumerate() {
        let line_num = idx + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        segmenter.process_line(line, offset, line_num)?;
        offset += raw.len() + 1;
    }

    Ok(segmenter.finalize())
}

struct BlockBuilder {
    lines: Vec<(usize, usize, usize)>,
}

struct Segmenter<'a> {
    text: &'a str,
    options: &'a Options,
    units: Vec<Unit>,
    /// (line number, source start, source end)
    paragraph: Vec<(usize, usize, usize)>,
    block: Option<BlockBuilder>,
}

impl<'a> Segmenter<'a> {
    fn new(text: &'a str, options: &'a Options) -> Self {
        Self {
            text,
            options,
            units: Vec::new(),
            paragraph: Vec::new(),
            block: None,
        }
    }

    fn process_line(&mut self, line: &str, offset: usize, line_num: usize) -> Result<()> {
        let is_marker = self.options.is_block_marker(line);

        if let Some(block) = self.block.as_mut() {
            if is_marker {
                if block.lines.is_empty() {
                    return Err(ParseError::MalformedBlock {
                        line: line_num,
                        reason: "only the first line of a block may be the marker".to_string(),
                    });
                }
                self.flush_block();
                self.open_block();
                return Ok(());
            }

            if let Some(content) = self.options.strip_quote(line) {
                let start = offset + (line.len() - content.len());
                block.lines.push((line_num, start, offset + line.len()));
                return Ok(());
            }

            self.flush_block();
        }

        if is_marker {
            self.flush_paragraph();
            self.open_block();
        } else if line.trim().is_empty() {
            self.flush_paragraph();
        } else {
            self.paragraph.push((line_num, offset, offset + line.len()));
        }
        Ok(())
    }

    fn open_block(&mut self) {
        self.block = Some(BlockBuilder { lines: Vec::new() });
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.paragraph);
        self.push_unit(UnitKind::Paragraph, lines);
    }

    fn flush_block(&mut self) {
        let Some(block) = self.block.take() else {
            return;
        };
        // Trailing quoted blank lines carry no content.
        let mut lines = block.lines;
        while lines.last().map(|&(_, s, e)| s == e).unwrap_or(false) {
            lines.pop();
        }
        if !lines.is_empty() {
            self.push_unit(UnitKind::ExplicitBlock, lines);
        }
    }

    fn push_unit(&mut self, kind: UnitKind, raw: Vec<(usize, usize, usize)>) {
        let mut lines = Vec::with_capacity(raw.len());
        let mut content = String::new();
        for (number, start, end) in raw {
            if !lines.is_empty() {
                content.push('\n');
            }
            lines.push(UnitLine {
                number,
                source: start..end,
                content_start: content.len(),
            });
            content.push_str(&self.text[start..end]);
        }

        self.units.push(Unit {
            index: self.units.len(),
            kind,
            lines,
            content,
        });
    }

    fn finalize(mut self) -> Vec<Unit> {
        self.flush_block();
        self.flush_paragraph();
        self.units
    }
}
