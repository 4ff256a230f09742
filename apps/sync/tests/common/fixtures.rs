//! Sample markdown documents.

#![allow(dead_code)]

pub const CAPITAL: &str = "# Capitals\n\nThe capital of France is {{Paris}}.\n";

pub const TWO_PARAGRAPHS: &str = "{{Rust}} is fast.\n\n{{Cargo}} builds it.\n";

pub const PLANETS: &str = "{{1.1>Mercury}}\n{{1.2>Venus}}\n{{1.3>Earth}}\n";

pub const MALFORMED: &str = "Bad {{}} marker.\n\nAnother {{answer<extra>}} here.\n";

/// Body of a synced file, without its front matter.
pub fn body(content: &str) -> &str {
    mnmd_sync::file_id::split_front_matter(content).1
}
