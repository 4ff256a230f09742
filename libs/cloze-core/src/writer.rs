//! Writing note identifiers back into marker prefixes.
//!
//! Only prefix bytes change; everything else in the document is preserved.

use crate::base52;
use crate::error::{ParseError, Result};
use crate::scanner::{find_close, parse_prefix, prefix_slot, Close};
use crate::types::IdentifierAssignment;

struct Edit {
    at: usize,
    remove: usize,
    insert: String,
}

/// Apply identifier assignments to the document.
///
/// A marker that already carries the identifier is left alone, so running
/// the same assignments twice yields the same text.
pub fn write_identifiers(text: &str, assignments: &[IdentifierAssignment]) -> Result<String> {
    let mut sorted: Vec<&IdentifierAssignment> = assignments.iter().collect();
    sorted.sort_by_key(|a| a.offset);
    sorted.dedup_by(|b, a| a == b);

    let bytes = text.as_bytes();
    let mut edits = Vec::new();
    let mut previous: Option<(usize, usize)> = None;

    for assignment in sorted {
        let offset = assignment.offset;
        let stale = || ParseError::StaleAssignment { offset };

        if !text.get(offset..).is_some_and(|rest| rest.starts_with("{{")) {
            return Err(stale());
        }
        let Close::At(end) = find_close(bytes, offset) else {
            return Err(stale());
        };

        if let Some((first, first_end)) = previous {
            if offset < first_end {
                return Err(ParseError::OverlappingToken {
                    first,
                    second: offset,
                });
            }
        }
        previous = Some((offset, end + 2));

        let identifier = assignment.identifier.as_str();
        if !base52::is_identifier(identifier) {
            return Err(ParseError::InvalidIdentifier {
                value: identifier.to_string(),
            });
        }

        let body_start = offset + 2;
        let body = &text[body_start..end];
        if let Some(edit) = prefix_edit(body, body_start, identifier).map_err(|_| stale())? {
            edits.push(edit);
        }
    }

    let mut out = text.to_string();
    for edit in edits.into_iter().rev() {
        out.replace_range(edit.at..edit.at + edit.remove, &edit.insert);
    }
    Ok(out)
}

fn prefix_edit(body: &str, body_start: usize, identifier: &str) -> std::result::Result<Option<Edit>, String> {
    let Some(len) = prefix_slot(body) else {
        return Ok(Some(Edit {
            at: body_start,
            remove: 0,
            insert: format!("{identifier}>"),
        }));
    };

    let slot = &body[..len];
    let prefix = parse_prefix(slot)?;
    match prefix.identifier.as_deref() {
        Some(current) if current == identifier => Ok(None),
        Some(current) => {
            let mut pos = 0;
            for part in slot.split(',') {
                if part == current {
                    return Ok(Some(Edit {
                        at: body_start + pos,
                        remove: part.len(),
                        insert: identifier.to_string(),
                    }));
                }
                pos += part.len() + 1;
            }
            Err(format!("identifier {current:?} not found in prefix"))
        }
        None => Ok(Some(Edit {
            at: body_start + len,
            remove: 0,
            insert: format!(",{identifier}"),
        })),
    }
}
