//! Cloze marker scanner.
//!
//! # Syntax
//! ```markdown
//! {{answer}}                     basic
//! {{answer|hint<extra}}          hint and extra (extra has no closing delimiter)
//! {{1>answer}}                   grouped
//! {{1.2>answer}}                 sequenced
//! {{1.2,bHZo>answer}}            with a note identifier, components in either order
//! {{answer}}[-1,2]               scope: one unit before, two after
//! ```

use crate::base52;
use crate::error::{ParseError, Result};
use crate::types::{ClozeToken, Scope, Unit, UnitKind};

/// Outcome of scanning one unit.
///
/// Malformed markers are collected so a whole document can be reported at once.
#[derive(Debug, Default)]
pub struct Scan {
    pub tokens: Vec<ClozeToken>,
    pub errors: Vec<ParseError>,
}

/// Scan a unit, failing on the first error of any kind.
pub fn scan(unit: &Unit) -> Result<Vec<ClozeToken>> {
    let scan = scan_collect(unit)?;
    match ParseError::collect(scan.errors) {
        Some(error) => Err(error),
        None => Ok(scan.tokens),
    }
}

/// Scan a unit, collecting malformed markers.
///
/// Returns `Err` only for nested markers, after which the unit cannot be trusted.
pub fn scan_collect(unit: &Unit) -> Result<Scan> {
    let content = unit.content.as_str();
    let bytes = content.as_bytes();
    let mut scan = Scan::default();

    let mut i = 0;
    while i + 1 < bytes.len() {
        if !(bytes[i] == b'{' && bytes[i + 1] == b'{') {
            i += 1;
            continue;
        }

        let end = match find_close(bytes, i) {
            Close::At(end) => end,
            Close::Nested(inner) => {
                return Err(ParseError::NestedCloze {
                    unit: unit.index,
                    offset: unit.to_source(inner),
                    outer: unit.to_source(i),
                    line: unit.line_at(inner).number,
                });
            }
            Close::Unterminated => {
                scan.errors.push(malformed(unit, i, "unterminated marker, missing '}}'"));
                break;
            }
        };

        let mut stop = end + 2;
        let scope = match parse_scope_suffix(&content[stop..]) {
            Some((scope, len)) => {
                stop += len;
                Some(scope)
            }
            None => None,
        };

        match parse_body(&content[i + 2..end]) {
            Ok(body) => {
                let line = unit.line_at(i);
                scan.tokens.push(ClozeToken {
                    answer: body.answer,
                    hint: body.hint,
                    extra: body.extra,
                    group: body.prefix.group,
                    order: body.prefix.order,
                    identifier: body.prefix.identifier,
                    scope,
                    // Blocks carry their own list intro.
                    in_list: unit.kind == UnitKind::Paragraph && is_list_item(unit.line_text(line)),
                    unit: unit.index,
                    local: i..stop,
                    source: unit.to_source(i)..unit.to_source(stop),
                    line: line.number,
                });
            }
            Err(reason) => scan.errors.push(malformed(unit, i, reason)),
        }

        i = stop;
    }

    Ok(scan)
}

fn malformed(unit: &Unit, local: usize, reason: impl Into<String>) -> ParseError {
    ParseError::MalformedCloze {
        unit: unit.index,
        offset: unit.to_source(local),
        line: unit.line_at(local).number,
        reason: reason.into(),
    }
}

/// Where a marker opened at `start` closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Close {
    /// Index of the first brace of the closing `}}`.
    At(usize),
    /// Index of a `{{` opened at marker level.
    Nested(usize),
    Unterminated,
}

/// Find the closing braces of the marker whose `{{` is at `start`.
///
/// Every `{` inside the marker opens a level and every `}` closes one, so
/// formula braces such as `\frac{1}{2}` or `x^{a_{b}}` stay balanced. At
/// marker level `}}` closes, a lone `}` is literal, and `{{` is a nested marker.
pub(crate) fn find_close(bytes: &[u8], start: usize) -> Close {
    const MARKER_LEVEL: usize = 2;
    let mut depth = MARKER_LEVEL;
    let mut j = start + 2;

    while j < bytes.len() {
        match bytes[j] {
            b'{' => {
                if depth == MARKER_LEVEL && bytes.get(j + 1) == Some(&b'{') {
                    return Close::Nested(j);
                }
                depth += 1;
            }
            b'}' => {
                if depth == MARKER_LEVEL {
                    if bytes.get(j + 1) == Some(&b'}') {
                        return Close::At(j);
                    }
                } else {
                    depth -= 1;
                }
            }
            _ => {}
        }
        j += 1;
    }

    Close::Unterminated
}

/// Parsed identifier prefix (`group[.order]`, identifier, either order).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Prefix {
    pub group: Option<String>,
    pub order: Option<u32>,
    pub identifier: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
struct Body {
    prefix: Prefix,
    answer: String,
    hint: Option<String>,
    extra: Option<String>,
}

fn parse_body(body: &str) -> std::result::Result<Body, String> {
    let (prefix, rest) = match prefix_slot(body) {
        Some(len) => (parse_prefix(&body[..len])?, &body[len + 1..]),
        None => (Prefix::default(), body),
    };

    let (answer, hint, extra) = match find_top_level(rest, b"|<") {
        Some(p) if rest.as_bytes()[p] == b'|' => {
            let after = &rest[p + 1..];
            match find_top_level(after, b"<") {
                Some(q) => (&rest[..p], Some(&after[..q]), Some(&after[q + 1..])),
                None => (&rest[..p], Some(after), None),
            }
        }
        Some(p) => (&rest[..p], None, Some(&rest[p + 1..])),
        None => (rest, None, None),
    };

    let answer = normalize_whitespace(answer);
    if answer.is_empty() {
        return Err("empty answer".to_string());
    }

    let hint = hint.map(normalize_whitespace).filter(|h| !h.is_empty());
    let extra = extra.map(normalize_whitespace).filter(|e| !e.is_empty());
    if extra.as_deref().map(|e| e.ends_with('>')).unwrap_or(false) {
        return Err("extra text runs to '}}' and must not be closed with '>'".to_string());
    }

    Ok(Body {
        prefix,
        answer,
        hint,
        extra,
    })
}

/// Length of the identifier prefix before its `>`, if the body has one.
///
/// The prefix must be reached before any answer syntax and may only hold
/// ASCII alphanumerics, `.` and `,`; otherwise `>` is answer text.
pub(crate) fn prefix_slot(body: &str) -> Option<usize> {
    for (idx, b) in body.bytes().enumerate() {
        match b {
            b'>' => return Some(idx),
            b'.' | b',' => {}
            _ if b.is_ascii_alphanumeric() => {}
            _ => return None,
        }
    }
    None
}

pub(crate) fn parse_prefix(slot: &str) -> std::result::Result<Prefix, String> {
    let parts: Vec<&str> = slot.split(',').collect();
    if parts.len() > 2 {
        return Err(format!("identifier prefix {slot:?} has more than two components"));
    }

    let mut prefix = Prefix::default();
    for part in parts {
        if part.is_empty() {
            return Err(format!("empty component in identifier prefix {slot:?}"));
        }

        if let Some((group, order)) = part.split_once('.') {
            if group.is_empty() {
                return Err("sequence order without group id".to_string());
            }
            let order = order
                .parse::<u32>()
                .map_err(|_| format!("invalid sequence order {order:?}"))?;
            set_group(&mut prefix, group)?;
            prefix.order = Some(order);
        } else if base52::is_identifier(part) {
            if prefix.identifier.is_some() {
                return Err(format!("two note identifiers in prefix {slot:?}"));
            }
            prefix.identifier = Some(part.to_string());
        } else {
            set_group(&mut prefix, part)?;
        }
    }

    Ok(prefix)
}

fn set_group(prefix: &mut Prefix, group: &str) -> std::result::Result<(), String> {
    if prefix.group.is_some() {
        return Err(format!("two group ids in prefix ({group:?} repeated)"));
    }
    prefix.group = Some(group.to_string());
    Ok(())
}

/// First top-level occurrence of any target byte.
///
/// Brace groups, `$…$`/`$$…$$` math and backtick code spans are skipped.
fn find_top_level(s: &str, targets: &[u8]) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'$' | b'`' if depth == 0 => {
                let next = match (b, bytes.get(i + 1)) {
                    (b'$', Some(&b'$')) => s[i + 2..].find("$$").map(|c| i + 2 + c + 2),
                    (b'$', _) => inline_math_close(bytes, i + 1).map(|c| c + 1),
                    _ => s[i + 1..].find('`').map(|c| i + 1 + c + 1),
                };
                if let Some(next) = next {
                    i = next;
                    continue;
                }
            }
            _ if depth == 0 && targets.contains(&b) => return Some(i),
            _ => {}
        }
        i += 1;
    }

    None
}

/// Closing `$` of inline math whose content starts at `open`.
///
/// Math content must start with a non-space, and the closing `$` must follow
/// a non-space and not precede a digit, so prices like `$5 or $10` stay text.
fn inline_math_close(bytes: &[u8], open: usize) -> Option<usize> {
    if !bytes.get(open).is_some_and(|b| !b.is_ascii_whitespace()) {
        return None;
    }
    (open + 1..bytes.len()).find(|&j| {
        bytes[j] == b'$'
            && !bytes[j - 1].is_ascii_whitespace()
            && bytes[j - 1] != b'\\'
            && !bytes.get(j + 1).is_some_and(u8::is_ascii_digit)
    })
}

/// Collapse reflowed text: single newlines and space runs become one space,
/// blank-line breaks are kept.
fn normalize_whitespace(text: &str) -> String {
    let mut chunks = Vec::new();
    let mut words: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !words.is_empty() {
                chunks.push(words.join(" "));
                words.clear();
            }
        } else {
            words.extend(line.split_whitespace());
        }
    }
    if !words.is_empty() {
        chunks.push(words.join(" "));
    }

    chunks.join("\n\n")
}

/// Parse a `[n]`, `[-n]` or `[a,b]` suffix; returns the scope and bytes consumed.
fn parse_scope_suffix(s: &str) -> Option<(Scope, usize)> {
    let inner_end = s.strip_prefix('[')?.find(']')?;
    let inner = &s[1..1 + inner_end];
    let consumed = inner_end + 2;

    // `[text](url)` is a link, not a scope.
    if s[consumed..].starts_with('(') {
        return None;
    }

    let parse = |part: &str| -> Option<i64> {
        let part = part.trim();
        let digits = part.strip_prefix(['-', '+']).unwrap_or(part);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse::<i64>().ok()
    };
    let magnitude = |v: i64| u32::try_from(v.unsigned_abs()).ok();

    let scope = match inner.split_once(',') {
        Some((before, after)) => Scope::new(magnitude(parse(before)?)?, magnitude(parse(after)?)?),
        None => {
            let value = parse(inner)?;
            if inner.trim_start().starts_with('-') {
                Scope::new(magnitude(value)?, 0)
            } else {
                Scope::new(0, magnitude(value)?)
            }
        }
    };

    Some((scope, consumed))
}

/// Whether a line is a markdown list item.
fn is_list_item(line: &str) -> bool {
    let t = line.trim_start();
    if let Some(rest) = t.strip_prefix(['-', '*', '+']) {
        return rest.starts_with(' ');
    }
    let digits = t.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && (t[digits..].starts_with(". ") || t[digits..].starts_with(") "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::segmenter::segment;
    use pretty_assertions::assert_eq;

    fn tokens(text: &str) -> Vec<ClozeToken> {
        let units = segment(text, &Options::default()).unwrap();
        units.iter().flat_map(|u| scan(u).unwrap()).collect()
    }

    fn scan_err(text: &str) -> ParseError {
        let units = segment(text, &Options::default()).unwrap();
        scan(&units[0]).unwrap_err()
    }

    #[test]
    fn parse_basic_cloze() {
        let t = tokens("The capital of France is {{Paris}}.");
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].answer, "Paris");
        assert_eq!(t[0].hint, None);
        assert_eq!(t[0].extra, None);
        assert_eq!(t[0].group, None);
        assert_eq!(t[0].source, 25..34);
        assert_eq!(t[0].line, 1);
    }

    #[test]
    fn parse_hint_and_extra() {
        let t = tokens("{{Python|programming language<created by Guido}}");
        assert_eq!(t[0].answer, "Python");
        assert_eq!(t[0].hint.as_deref(), Some("programming language"));
        assert_eq!(t[0].extra.as_deref(), Some("created by Guido"));
    }

    #[test]
    fn parse_extra_without_hint() {
        let t = tokens("{{pip<PyPI has packages}}");
        assert_eq!(t[0].answer, "pip");
        assert_eq!(t[0].hint, None);
        assert_eq!(t[0].extra.as_deref(), Some("PyPI has packages"));
    }

    #[test]
    fn parse_group_sequence_and_identifier() {
        let t = tokens("{{1>a}} {{1.2>b}} {{abcXYZ>c}} {{1.3,abcXYZ>d}} {{abcXYZ,7>e}}");
        assert_eq!((t[0].group.as_deref(), t[0].order), (Some("1"), None));
        assert_eq!((t[1].group.as_deref(), t[1].order), (Some("1"), Some(2)));
        assert_eq!(t[2].identifier.as_deref(), Some("abcXYZ"));
        assert_eq!(t[2].group, None);
        assert_eq!(t[3].identifier.as_deref(), Some("abcXYZ"));
        assert_eq!(t[3].order, Some(3));
        assert_eq!(t[4].group.as_deref(), Some("7"));
        assert_eq!(t[4].identifier.as_deref(), Some("abcXYZ"));
    }

    #[test]
    fn parse_alphanumeric_group() {
        let t = tokens("{{poem2>line}}");
        assert_eq!(t[0].group.as_deref(), Some("poem2"));
        assert_eq!(t[0].identifier, None);
    }

    #[test]
    fn greater_than_in_answer_is_not_a_prefix() {
        let t = tokens("{{5 > 3}} and {{x+y>3}}");
        assert_eq!(t[0].answer, "5 > 3");
        assert_eq!(t[0].group, None);
        assert_eq!(t[1].answer, "x+y>3");
    }

    #[test]
    fn parse_nested_formula_braces() {
        let t = tokens(r"Half is {{$\frac{1}{2}$}} and {{$x^{a_{b}}$}}.");
        assert_eq!(t[0].answer, r"$\frac{1}{2}$");
        assert_eq!(t[1].answer, "$x^{a_{b}}$");
    }

    #[test]
    fn delimiters_inside_math_are_answer_text() {
        let t = tokens("{{$|x| < 1$|absolute value}}");
        assert_eq!(t[0].answer, "$|x| < 1$");
        assert_eq!(t[0].hint.as_deref(), Some("absolute value"));
    }

    #[test]
    fn currency_dollars_are_not_math() {
        let t = tokens("{{$5|price<costs $10}}");
        assert_eq!(t[0].answer, "$5");
        assert_eq!(t[0].hint.as_deref(), Some("price"));
        assert_eq!(t[0].extra.as_deref(), Some("costs $10"));
    }

    #[test]
    fn stray_closing_brace_is_literal() {
        let t = tokens("{{a } b}}");
        assert_eq!(t[0].answer, "a } b");
    }

    #[test]
    fn reflowed_answer_is_normalized() {
        let t = tokens("A {{long\nanswer   here}} spans lines.");
        assert_eq!(t[0].answer, "long answer here");
        assert_eq!(t[0].source, 2..24);
    }

    #[test]
    fn parse_scope_suffixes() {
        let t = tokens("{{a}}[-1] {{b}}[2] {{c}}[-1, 2] {{d}}[+1] {{e}}[link](url) {{f}}[x]");
        assert_eq!(t[0].scope, Some(Scope::new(1, 0)));
        assert_eq!(t[1].scope, Some(Scope::new(0, 2)));
        assert_eq!(t[2].scope, Some(Scope::new(1, 2)));
        assert_eq!(t[3].scope, Some(Scope::new(0, 1)));
        assert_eq!(t[4].scope, None);
        assert_eq!(t[5].scope, None);
        assert_eq!(t[0].local, 0..9);
    }

    #[test]
    fn list_items_are_detected() {
        let t = tokens("Colors:\n- {{red}}\n2. {{blue}}\nplain {{green}}");
        assert!(t[0].in_list);
        assert!(t[1].in_list);
        assert!(!t[2].in_list);
        assert_eq!(t[0].effective_scope(), Scope::LIST_ITEM);
    }

    #[test]
    fn list_items_in_blocks_keep_block_scope() {
        let t = tokens("Intro.\n\n> ?\n> Colors:\n> - {{red}}");
        assert!(!t[0].in_list);
        assert_eq!(t[0].effective_scope(), Scope::NONE);
    }

    #[test]
    fn tokens_in_blocks_map_to_source() {
        let text = "> ?\n> Rust is {{fast}}.";
        let t = tokens(text);
        assert_eq!(&text[t[0].source.clone()], "{{fast}}");
        assert_eq!(t[0].line, 2);
    }

    #[test]
    fn reject_empty_answer() {
        let err = scan_err("{{}}");
        assert!(matches!(err, ParseError::MalformedCloze { ref reason, .. } if reason == "empty answer"));
        assert!(matches!(scan_err("{{  |hint}}"), ParseError::MalformedCloze { .. }));
    }

    #[test]
    fn reject_closed_extra() {
        let err = scan_err("{{answer<extra>}}");
        assert!(matches!(err, ParseError::MalformedCloze { .. }));
    }

    #[test]
    fn reject_order_without_group() {
        let err = scan_err("{{.2>answer}}");
        assert!(
            matches!(err, ParseError::MalformedCloze { ref reason, .. } if reason.contains("without group"))
        );
    }

    #[test]
    fn reject_bad_prefixes() {
        assert!(matches!(scan_err("{{>a}}"), ParseError::MalformedCloze { .. }));
        assert!(matches!(scan_err("{{1,2>a}}"), ParseError::MalformedCloze { .. }));
        assert!(matches!(scan_err("{{ab,cd>a}}"), ParseError::MalformedCloze { .. }));
        assert!(matches!(scan_err("{{1.x>a}}"), ParseError::MalformedCloze { .. }));
        assert!(matches!(scan_err("{{1,ab,cd>a}}"), ParseError::MalformedCloze { .. }));
    }

    #[test]
    fn reject_unterminated() {
        let err = scan_err("Missing {{close here");
        assert!(matches!(err, ParseError::MalformedCloze { offset: 8, line: 1, .. }));
    }

    #[test]
    fn reject_nested_marker() {
        let err = scan_err("{{outer {{inner}} text}}");
        assert!(matches!(err, ParseError::NestedCloze { offset: 8, outer: 0, .. }));
    }

    #[test]
    fn collect_keeps_going_after_malformed() {
        let units = segment("{{}} then {{ok}} then {{a<b>}}", &Options::default()).unwrap();
        let scan = scan_collect(&units[0]).unwrap();
        assert_eq!(scan.tokens.len(), 1);
        assert_eq!(scan.tokens[0].answer, "ok");
        assert_eq!(scan.errors.len(), 2);
    }

    #[test]
    fn find_close_cases() {
        assert_eq!(find_close(b"{{a}}", 0), Close::At(3));
        assert_eq!(find_close(b"{{a{b}}}", 0), Close::At(6));
        assert_eq!(find_close(b"{{a", 0), Close::Unterminated);
        assert_eq!(find_close(b"{{a{{b}}", 0), Close::Nested(3));
    }

    #[test]
    fn is_list_item_cases() {
        assert!(is_list_item("- item"));
        assert!(is_list_item("  * item"));
        assert!(is_list_item("10) item"));
        assert!(!is_list_item("-item"));
        assert!(!is_list_item("2024 was a year"));
        assert!(!is_list_item("plain"));
    }
}
