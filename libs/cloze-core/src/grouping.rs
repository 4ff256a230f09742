//! Turning tokens into card units.
//!
//! Ungrouped tokens become one card each. Tokens sharing a group id anywhere
//! in the document become one card (unordered group) or one card per member
//! (ordered group, revealed one step at a time).

use crate::error::{ParseError, Result};
use crate::scope;
use crate::types::{CardKind, CardUnit, ClozeToken};
use std::collections::HashMap;

enum Entry<'a> {
    Single(usize),
    Group { group: &'a str, members: Vec<usize> },
}

/// Build card units in order of each card's first token.
pub fn build_card_units(tokens: &[ClozeToken], unit_count: usize) -> Result<Vec<CardUnit>> {
    let contexts: Vec<Vec<usize>> = tokens
        .iter()
        .map(|token| scope::resolve(token, unit_count))
        .collect();

    let mut entries: Vec<Entry> = Vec::new();
    let mut by_group: HashMap<&str, usize> = HashMap::new();
    for (idx, token) in tokens.iter().enumerate() {
        let Some(group) = token.group.as_deref() else {
            entries.push(Entry::Single(idx));
            continue;
        };
        match by_group.get(group) {
            Some(&entry) => {
                if let Entry::Group { members, .. } = &mut entries[entry] {
                    members.push(idx);
                }
            }
            None => {
                by_group.insert(group, entries.len());
                entries.push(Entry::Group {
                    group,
                    members: vec![idx],
                });
            }
        }
    }

    let mut cards = Vec::with_capacity(tokens.len());
    for entry in entries {
        match entry {
            Entry::Single(idx) => cards.push(CardUnit {
                kind: CardKind::Singleton,
                members: vec![idx],
                active: vec![idx],
                absent: Vec::new(),
                context: contexts[idx].clone(),
            }),
            Entry::Group { group, members } => {
                if tokens[members[0]].order.is_some() {
                    cards.extend(sequence(group, members, tokens, &contexts)?);
                } else {
                    cards.push(unordered(group, members, tokens, &contexts)?);
                }
            }
        }
    }

    Ok(cards)
}

fn unordered(
    group: &str,
    members: Vec<usize>,
    tokens: &[ClozeToken],
    contexts: &[Vec<usize>],
) -> Result<CardUnit> {
    if let Some(&stray) = members.iter().find(|&&m| tokens[m].order.is_some()) {
        return Err(ParseError::MalformedGroup {
            group: group.to_string(),
            offset: tokens[stray].offset(),
            line: tokens[stray].line,
        });
    }

    let context = scope::union(members.iter().map(|&m| contexts[m].as_slice()));
    Ok(CardUnit {
        kind: CardKind::Grouped {
            group: group.to_string(),
        },
        active: members.clone(),
        members,
        absent: Vec::new(),
        context,
    })
}

fn sequence(
    group: &str,
    mut members: Vec<usize>,
    tokens: &[ClozeToken],
    contexts: &[Vec<usize>],
) -> Result<Vec<CardUnit>> {
    if let Some(&missing) = members.iter().find(|&&m| tokens[m].order.is_none()) {
        return Err(ParseError::MissingOrder {
            group: group.to_string(),
            offset: tokens[missing].offset(),
            line: tokens[missing].line,
        });
    }

    // Stable sort keeps document order among equal orders, so the
    // duplicate reported is the later one.
    members.sort_by_key(|&m| tokens[m].order);
    for pair in members.windows(2) {
        let later = &tokens[pair[1]];
        if tokens[pair[0]].order == later.order {
            return Err(ParseError::DuplicateOrder {
                group: group.to_string(),
                order: later.order.unwrap_or_default(),
                offset: later.offset(),
                line: later.line,
            });
        }
    }

    let total = members.len();
    let cards = (0..total)
        .map(|k| CardUnit {
            kind: CardKind::Sequenced {
                group: group.to_string(),
                position: k + 1,
                total,
            },
            members: members.clone(),
            active: vec![members[k]],
            absent: members[k + 1..].to_vec(),
            context: scope::union(members[..=k].iter().map(|&m| contexts[m].as_slice())),
        })
        .collect();

    Ok(cards)
}
