//! Context windows.

use crate::types::{ClozeToken, Scope};
use std::ops::RangeInclusive;

/// Units covered by a scope around `unit`, clamped to the document.
pub fn window(unit: usize, scope: Scope, unit_count: usize) -> RangeInclusive<usize> {
    let last = unit_count.saturating_sub(1);
    let start = unit.saturating_sub(scope.before as usize);
    let end = unit.saturating_add(scope.after as usize).min(last);
    start..=end
}

/// Context units for a token in document order.
pub fn resolve(token: &ClozeToken, unit_count: usize) -> Vec<usize> {
    window(token.unit, token.effective_scope(), unit_count).collect()
}

/// Sorted union of several contexts.
pub fn union<'a>(contexts: impl IntoIterator<Item = &'a [usize]>) -> Vec<usize> {
    let mut all: Vec<usize> = contexts.into_iter().flatten().copied().collect();
    all.sort_unstable();
    all.dedup();
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn window_defaults_to_owning_unit() {
        assert_eq!(window(2, Scope::NONE, 5), 2..=2);
    }

    #[test]
    fn window_clamps_at_document_edges() {
        assert_eq!(window(0, Scope::new(3, 0), 4), 0..=0);
        assert_eq!(window(3, Scope::new(0, 5), 4), 3..=3);
        assert_eq!(window(1, Scope::new(1, 1), 4), 0..=2);
    }

    #[test]
    fn list_scope_takes_intro_paragraph() {
        assert_eq!(window(1, Scope::LIST_ITEM, 2), 0..=1);
    }

    #[test]
    fn union_sorts_and_dedups() {
        let a = [2, 3];
        let b = [0, 2];
        assert_eq!(union([&a[..], &b[..]]), vec![0, 2, 3]);
    }
}
