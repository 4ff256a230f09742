//! Card synthesis: rendering front and back text for a card unit.

use crate::options::Options;
use crate::types::{CardKind, CardSpec, CardUnit, ClozeToken, Role, Unit};

/// Render one card.
pub fn synthesize(card: &CardUnit, units: &[Unit], tokens: &[ClozeToken], options: &Options) -> CardSpec {
    let mut front = Vec::with_capacity(card.context.len());
    let mut back = Vec::with_capacity(card.context.len());
    for &u in &card.context {
        let (f, b) = render_unit(&units[u], tokens, card, options);
        front.push(f);
        back.push(b);
    }

    let active: Vec<ClozeToken> = card.active.iter().map(|&t| tokens[t].clone()).collect();

    let extras: Vec<&str> = active.iter().filter_map(|t| t.extra.as_deref()).collect();
    let extra = if extras.is_empty() {
        None
    } else {
        Some(extras.join("\n\n"))
    };

    let identifier = match card.kind {
        CardKind::Grouped { .. } => card
            .members
            .iter()
            .find_map(|&m| tokens[m].identifier.clone()),
        CardKind::Singleton | CardKind::Sequenced { .. } => {
            active.first().and_then(|t| t.identifier.clone())
        }
    };

    CardSpec {
        kind: card.kind.clone(),
        front: front.join("\n\n"),
        back: back.join("\n\n"),
        extra,
        line: active.first().map(|t| t.line).unwrap_or_default(),
        tokens: active,
        context: card.context.clone(),
        identifier,
    }
}

/// Render every card of a document.
pub fn synthesize_all(
    cards: &[CardUnit],
    units: &[Unit],
    tokens: &[ClozeToken],
    options: &Options,
) -> Vec<CardSpec> {
    cards
        .iter()
        .map(|card| synthesize(card, units, tokens, options))
        .collect()
}

fn render_unit(unit: &Unit, tokens: &[ClozeToken], card: &CardUnit, options: &Options) -> (String, String) {
    let content = unit.content.as_str();
    let mut front = Rendering::with_capacity(content.len());
    let mut back = Rendering::with_capacity(content.len());
    let mut cursor = 0;

    for (idx, token) in tokens.iter().enumerate().filter(|(_, t)| t.unit == unit.index) {
        front.text.push_str(&content[cursor..token.local.start]);
        back.text.push_str(&content[cursor..token.local.start]);
        match card.role(idx) {
            Role::Active => {
                front.text.push_str(&options.blank(token.hint.as_deref()));
                back.text.push_str(&token.answer);
            }
            Role::Revealed => {
                front.text.push_str(&token.answer);
                back.text.push_str(&token.answer);
            }
            Role::Absent => {
                front.mark_removed();
                back.mark_removed();
            }
        }
        cursor = token.local.end;
    }
    front.text.push_str(&content[cursor..]);
    back.text.push_str(&content[cursor..]);

    (front.finish(), back.finish())
}

/// Rendered text plus the offsets where absent tokens were cut out.
struct Rendering {
    text: String,
    removals: Vec<usize>,
}

impl Rendering {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            removals: Vec::new(),
        }
    }

    fn mark_removed(&mut self) {
        self.removals.push(self.text.len());
    }

    /// Drop lines that a removal left with nothing but whitespace or a list bullet.
    fn finish(self) -> String {
        if self.removals.is_empty() {
            return self.text;
        }

        let mut kept = Vec::new();
        let mut start = 0;
        for line in self.text.split('\n') {
            let end = start + line.len();
            let touched = self.removals.iter().any(|&at| (start..=end).contains(&at));
            if !(touched && is_emptied(line)) {
                kept.push(line);
            }
            start = end + 1;
        }
        kept.join("\n")
    }
}

fn is_emptied(line: &str) -> bool {
    let t = line.trim();
    if matches!(t, "" | "-" | "*" | "+") {
        return true;
    }
    let digits = t.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && matches!(&t[digits..], "." | ")")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::build_card_units;
    use crate::scanner::scan;
    use crate::segmenter::segment;
    use pretty_assertions::assert_eq;

    fn cards(text: &str) -> Vec<CardSpec> {
        let options = Options::default();
        let units = segment(text, &options).unwrap();
        let tokens: Vec<ClozeToken> = units.iter().flat_map(|u| scan(u).unwrap()).collect();
        let card_units = build_card_units(&tokens, units.len()).unwrap();
        synthesize_all(&card_units, &units, &tokens, &options)
    }

    #[test]
    fn render_basic_card() {
        let cards = cards("The capital of France is {{Paris}}.");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].front, "The capital of France is [...].");
        assert_eq!(cards[0].back, "The capital of France is Paris.");
        assert_eq!(cards[0].line, 1);
    }

    #[test]
    fn render_hint_and_extra() {
        let cards = cards("{{Paris|city<Capital since 508}} is lovely.");
        assert_eq!(cards[0].front, "[...] _(city)_ is lovely.");
        assert_eq!(cards[0].back, "Paris is lovely.");
        assert_eq!(cards[0].extra.as_deref(), Some("Capital since 508"));
        assert_eq!(cards[0].back_with_extra(), "Paris is lovely.\n\nCapital since 508");
    }

    #[test]
    fn other_tokens_are_revealed() {
        let cards = cards("{{Rust}} was started by {{Graydon}}.");
        assert_eq!(cards[0].front, "[...] was started by Graydon.");
        assert_eq!(cards[1].front, "Rust was started by [...].");
    }

    #[test]
    fn grouped_card_blanks_all_members() {
        let cards = cards("Primary colors: {{1>red}}, {{1>blue}}, and {{1>yellow}}.");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].front, "Primary colors: [...], [...], and [...].");
        assert_eq!(cards[0].back, "Primary colors: red, blue, and yellow.");
    }

    #[test]
    fn sequence_reveals_one_step_at_a_time() {
        let cards = cards("{{1.1>Mercury}}\n{{1.2>Venus}}\n{{1.3>Earth}}");
        let fronts: Vec<&str> = cards.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, vec!["[...]", "Mercury\n[...]", "Mercury\nVenus\n[...]"]);
        assert_eq!(cards[0].back, "Mercury");
        assert_eq!(cards[2].back, "Mercury\nVenus\nEarth");

        let listed = self::cards("Planets:\n- {{1.1>Mercury}}\n- {{1.2>Venus}}\n3. {{1.3>Earth}}");
        assert_eq!(listed[0].front, "Planets:\n- [...]");
        assert_eq!(listed[1].back, "Planets:\n- Mercury\n- Venus");
    }

    #[test]
    fn nul_bytes_outside_markers_survive() {
        let cards = cards("a\0b {{s.1>x}}\n\0\n{{s.2>y}}");
        assert_eq!(cards[0].front, "a\0b [...]\n\0");
        assert_eq!(cards[0].back, "a\0b x\n\0");
        assert_eq!(cards[1].front, "a\0b x\n\0\n[...]");
    }

    #[test]
    fn list_item_in_block_stays_in_block() {
        let cards = cards("Unrelated paragraph outside.\n\n> ?\n> Colors:\n> - {{red}}");
        assert_eq!(cards[0].context, vec![1]);
        assert_eq!(cards[0].front, "Colors:\n- [...]");
    }

    #[test]
    fn absent_inline_token_keeps_line() {
        let cards = cards("First {{s.1>one}} then {{s.2>two}}.");
        assert_eq!(cards[0].front, "First [...] then .");
        assert_eq!(cards[1].front, "First one then [...].");
    }

    #[test]
    fn list_item_includes_intro_paragraph() {
        let cards = cards("Planets:\n\n- {{Mercury}}");
        assert_eq!(cards[0].front, "Planets:\n\n- [...]");
        assert_eq!(cards[0].context, vec![0, 1]);
    }

    #[test]
    fn explicit_scope_pulls_next_paragraph() {
        let cards = cards("Term: {{ownership}}[1]\n\nEach value has one owner.\n\nUnrelated.");
        assert_eq!(cards[0].front, "Term: [...]\n\nEach value has one owner.");
    }

    #[test]
    fn explicit_block_renders_without_quotes() {
        let cards = cards("> ?\n> fn {{main}}() {}\n>\n> entry point");
        assert_eq!(cards[0].front, "fn [...]() {}\n\nentry point");
    }

    #[test]
    fn identifier_follows_card_kind() {
        let cards = cards("{{abc>x}}\n\n{{g1>y}} {{g1,dEf>z}}\n\n{{s.1,ghI>p}} {{s.2>q}}");
        assert_eq!(cards[0].identifier.as_deref(), Some("abc"));
        assert_eq!(cards[1].identifier.as_deref(), Some("dEf"));
        assert_eq!(cards[2].identifier.as_deref(), Some("ghI"));
        assert_eq!(cards[3].identifier, None);
    }
}
