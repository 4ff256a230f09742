//! Options for segmentation and card rendering.

use serde::{Deserialize, Serialize};

/// Knobs shared by the segmenter and the card synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Text substituted for an active answer on the front.
    pub placeholder: String,
    /// Wraps a hint shown after the placeholder.
    pub hint_open: String,
    pub hint_close: String,
    /// Prefix of quoted lines.
    pub quote_prefix: String,
    /// Content of the line that opens an explicit block.
    pub block_marker: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            placeholder: "[...]".to_string(),
            hint_open: " _(".to_string(),
            hint_close: ")_".to_string(),
            quote_prefix: ">".to_string(),
            block_marker: "?".to_string(),
        }
    }
}

impl Options {
    /// Front rendering of an active token.
    pub fn blank(&self, hint: Option<&str>) -> String {
        match hint {
            Some(hint) => format!("{}{}{}{}", self.placeholder, self.hint_open, hint, self.hint_close),
            None => self.placeholder.clone(),
        }
    }

    /// Strip the quote prefix (and one following space) from a line.
    pub fn strip_quote<'a>(&self, line: &'a str) -> Option<&'a str> {
        let rest = line.strip_prefix(self.quote_prefix.as_str())?;
        Some(rest.strip_prefix(' ').unwrap_or(rest))
    }

    /// Whether a line opens an explicit block.
    pub fn is_block_marker(&self, line: &str) -> bool {
        self.strip_quote(line.trim())
            .map(|rest| rest.trim() == self.block_marker)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_with_and_without_hint() {
        let options = Options::default();
        assert_eq!(options.blank(None), "[...]");
        assert_eq!(options.blank(Some("city")), "[...] _(city)_");
    }

    #[test]
    fn test_block_marker_variants() {
        let options = Options::default();
        assert!(options.is_block_marker("> ?"));
        assert!(options.is_block_marker(">?"));
        assert!(options.is_block_marker(">   ?  "));
        assert!(!options.is_block_marker("> ? maybe"));
        assert!(!options.is_block_marker("?"));
    }

    #[test]
    fn test_strip_quote() {
        let options = Options::default();
        assert_eq!(options.strip_quote("> text"), Some("text"));
        assert_eq!(options.strip_quote(">text"), Some("text"));
        assert_eq!(options.strip_quote(">"), Some(""));
        assert_eq!(options.strip_quote("text"), None);
    }

    #[test]
    fn test_partial_options_deserialize_over_defaults() {
        let options: Options = serde_json::from_str(r#"{"placeholder": "[___]"}"#).unwrap();
        assert_eq!(options.placeholder, "[___]");
        assert_eq!(options.quote_prefix, ">");
        assert_eq!(options.block_marker, "?");
    }
}
