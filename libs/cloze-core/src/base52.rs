//! Base52 note identifiers.
//!
//! Letters only, case-sensitive, so an identifier can never be mistaken
//! for a numeric group id inside a marker prefix.

use crate::error::{ParseError, Result};

const ALPHABET: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Encode a note id.
pub fn encode(mut value: u64) -> String {
    if value == 0 {
        return (ALPHABET[0] as char).to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 52) as usize]);
        value /= 52;
    }
    digits.iter().rev().map(|&b| b as char).collect()
}

/// Decode an identifier back to its note id.
pub fn decode(identifier: &str) -> Result<u64> {
    let invalid = || ParseError::InvalidIdentifier {
        value: identifier.to_string(),
    };

    if identifier.is_empty() {
        return Err(invalid());
    }

    identifier.bytes().try_fold(0u64, |acc, b| {
        let digit = digit_value(b).ok_or_else(invalid)?;
        acc.checked_mul(52)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(invalid)
    })
}

/// Whether the string has the shape of an identifier (non-empty, ASCII letters).
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphabetic())
}

fn digit_value(b: u8) -> Option<u64> {
    match b {
        b'a'..=b'z' => Some((b - b'a') as u64),
        b'A'..=b'Z' => Some((b - b'A') as u64 + 26),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode(0), "a");
        assert_eq!(encode(51), "Z");
        assert_eq!(encode(52), "ba");
        assert_eq!(encode(1_234_567_890), "dmSkYk");
        assert_eq!(encode(1_700_000_000_000), "bHZoMySq");
    }

    #[test]
    fn test_decode_known_values() {
        assert_eq!(decode("a").unwrap(), 0);
        assert_eq!(decode("ba").unwrap(), 52);
        assert_eq!(decode("dmSkYk").unwrap(), 1_234_567_890);
    }

    #[test]
    fn test_extremes_survive_decoding() {
        assert_eq!(encode(u64::MAX), "cxFMKcQbCDip");
        assert_eq!(decode("cxFMKcQbCDip").unwrap(), u64::MAX);
    }

    #[test]
    fn test_decode_rejects_digits_and_empty() {
        assert!(matches!(decode("ab1"), Err(ParseError::InvalidIdentifier { .. })));
        assert!(matches!(decode(""), Err(ParseError::InvalidIdentifier { .. })));
    }

    #[test]
    fn test_decode_rejects_overflow() {
        assert!(decode("ZZZZZZZZZZZZZZ").is_err());
    }

    #[test]
    fn test_case_matters() {
        assert_ne!(decode("abc").unwrap(), decode("ABC").unwrap());
        assert!(is_identifier("abcXYZ"));
        assert!(!is_identifier("abc_1"));
        assert!(!is_identifier(""));
    }
}
