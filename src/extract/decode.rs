// src/extract/decode.rs
// JSON/JS bodies often escape slashes and ampersands as \u002f and \u0026,
// which hides URLs from the pattern extractors. Decode them first.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

static UNICODE_ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\u([0-9a-fA-F]{4})").unwrap());

/// Replaces `\uXXXX` escapes with the character they stand for.
///
/// Surrogate halves (which can't be a char on their own) are left as written.
pub fn decode_chars(body: &str) -> String {
    if !body.contains("\\u") {
        return body.to_string();
    }

    let decoded: Cow<'_, str> = UNICODE_ESCAPE.replace_all(body, |caps: &Captures| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_slashes_and_ampersands() {
        assert_eq!(
            decode_chars(r"https:\u002f\u002fexample.com\u002fa?x=1\u0026y=2"),
            "https://example.com/a?x=1&y=2"
        );
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(decode_chars("no escapes / here"), "no escapes / here");
    }

    #[test]
    fn test_lone_surrogate_kept() {
        assert_eq!(decode_chars(r"\ud800 ok"), r"\ud800 ok");
    }
}
