//! Diagram source preparation.
//!
//! - [`decode_source`] turns raw bytes into text, transcoding legacy input
//! - [`wrap_source`] frames a diagram body with the markers PlantUML expects
//! - [`strip_markers`] undoes that framing for standalone diagram files

use std::borrow::Cow;

use crate::consts::{END_MARKER, START_MARKER};

/// Decode raw diagram bytes into text.
///
/// Valid UTF-8 is borrowed unchanged. Anything else is treated as
/// ISO-8859-1, which maps every byte to the code point of the same value.
#[must_use]
pub fn decode_source(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().copied().map(char::from).collect()),
    }
}

/// Frame a diagram body with `@startuml` / `@enduml`.
///
/// The body is passed through unchanged. A line break is inserted before the
/// closing marker only when the body does not already end with one.
#[must_use]
pub fn wrap_source(body: &str) -> String {
    let mut document = String::with_capacity(body.len() + START_MARKER.len() + END_MARKER.len() + 2);
    document.push_str(START_MARKER);
    document.push('\n');
    document.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        document.push('\n');
    }
    document.push_str(END_MARKER);
    document
}

/// Body of a diagram document, without its `@startuml` / `@enduml` lines.
///
/// Text without the markers is returned unchanged, so the result can always
/// be passed to [`wrap_source`].
#[must_use]
pub fn strip_markers(document: &str) -> &str {
    let mut body = document;
    if body.trim_start().starts_with(START_MARKER) {
        body = body
            .trim_start()
            .split_once('\n')
            .map_or("", |(_, rest)| rest);
    }
    let trimmed = body.trim_end();
    if let Some(rest) = trimmed.strip_suffix(END_MARKER) {
        body = rest;
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wrap_source() {
        assert_eq!(
            wrap_source("Alice -> Bob: hi\n"),
            "@startuml\nAlice -> Bob: hi\n@enduml"
        );
    }

    #[test]
    fn test_wrap_source_adds_missing_line_break() {
        assert_eq!(
            wrap_source("Alice -> Bob: hi"),
            "@startuml\nAlice -> Bob: hi\n@enduml"
        );
    }

    #[test]
    fn test_wrap_source_keeps_leading_whitespace() {
        assert_eq!(wrap_source("\n  A -> B\n"), "@startuml\n\n  A -> B\n@enduml");
    }

    #[test]
    fn test_wrap_empty_source() {
        assert_eq!(wrap_source(""), "@startuml\n@enduml");
    }

    #[test]
    fn test_strip_markers() {
        assert_eq!(
            strip_markers("@startuml\nAlice -> Bob: hi\n@enduml\n"),
            "Alice -> Bob: hi\n"
        );
        assert_eq!(strip_markers("@startuml name\nA -> B\n@enduml"), "A -> B\n");
        assert_eq!(strip_markers("A -> B\n"), "A -> B\n");
        assert_eq!(strip_markers("@startuml"), "");
    }

    #[test]
    fn test_strip_then_wrap_restores_document() {
        let document = "@startuml\nA -> B\n@enduml";
        assert_eq!(wrap_source(strip_markers(document)), document);
    }

    #[test]
    fn test_decode_utf8_is_borrowed() {
        let decoded = decode_source("Ärger -> 検証".as_bytes());
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert_eq!(decoded, "Ärger -> 検証");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // "caf\xe9" in ISO-8859-1
        let decoded = decode_source(&[b'c', b'a', b'f', 0xE9]);
        assert_eq!(decoded, "café");
    }
}
