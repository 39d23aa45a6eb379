//! Compact URL encoding of diagram text for the PlantUML server.
//!
//! The server accepts diagram source embedded directly in the request path:
//! the UTF-8 text is compressed with raw DEFLATE and the compressed bytes are
//! written with a base64-like 64 symbol alphabet that needs no
//! percent-encoding:
//!
//! ```text
//! 0-9 -> '0'..'9'   10-35 -> 'A'..'Z'   36-61 -> 'a'..'z'   62 -> '-'   63 -> '_'
//! ```
//!
//! A trailing partial group is padded with zero bytes and still emits four
//! characters; the server tolerates the extra zero bits.

use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;

/// Encode diagram text for use in a PlantUML server URL.
///
/// Empty input yields an empty string.
#[must_use]
pub fn encode(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    encode_bytes(&deflate(text.as_bytes()))
}

/// Compress bytes with raw DEFLATE (no zlib or gzip envelope) at best compression.
fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len()), Compression::best());
    // Writing into a Vec cannot fail.
    encoder
        .write_all(data)
        .and_then(|()| encoder.finish())
        .unwrap_or_default()
}

/// Write bytes with the 64 symbol alphabet, three bytes to four characters.
///
/// Output length is always `ceil(len / 3) * 4`.
#[must_use]
pub fn encode_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b1 = chunk[0];
        let b2 = chunk.get(1).copied().unwrap_or(0);
        let b3 = chunk.get(2).copied().unwrap_or(0);
        append_3_bytes(&mut out, b1, b2, b3);
    }
    out
}

fn append_3_bytes(out: &mut String, b1: u8, b2: u8, b3: u8) {
    let c1 = b1 >> 2;
    let c2 = ((b1 & 0x3) << 4) | (b2 >> 4);
    let c3 = ((b2 & 0xF) << 2) | (b3 >> 6);
    let c4 = b3 & 0x3F;
    for c in [c1, c2, c3, c4] {
        out.push(encode_6bit(c & 0x3F));
    }
}

/// Map a 6-bit value to its alphabet symbol, `?` for anything out of range.
fn encode_6bit(b: u8) -> char {
    match b {
        0..=9 => char::from(b'0' + b),
        10..=35 => char::from(b'A' + (b - 10)),
        36..=61 => char::from(b'a' + (b - 36)),
        62 => '-',
        63 => '_',
        _ => '?',
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::DeflateDecoder;

    use super::*;

    /// Inverse of the alphabet, as implemented by the server.
    fn decode_6bit(c: char) -> u8 {
        match c {
            '0'..='9' => c as u8 - b'0',
            'A'..='Z' => c as u8 - b'A' + 10,
            'a'..='z' => c as u8 - b'a' + 36,
            '-' => 62,
            '_' => 63,
            _ => panic!("unexpected symbol {c}"),
        }
    }

    fn decode_bytes(text: &str) -> Vec<u8> {
        let values: Vec<u8> = text.chars().map(decode_6bit).collect();
        let mut out = Vec::new();
        for group in values.chunks(4) {
            out.push((group[0] << 2) | (group[1] >> 4));
            out.push(((group[1] & 0xF) << 4) | (group[2] >> 2));
            out.push(((group[2] & 0x3) << 6) | group[3]);
        }
        out
    }

    fn is_alphabet(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_'
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode(""), "");
        assert_eq!(encode_bytes(&[]), "");
    }

    #[test]
    fn test_alphabet_boundaries() {
        assert_eq!(encode_6bit(0), '0');
        assert_eq!(encode_6bit(9), '9');
        assert_eq!(encode_6bit(10), 'A');
        assert_eq!(encode_6bit(35), 'Z');
        assert_eq!(encode_6bit(36), 'a');
        assert_eq!(encode_6bit(61), 'z');
        assert_eq!(encode_6bit(62), '-');
        assert_eq!(encode_6bit(63), '_');
        assert_eq!(encode_6bit(64), '?');
    }

    #[test]
    fn test_full_group() {
        assert_eq!(encode_bytes(&[0x00, 0x00, 0x00]), "0000");
        assert_eq!(encode_bytes(&[0xFF, 0xFF, 0xFF]), "____");
    }

    #[test]
    fn test_trailing_partial_groups_are_zero_padded() {
        // 0x01 -> 000000 010000 000000 000000
        assert_eq!(encode_bytes(&[0x01]), "0G00");
        // 0xFF 0xFF -> 111111 111111 111100 000000
        assert_eq!(encode_bytes(&[0xFF, 0xFF]), "__y0");
        assert_eq!(encode_bytes(&[0xFF, 0xFF, 0xFF, 0x01]), "____0G00");
    }

    #[test]
    fn test_encoded_length_and_alphabet() {
        for text in [
            "a",
            "Alice -> Bob: hi",
            "Bob -> Alice : hello\nAlice -> Bob : ok",
            "Überprüfung -> 検証",
        ] {
            let compressed = deflate(text.as_bytes());
            let encoded = encode(text);
            assert_eq!(encoded.len(), compressed.len().div_ceil(3) * 4);
            assert_eq!(encoded.len() % 4, 0);
            assert!(encoded.chars().all(is_alphabet), "bad symbol in {encoded}");
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let text = "@startuml\nA -> B\n@enduml";
        assert_eq!(encode(text), encode(text));
        assert_ne!(encode(text), encode("@startuml\nB -> A\n@enduml"));
    }

    #[test]
    fn test_server_side_decoding_recovers_text() {
        let text = "Alice -> Bob: Authentication Request\nBob --> Alice: Response";
        let compressed = decode_bytes(&encode(text));

        let mut decoded = String::new();
        // Trailing zero padding follows the final DEFLATE block and is ignored.
        DeflateDecoder::new(compressed.as_slice())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, text);
    }
}
