//! Conversion between operator hex text and byte sequences.
//!
//! Operators type raw MDB bytes as loosely formatted hex (`"0A FF"`,
//! `"0x10 0x00"`, `"1000"`). [`decode`] accepts all of these; [`encode`]
//! produces the normalized form shown back to the operator (`"0A FF"`).
//!
//! Odd-length input is left-padded with a single `0` nibble, so `"A"` and
//! `"0A"` decode to the same byte and `"123"` decodes to `[0x01, 0x23]`. This
//! favours accepting truncated input over rejecting it. An operator who types
//! two separate nibbles (`"1 2 3"`) therefore gets `[0x01, 0x23]`, not three
//! bytes.

use crate::error::{Error, Result};

/// Encode bytes as uppercase, space-separated hex pairs.
///
/// # Example
///
/// ```
/// use mdblink_core::hex;
///
/// assert_eq!(hex::encode(&[0x01, 0xAB, 0x00]), "01 AB 00");
/// assert_eq!(hex::encode(&[]), "");
/// ```
pub fn encode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode operator hex text into bytes.
///
/// All `0x`/`0X` markers and all whitespace are removed first. An empty
/// result is not an error; it decodes to an empty vector and the caller
/// decides whether that is acceptable.
///
/// # Example
///
/// ```
/// use mdblink_core::hex;
///
/// assert_eq!(hex::decode("0x10 0x00").unwrap(), vec![0x10, 0x00]);
/// assert_eq!(hex::decode("A").unwrap(), vec![0x0A]);
/// assert!(hex::decode("   ").unwrap().is_empty());
/// assert!(hex::decode("G1").is_err());
/// ```
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let cleaned = clean(text);
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }

    if let Some(bad) = cleaned.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(Error::InvalidHex(format!(
            "unexpected character '{bad}' in \"{}\"",
            text.trim()
        )));
    }

    let normalized = if cleaned.len() % 2 == 1 {
        format!("0{cleaned}")
    } else {
        cleaned
    };

    // Only ASCII hex digits remain, so byte slicing is on char boundaries.
    normalized
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair)
                .map_err(|_| Error::InvalidHex(format!("bad pair in \"{}\"", text.trim())))?;
            u8::from_str_radix(pair, 16)
                .map_err(|e| Error::InvalidHex(format!("bad pair \"{pair}\": {e}")))
        })
        .collect()
}

/// Strip `0x`/`0X` markers (left to right, non-overlapping), then whitespace.
fn clean(text: &str) -> String {
    let mut without_markers = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '0' && matches!(chars.peek(), Some('x') | Some('X')) {
            chars.next();
            continue;
        }
        without_markers.push(c);
    }
    without_markers.retain(|c| !c.is_whitespace());
    without_markers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_uppercase_space_separated() {
        assert_eq!(encode(&[0x0a, 0xff, 0x10]), "0A FF 10");
        assert_eq!(encode(&[0x00]), "00");
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn decode_encode_inverse() {
        let samples: [&[u8]; 4] = [&[], &[0x00], &[0x10, 0x00], &[0xFF, 0x01, 0x80, 0x7F, 0x33]];
        for bytes in samples {
            assert_eq!(decode(&encode(bytes)).unwrap(), bytes);
        }
        let all: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&encode(&all)).unwrap(), all);
    }

    #[test]
    fn decode_normalizes_case_and_spacing() {
        let bytes = decode("0a ff\t10\n0B").unwrap();
        assert_eq!(bytes, vec![0x0A, 0xFF, 0x10, 0x0B]);
        assert_eq!(encode(&bytes), "0A FF 10 0B");
    }

    #[test]
    fn decode_strips_prefix_markers() {
        assert_eq!(decode("0x10 0X00").unwrap(), vec![0x10, 0x00]);
        assert_eq!(decode("0x100x00").unwrap(), vec![0x10, 0x00]);
    }

    #[test]
    fn decode_marker_removal_is_single_pass() {
        // "00xX" -> the marker at index 1 is removed, leaving "0X".
        assert!(matches!(decode("00xX"), Err(Error::InvalidHex(_))));
    }

    #[test]
    fn decode_empty_is_not_an_error() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("   ").unwrap().is_empty());
        assert!(decode("0x").unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_non_hex() {
        assert!(matches!(decode("G1"), Err(Error::InvalidHex(_))));
        assert!(matches!(decode("12G"), Err(Error::InvalidHex(_))));
        assert!(matches!(decode("hello"), Err(Error::InvalidHex(_))));
    }

    #[test]
    fn decode_odd_length_left_pads() {
        assert_eq!(decode("A").unwrap(), decode("0A").unwrap());
        assert_eq!(decode("123").unwrap(), vec![0x01, 0x23]);
        assert_eq!(decode("1 2 3").unwrap(), vec![0x01, 0x23]);
    }

    #[test]
    fn decode_error_names_offending_character() {
        let err = decode("12G").unwrap_err();
        assert!(err.to_string().contains("'G'"), "got: {err}");
    }
}
