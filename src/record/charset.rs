//! Text encoding helpers
//!
//! Bodies and header values are stored as text but travel as bytes. These
//! helpers convert between the two under a named encoding and refuse lossy
//! conversions.

use crate::record::{RecordError, RecordResult};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};

/// Resolves an encoding label such as `utf-8` or `latin1`
pub fn lookup_encoding(label: &str) -> RecordResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| RecordError::UnsupportedEncoding(label.to_string()))
}

/// Encoding for header names and values of a response whose body uses `label`
///
/// Header bytes are never UTF-16 on the wire, so UTF-16 bodies keep their
/// headers in UTF-8.
pub fn header_encoding(label: &str) -> RecordResult<&str> {
    let encoding = lookup_encoding(label)?;
    if encoding == UTF_16LE || encoding == UTF_16BE {
        Ok("utf-8")
    } else {
        Ok(label)
    }
}

/// Decodes bytes under the named encoding
pub fn decode_text(bytes: &[u8], label: &str) -> RecordResult<String> {
    let encoding = lookup_encoding(label)?;
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(RecordError::Decode {
            encoding: label.to_string(),
        });
    }
    Ok(text.into_owned())
}

/// Encodes text under the named encoding
pub fn encode_text(text: &str, label: &str) -> RecordResult<Vec<u8>> {
    let encoding = lookup_encoding(label)?;

    // encoding_rs has no UTF-16 encoder
    if encoding == UTF_16LE {
        return Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
    }
    if encoding == UTF_16BE {
        return Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect());
    }

    // Encodings that only exist for decoding, e.g. `replacement`
    if encoding.output_encoding() != encoding {
        return Err(RecordError::UnsupportedEncoding(label.to_string()));
    }

    let (bytes, _, had_unmappable) = encoding.encode(text);
    if had_unmappable {
        return Err(RecordError::Encode {
            encoding: label.to_string(),
        });
    }
    Ok(bytes.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_roundtrip() {
        let bytes = encode_text("naïve café", "utf-8").unwrap();
        assert_eq!(decode_text(&bytes, "UTF-8").unwrap(), "naïve café");
    }

    #[test]
    fn test_single_byte_encoding() {
        let bytes = encode_text("café", "windows-1252").unwrap();
        assert_eq!(bytes, vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(decode_text(&bytes, "windows-1252").unwrap(), "café");
    }

    #[test]
    fn test_unknown_label() {
        assert!(matches!(
            decode_text(b"abc", "klingon-8"),
            Err(RecordError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_invalid_bytes_rejected() {
        assert!(matches!(
            decode_text(&[0x66, 0xFF, 0xFE], "utf-8"),
            Err(RecordError::Decode { .. })
        ));
    }

    #[test]
    fn test_unmappable_characters_rejected() {
        assert!(matches!(
            encode_text("日本", "windows-1252"),
            Err(RecordError::Encode { .. })
        ));
    }

    #[test]
    fn test_utf16_roundtrip() {
        let le = encode_text("hé", "utf-16le").unwrap();
        assert_eq!(le, vec![b'h', 0x00, 0xE9, 0x00]);
        assert_eq!(decode_text(&le, "utf-16le").unwrap(), "hé");

        let be = encode_text("hé", "UTF-16BE").unwrap();
        assert_eq!(be, vec![0x00, b'h', 0x00, 0xE9]);
        assert_eq!(decode_text(&be, "utf-16be").unwrap(), "hé");

        // Characters outside the BMP become surrogate pairs
        let emoji = encode_text("😀", "utf-16le").unwrap();
        assert_eq!(emoji.len(), 4);
        assert_eq!(decode_text(&emoji, "utf-16le").unwrap(), "😀");
    }

    #[test]
    fn test_decode_only_encoding_cannot_be_encoded() {
        assert!(matches!(
            encode_text("abc", "iso-2022-kr"),
            Err(RecordError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_header_encoding() {
        assert_eq!(header_encoding("windows-1252").unwrap(), "windows-1252");
        assert_eq!(header_encoding("utf-16le").unwrap(), "utf-8");
        assert_eq!(header_encoding("UTF-16BE").unwrap(), "utf-8");
        assert!(header_encoding("klingon-8").is_err());
    }
}
