//! Text encodings for source files.
//!
//! Files are decoded once on read and re-encoded with the same encoding
//! (and byte order mark) on write.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid UTF-8 at byte {0}")]
    InvalidUtf8(usize),
    #[error("odd number of bytes in UTF-16 text")]
    TruncatedUtf16,
    #[error("unpaired UTF-16 surrogate")]
    InvalidUtf16,
}

/// Decoded file contents together with the encoding they were read in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFile {
    pub text: String,
    pub encoding: Encoding,
}

impl TextFile {
    pub fn new(text: impl Into<String>, encoding: Encoding) -> Self {
        Self {
            text: text.into(),
            encoding,
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
            return utf8(rest).map(|text| Self::new(text, Encoding::Utf8Bom));
        }
        if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
            return utf16(rest, u16::from_le_bytes).map(|text| Self::new(text, Encoding::Utf16Le));
        }
        if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
            return utf16(rest, u16::from_be_bytes).map(|text| Self::new(text, Encoding::Utf16Be));
        }
        utf8(bytes).map(|text| Self::new(text, Encoding::Utf8))
    }

    pub fn encode(&self) -> Vec<u8> {
        match self.encoding {
            Encoding::Utf8 => self.text.as_bytes().to_vec(),
            Encoding::Utf8Bom => [UTF8_BOM, self.text.as_bytes()].concat(),
            Encoding::Utf16Le => {
                let mut out = UTF16_LE_BOM.to_vec();
                out.extend(self.text.encode_utf16().flat_map(u16::to_le_bytes));
                out
            }
            Encoding::Utf16Be => {
                let mut out = UTF16_BE_BOM.to_vec();
                out.extend(self.text.encode_utf16().flat_map(u16::to_be_bytes));
                out
            }
        }
    }
}

fn utf8(bytes: &[u8]) -> Result<String, DecodeError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| DecodeError::InvalidUtf8(e.valid_up_to()))
}

fn utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::TruncatedUtf16);
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| DecodeError::InvalidUtf16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_byte_order_marks() {
        let file = TextFile::decode(b"\xEF\xBB\xBFclass A {}").unwrap();
        assert_eq!(file.encoding, Encoding::Utf8Bom);
        assert_eq!(file.text, "class A {}");
        assert_eq!(file.encode(), b"\xEF\xBB\xBFclass A {}".to_vec());

        let file = TextFile::decode(&[0xFF, 0xFE, b'A', 0, b'{', 0]).unwrap();
        assert_eq!(file.encoding, Encoding::Utf16Le);
        assert_eq!(file.text, "A{");

        let file = TextFile::decode(&[0xFE, 0xFF, 0, b'A']).unwrap();
        assert_eq!(file.encoding, Encoding::Utf16Be);
        assert_eq!(file.encode(), vec![0xFE, 0xFF, 0, b'A']);
    }

    #[test]
    fn rejects_malformed_text() {
        assert_eq!(TextFile::decode(b"ab\xFF"), Err(DecodeError::InvalidUtf8(2)));
        assert_eq!(TextFile::decode(&[0xFF, 0xFE, b'A']), Err(DecodeError::TruncatedUtf16));
    }
}
