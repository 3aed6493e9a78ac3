//! # Hex Encoding/Decoding Utilities
//!
//! Hex helpers used for frame dumps in debug logs, for the CLI `decode`
//! command and for building test frames.
//!
//! ## Usage
//!
//! ```rust
//! use meterbridge_rs::util::hex::{encode_hex, decode_hex, format_hex_compact};
//!
//! let data = [0x73, 0x55, 0x01, 0x55];
//! let hex_str = encode_hex(&data);
//! assert_eq!(hex_str, "73550155");
//!
//! let decoded = decode_hex(&hex_str).unwrap();
//! assert_eq!(decoded, data);
//!
//! assert_eq!(format_hex_compact(&data), "73 55 01 55");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to lowercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode hex string to bytes
///
/// Accepts both uppercase and lowercase hex characters.
/// Whitespace is automatically stripped.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    if hex_str.is_empty() {
        return Err(HexError::EmptyString);
    }

    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format hex data for compact display, e.g. "73 55 01 55".
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Helper for creating test data from hex strings.
///
/// Panics on invalid hex (intended for test code only).
pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    decode_hex(hex).expect("Invalid hex in test data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let data = vec![0x73, 0x55, 0x01, 0x8D, 0x4E, 0xFF, 0xFF, 0x05];
        let encoded = encode_hex(&data);
        let decoded = decode_hex(&encoded).unwrap();
        assert_eq!(data, decoded);
    }

    #[test]
    fn test_decode_with_whitespace() {
        let hex = "73 55 11 55";
        assert_eq!(decode_hex(hex).unwrap(), vec![0x73, 0x55, 0x11, 0x55]);
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_hex_compact(&[0x73, 0x55, 0x22]), "73 55 22");
    }

    #[test]
    fn test_errors() {
        assert_eq!(decode_hex(""), Err(HexError::EmptyString));
        assert_eq!(decode_hex("735"), Err(HexError::OddLength(3)));
        assert!(matches!(decode_hex("GG"), Err(HexError::DecodeError(_))));
    }
}
