//! # Utility Modules
//!
//! Common helpers used throughout the meterbridge-rs crate.

pub mod hex;

pub use hex::{decode_hex, encode_hex, format_hex_compact, hex_to_bytes};
