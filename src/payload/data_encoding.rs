//! # Kaskad Data Encoding and Decoding
//!
//! Helpers for the numeric and text fields found in meter responses: 24-bit
//! little-endian counters, decimal scale factors, battery resource rounding
//! and null-terminated identity strings.

use crate::constants::CURRENT_FIELD_MAX;
use chrono::NaiveDate;
use nom::{number::complete::le_u24, IResult};
use serde::Serializer;

/// Maps a 2-bit division factor to its decimal scale.
///
/// Only the two low bits are significant: 0 → 1, 1 → 10, 2 → 100, 3 → 1000.
pub fn divisor(division_factor: u8) -> u16 {
    match division_factor & 0x03 {
        0 => 1,
        1 => 10,
        2 => 100,
        _ => 1000,
    }
}

/// Decodes a 24-bit little-endian unsigned value.
pub fn decode_u24(input: &[u8]) -> IResult<&[u8], u32> {
    le_u24(input)
}

/// Scales a value down by powers of ten until it fits the 16-bit field the
/// notification layer carries.
pub fn fit_u16(mut value: u32) -> u16 {
    while value > CURRENT_FIELD_MAX {
        value /= 10;
    }
    value as u16
}

/// Battery resource as a rounded percentage of `worktime` over `lifetime`.
///
/// The percentage is rounded up when the remainder of `worktime * 100 / lifetime`
/// is at least half of `lifetime`. Returns `None` when `lifetime` is zero.
/// Results above 255 saturate.
pub fn battery_percent(worktime: u16, lifetime: u16) -> Option<u8> {
    if lifetime == 0 {
        return None;
    }
    let scaled = worktime as u32 * 100;
    let lifetime = lifetime as u32;

    let mut level = scaled / lifetime;
    if scaled % lifetime >= lifetime / 2 {
        level += 1;
    }
    Some(u8::try_from(level).unwrap_or(u8::MAX))
}

/// Returns the bytes of a null-terminated string, bounded to `max_len`.
///
/// Bytes after the first NUL are ignored. The rest is kept as sent; the
/// meter does not promise any text encoding.
pub fn decode_identity(src: &[u8], max_len: usize) -> Vec<u8> {
    let end = src
        .iter()
        .take(max_len)
        .position(|&b| b == 0)
        .unwrap_or_else(|| src.len().min(max_len));
    src[..end].to_vec()
}

/// Serializes identity bytes as text, replacing anything that is not UTF-8.
pub fn serialize_lossy<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&String::from_utf8_lossy(bytes.as_ref()))
}

/// Parses a release date string as printed by the meter.
pub fn parse_release_date(text: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 4] = ["%d.%m.%Y", "%d.%m.%y", "%d/%m/%Y", "%Y-%m-%d"];

    let text = text.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}
