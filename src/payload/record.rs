//! # Kaskad Response Records
//!
//! Decodes the payload of a validated response into a typed [`MeterRecord`]
//! according to the command it answers. All multi-byte fields are
//! little-endian.

use crate::constants::IDENTITY_MAX_LEN;
use crate::error::MeterError;
use crate::kaskad::command::{Command, ResponseShape};
use crate::payload::data_encoding::{decode_identity, decode_u24, serialize_lossy};
use nom::{
    number::complete::{le_u16, le_u32, le_u8},
    IResult,
};
use serde::Serialize;

/// One decoded response record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MeterRecord {
    /// Bare acknowledgement.
    Ack,
    Tariffs([u32; 3]),
    Power(u32),
    Voltage { phase: u8, volts: u16 },
    /// Raw current as sent by the meter, before fitting it to 16 bits.
    Current { phase: u8, amps: u32 },
    Battery { worktime: u16, lifetime: u16 },
    /// Identity bytes up to the NUL, as sent.
    Text(#[serde(serialize_with = "serialize_lossy")] Vec<u8>),
    Raw(Vec<u8>),
}

fn parse_tariffs(input: &[u8]) -> IResult<&[u8], [u32; 3]> {
    let (input, t1) = le_u32(input)?;
    let (input, t2) = le_u32(input)?;
    let (input, t3) = le_u32(input)?;
    Ok((input, [t1, t2, t3]))
}

fn parse_voltage(input: &[u8]) -> IResult<&[u8], (u8, u16)> {
    let (input, phase) = le_u8(input)?;
    let (input, volts) = le_u16(input)?;
    Ok((input, (phase, volts)))
}

/// Current is 16 bits wide in a 3-byte payload and 24 bits wide otherwise.
fn parse_current(input: &[u8]) -> IResult<&[u8], (u8, u32)> {
    // anything but the 3-byte form decodes as 24-bit, 5+ bytes included
    let wide = input.len() != 3;
    let (input, phase) = le_u8(input)?;
    let (input, amps) = if wide {
        decode_u24(input)?
    } else {
        let (input, amps) = le_u16(input)?;
        (input, amps as u32)
    };
    Ok((input, (phase, amps)))
}

fn parse_battery(input: &[u8]) -> IResult<&[u8], (u16, u16)> {
    let (input, worktime) = le_u16(input)?;
    let (input, lifetime) = le_u16(input)?;
    Ok((input, (worktime, lifetime)))
}

/// Decodes the payload of a validated response to `command`.
pub fn decode_record(command: Command, payload: &[u8]) -> Result<MeterRecord, MeterError> {
    let shape = command.response_shape();
    let expected = shape.min_payload_len();
    let short = || MeterError::ShortPayload {
        command,
        expected,
        actual: payload.len(),
    };

    if payload.len() < expected {
        return Err(short());
    }

    let record = match shape {
        ResponseShape::Empty => MeterRecord::Ack,
        ResponseShape::Raw => MeterRecord::Raw(payload.to_vec()),
        ResponseShape::Tariffs => {
            let (_, tariffs) = parse_tariffs(payload).map_err(|_| short())?;
            MeterRecord::Tariffs(tariffs)
        }
        ResponseShape::Power => {
            let (_, power) = decode_u24(payload).map_err(|_| short())?;
            MeterRecord::Power(power)
        }
        ResponseShape::Volts => {
            let (_, (phase, volts)) = parse_voltage(payload).map_err(|_| short())?;
            MeterRecord::Voltage { phase, volts }
        }
        ResponseShape::Amps => {
            let (_, (phase, amps)) = parse_current(payload).map_err(|_| short())?;
            MeterRecord::Current { phase, amps }
        }
        ResponseShape::Battery => {
            let (_, (worktime, lifetime)) = parse_battery(payload).map_err(|_| short())?;
            MeterRecord::Battery { worktime, lifetime }
        }
        // first byte echoes the sub-command
        ResponseShape::Text => MeterRecord::Text(decode_identity(&payload[1..], IDENTITY_MAX_LEN)),
    };

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tariffs() {
        let payload = [
            0x10, 0x27, 0x00, 0x00, // 10000
            0x20, 0x4E, 0x00, 0x00, // 20000
            0x00, 0x00, 0x01, 0x00, // 65536
        ];
        assert_eq!(
            decode_record(Command::TariffsData, &payload).unwrap(),
            MeterRecord::Tariffs([10000, 20000, 65536])
        );
    }

    #[test]
    fn test_decode_current_widths() {
        assert_eq!(
            decode_record(Command::AmpsData, &[0x01, 0x34, 0x12]).unwrap(),
            MeterRecord::Current { phase: 1, amps: 0x1234 }
        );
        assert_eq!(
            decode_record(Command::AmpsData, &[0x01, 0x56, 0x34, 0x12]).unwrap(),
            MeterRecord::Current { phase: 1, amps: 0x123456 }
        );
        assert_eq!(
            decode_record(Command::AmpsData, &[0x02, 0x56, 0x34, 0x12, 0xEE]).unwrap(),
            MeterRecord::Current { phase: 2, amps: 0x123456 }
        );
    }

    #[test]
    fn test_decode_text_skips_sub_command_echo() {
        let mut payload = vec![0x01];
        payload.extend_from_slice(b"009217\0\0\0");
        assert_eq!(
            decode_record(Command::SerialNumber, &payload).unwrap(),
            MeterRecord::Text(b"009217".to_vec())
        );
    }

    #[test]
    fn test_text_serializes_as_string() {
        let record = MeterRecord::Text(vec![b'A', 0xFF, b'B']);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({ "Text": "A\u{FFFD}B" }));
    }

    #[test]
    fn test_short_payload() {
        let err = decode_record(Command::TariffsData, &[0; 8]).unwrap_err();
        assert!(matches!(
            err,
            MeterError::ShortPayload { expected: 12, actual: 8, .. }
        ));
    }

    #[test]
    fn test_ack_and_raw() {
        assert_eq!(decode_record(Command::OpenChannel, &[]).unwrap(), MeterRecord::Ack);
        assert_eq!(
            decode_record(Command::GetInfo, &[1, 2]).unwrap(),
            MeterRecord::Raw(vec![1, 2])
        );
    }
}
