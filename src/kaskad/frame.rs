//! # Kaskad Wire Codec
//!
//! Pure functions that build, escape, unescape and parse Kaskad frames. No I/O
//! happens here; the [`session`](crate::kaskad::session) module drives these
//! functions against a link.
//!
//! ## Frame layout
//!
//! ```text
//! 0x73 0x55 | header (11 bytes, little-endian) | payload | crc8 | 0x55
//! ```
//!
//! The CRC-8 (polynomial 0xA9, seed 0) covers the header and payload. Before
//! transmission every byte between the leading marker pair and the trailing
//! boundary is escaped: `0x55` becomes `0x73 0x11` and `0x73` becomes `0x73 0x22`,
//! so an unescaped `0x55` past position 1 always terminates the frame.
//!
//! ## Usage
//!
//! ```rust
//! use meterbridge_rs::kaskad::command::Command;
//! use meterbridge_rs::kaskad::frame::{encode_request, unstuff, parse_frame, checksum};
//!
//! let wire = encode_request(Command::TariffsData, 20109).unwrap();
//! let frame = unstuff(&wire).unwrap();
//! let packet = parse_frame(&frame).unwrap();
//! assert_eq!(packet.checksum, checksum(&frame));
//! ```

use crate::constants::*;
use crate::error::{MeterError, PktError};
use crate::kaskad::command::Command;
use bytes::{BufMut, BytesMut};
use nom::number::complete::{le_u16, le_u32, le_u8};
use nom::IResult;

/// Which way a frame travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToDevice,
    FromDevice,
}

impl Direction {
    pub fn to_byte(self) -> u8 {
        match self {
            Direction::ToDevice => DIRECTION_TO_DEVICE,
            Direction::FromDevice => DIRECTION_FROM_DEVICE,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        if byte & 0x01 == DIRECTION_TO_DEVICE {
            Direction::ToDevice
        } else {
            Direction::FromDevice
        }
    }
}

/// Fixed 11-byte header that follows the two leading marker bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub direction: Direction,
    pub address_to: u16,
    pub address_from: u16,
    pub command: u8,
    /// Password on requests; the meter's status code lives in its low byte on responses.
    pub password_status: u32,
    pub data_len: u8,
}

impl PacketHeader {
    /// Header of a host request for `command` addressed to `address`.
    pub fn request(command: Command, address: u16) -> Self {
        PacketHeader {
            direction: Direction::ToDevice,
            address_to: address,
            address_from: PROG_ADDR,
            command: command.code(),
            password_status: PASSWORD,
            data_len: command.request_data_len(),
        }
    }

    /// Encodes the header into its wire layout.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let mut buf = &mut out[..];
        buf.put_u8(self.direction.to_byte());
        buf.put_u16_le(self.address_to);
        buf.put_u16_le(self.address_from);
        buf.put_u8(self.command);
        buf.put_u32_le(self.password_status);
        buf.put_u8(self.data_len);
        out
    }

    /// Response status code, read from its byte offset in the encoded header.
    pub fn status_code(&self) -> u8 {
        self.to_bytes()[HEADER_STATUS_OFFSET]
    }
}

/// Uses `nom` to parse a packet header from a byte slice.
pub fn parse_header(input: &[u8]) -> IResult<&[u8], PacketHeader> {
    let (input, direction) = le_u8(input)?;
    let (input, address_to) = le_u16(input)?;
    let (input, address_from) = le_u16(input)?;
    let (input, command) = le_u8(input)?;
    let (input, password_status) = le_u32(input)?;
    let (input, data_len) = le_u8(input)?;
    Ok((
        input,
        PacketHeader {
            direction: Direction::from_byte(direction),
            address_to,
            address_from,
            command,
            password_status,
            data_len,
        },
    ))
}

/// One unescaped Kaskad packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Vec<u8>,
    pub checksum: u8,
}

impl Packet {
    /// Builds a packet, fixing up the declared payload length and the checksum.
    pub fn new(mut header: PacketHeader, payload: Vec<u8>) -> Result<Self, MeterError> {
        if payload.len() > PAYLOAD_MAX_LEN {
            return Err(MeterError::FrameTooLarge(
                FRAME_PREFIX_LEN + HEADER_LEN + payload.len() + FRAME_SUFFIX_LEN,
            ));
        }
        header.data_len = payload.len() as u8;
        let mut packet = Packet {
            header,
            payload,
            checksum: 0,
        };
        packet.checksum = checksum(&packet.to_bytes());
        Ok(packet)
    }

    /// Request packet for `command`, with its sub-command byte when it takes one.
    pub fn request(command: Command, address: u16) -> Self {
        let header = PacketHeader::request(command, address);
        let payload: Vec<u8> = command.sub_command().into_iter().collect();
        let mut packet = Packet {
            header,
            payload,
            checksum: 0,
        };
        packet.checksum = checksum(&packet.to_bytes());
        packet
    }

    /// Unescaped frame bytes, markers and checksum included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(
            FRAME_PREFIX_LEN + HEADER_LEN + self.payload.len() + FRAME_SUFFIX_LEN,
        );
        buf.put_u8(FRAME_START);
        buf.put_u8(FRAME_BOUNDARY);
        buf.put_slice(&self.header.to_bytes());
        buf.put_slice(&self.payload);
        buf.put_u8(self.checksum);
        buf.put_u8(FRAME_BOUNDARY);
        buf.to_vec()
    }

    pub fn status_code(&self) -> u8 {
        self.header.status_code()
    }
}

/// Plain CRC-8 over `data`: polynomial 0xA9, seed 0, no reflection, no final XOR.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Frame checksum: CRC-8 over everything but the two leading marker bytes
/// and the trailing checksum/boundary pair.
pub fn checksum(frame: &[u8]) -> u8 {
    let end = frame.len().saturating_sub(FRAME_SUFFIX_LEN);
    let start = FRAME_PREFIX_LEN.min(end);
    crc8(&frame[start..end])
}

/// Escapes every reserved byte between the leading marker pair and the final byte.
pub fn stuff(frame: &[u8]) -> Vec<u8> {
    if frame.len() <= FRAME_PREFIX_LEN {
        return frame.to_vec();
    }

    let (last, body) = match frame[FRAME_PREFIX_LEN..].split_last() {
        Some(split) => split,
        None => return frame.to_vec(),
    };

    let mut out = Vec::with_capacity(frame.len() * 2);
    out.extend_from_slice(&frame[..FRAME_PREFIX_LEN]);
    for &byte in body {
        match byte {
            FRAME_BOUNDARY => out.extend_from_slice(&[FRAME_START, ESCAPED_BOUNDARY]),
            FRAME_START => out.extend_from_slice(&[FRAME_START, ESCAPED_START]),
            other => out.push(other),
        }
    }
    out.push(*last);
    out
}

/// Reverses [`stuff`] on a received frame.
///
/// Fails with [`PktError::Unstuffing`] when an escape introducer is followed by
/// anything other than a known escape code, or when the frame is too short to
/// hold the marker pair and terminator.
pub fn unstuff(raw: &[u8]) -> Result<Vec<u8>, PktError> {
    if raw.len() < FRAME_PREFIX_LEN + 1 {
        return Err(PktError::Unstuffing);
    }

    let (last, body) = raw[FRAME_PREFIX_LEN..]
        .split_last()
        .ok_or(PktError::Unstuffing)?;

    let mut out = Vec::with_capacity(raw.len());
    out.extend_from_slice(&raw[..FRAME_PREFIX_LEN]);

    let mut bytes = body.iter();
    while let Some(&byte) = bytes.next() {
        if byte == FRAME_START {
            match bytes.next() {
                Some(&ESCAPED_BOUNDARY) => out.push(FRAME_BOUNDARY),
                Some(&ESCAPED_START) => out.push(FRAME_START),
                _ => return Err(PktError::Unstuffing),
            }
        } else {
            out.push(byte);
        }
    }
    out.push(*last);
    Ok(out)
}

/// Builds the escaped request frame for `command` addressed to `address`.
pub fn encode_request(command: Command, address: u16) -> Result<Vec<u8>, MeterError> {
    let frame = Packet::request(command, address).to_bytes();
    debug_assert_eq!(frame.len(), command.frame_len());
    let wire = stuff(&frame);
    if wire.len() > PKT_BUFF_MAX_LEN {
        return Err(MeterError::FrameTooLarge(wire.len()));
    }
    Ok(wire)
}

/// Checksum byte a collected frame carries after its declared payload.
///
/// Reads as 0 when the declared length runs past the end of the frame or past
/// [`PAYLOAD_MAX_LEN`], so such a frame fails the checksum comparison instead
/// of being mistaken for a partial one.
pub fn declared_checksum(frame: &[u8]) -> u8 {
    let data_len = frame
        .get(FRAME_PREFIX_LEN + HEADER_LEN - 1)
        .map_or(0, |&len| len as usize);
    if data_len > PAYLOAD_MAX_LEN {
        return 0;
    }
    frame
        .get(FRAME_PREFIX_LEN + HEADER_LEN + data_len)
        .copied()
        .unwrap_or(0)
}

/// Splits an unescaped frame into header, payload and the received checksum.
///
/// The checksum is taken from the byte that follows the declared payload, so
/// a buffer whose declared length runs past its end is reported as
/// incomplete. The checksum itself is not verified here.
pub fn parse_frame(frame: &[u8]) -> Result<Packet, PktError> {
    let body = frame.get(FRAME_PREFIX_LEN..).ok_or(PktError::Incomplete)?;
    let (rest, header) = parse_header(body).map_err(|_| PktError::Incomplete)?;

    let data_len = header.data_len as usize;
    if data_len > PAYLOAD_MAX_LEN {
        return Err(PktError::Incomplete);
    }
    let payload = rest.get(..data_len).ok_or(PktError::Incomplete)?;
    let received = *rest.get(data_len).ok_or(PktError::Incomplete)?;

    Ok(Packet {
        header,
        payload: payload.to_vec(),
        checksum: received,
    })
}
