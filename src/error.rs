//! # Meter Bridge Error Handling
//!
//! This module defines the two error types of the crate:
//!
//! - [`PktError`], the closed set of outcomes of one failed request/response
//!   exchange with the meter.
//! - [`MeterError`], the crate-wide error returned by decoders, device dispatch,
//!   configuration and the serial link.

use crate::config::DeviceType;
use crate::kaskad::command::Command;
use crate::meter::device::Operation;
use thiserror::Error;

/// Outcome of a failed exchange. Exactly one is reported per exchange; success is `Ok(Packet)`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PktError {
    /// The request frame could not be written to the link.
    #[error("No bytes sent")]
    NotSent,

    /// Nothing arrived within the receive attempts.
    #[error("Response timeout")]
    Timeout,

    /// Bytes arrived but none of them started a frame.
    #[error("No packet received")]
    NoPacket,

    /// A start marker was not followed by the boundary marker.
    #[error("Unknown packet format")]
    UnknownFormat,

    /// A frame started but its terminator never arrived.
    #[error("Incomplete packet")]
    Incomplete,

    /// The frame contained an invalid escape sequence.
    #[error("Byte unstuffing failed")]
    Unstuffing,

    /// The received checksum does not match the frame contents.
    #[error("CRC mismatch: expected 0x{expected:02X}, calculated 0x{calculated:02X}")]
    Crc { expected: u8, calculated: u8 },

    /// The meter answered with a nonzero status code.
    #[error("Meter reported error code 0x{0:02X}")]
    Response(u8),

    /// The response came from another device.
    #[error("Address mismatch: expected {expected}, got {actual}")]
    Address { expected: u16, actual: u16 },

    /// The response answers another command.
    #[error("Different command: expected 0x{expected:02X}, got 0x{actual:02X}")]
    DifferentCommand { expected: u8, actual: u8 },
}

/// Represents the different error types that can occur in the meter bridge crate.
#[derive(Debug, Error)]
pub enum MeterError {
    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// A request/response exchange with the meter failed.
    #[error("Exchange failed: {0}")]
    Exchange(#[from] PktError),

    /// A validated response carried fewer payload bytes than its record needs.
    #[error("Payload too short for {command}: expected {expected} bytes, got {actual}")]
    ShortPayload {
        command: Command,
        expected: usize,
        actual: usize,
    },

    /// A record decoded to a value that cannot be used.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The bound device model does not implement the requested operation.
    #[error("{operation} is not supported by {device}")]
    Unsupported {
        operation: Operation,
        device: DeviceType,
    },

    /// A frame would exceed the link's maximum frame size.
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
