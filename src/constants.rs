//! Kaskad Protocol Constants
//!
//! This module defines the reserved byte values, buffer bounds and timing
//! parameters used by the framed UART protocol spoken by Kaskad meters.

use std::time::Duration;

// ----------------------------------------------------------------------------
// Framing
// ----------------------------------------------------------------------------

/// First byte of every frame. Also introduces an escape sequence.
pub const FRAME_START: u8 = 0x73;

/// Second byte of every frame and the trailing terminator.
pub const FRAME_BOUNDARY: u8 = 0x55;

/// Escape code following `FRAME_START` that stands for an in-band `FRAME_BOUNDARY`.
pub const ESCAPED_BOUNDARY: u8 = 0x11;

/// Escape code following `FRAME_START` that stands for an in-band `FRAME_START`.
pub const ESCAPED_START: u8 = 0x22;

/// Generator polynomial of the frame CRC-8 (no reflection, no final XOR).
pub const CRC8_POLY: u8 = 0xA9;

/// Leading framing bytes (start + boundary).
pub const FRAME_PREFIX_LEN: usize = 2;

/// Trailing bytes (checksum + boundary).
pub const FRAME_SUFFIX_LEN: usize = 2;

/// Size of the encoded packet header.
pub const HEADER_LEN: usize = 11;

/// Offset of the response status code inside the header (low byte of the password field).
pub const HEADER_STATUS_OFFSET: usize = 6;

/// Upper bound on a raw (escaped) frame and on the receive buffer.
pub const PKT_BUFF_MAX_LEN: usize = 128;

/// Upper bound on a packet payload.
pub const PAYLOAD_MAX_LEN: usize = 48;

// ----------------------------------------------------------------------------
// Addressing
// ----------------------------------------------------------------------------

/// Source address used by the host on every request.
pub const PROG_ADDR: u16 = 0xFFFF;

/// Password sent with every request.
pub const PASSWORD: u32 = 0x0000_0000;

/// Direction flag for frames sent to the meter.
pub const DIRECTION_TO_DEVICE: u8 = 1;

/// Direction flag for frames sent by the meter.
pub const DIRECTION_FROM_DEVICE: u8 = 0;

/// Status code reported by the meter when a request succeeded.
pub const STATUS_OK: u8 = 0;

// ----------------------------------------------------------------------------
// Command codes: low byte = wire command, high byte = sub-command
// ----------------------------------------------------------------------------

pub const CMD_OPEN_CHANNEL: u16 = 0x0001;
pub const CMD_TARIFFS_DATA: u16 = 0x0005;
pub const CMD_READ_CONFIGURE: u16 = 0x0010;
pub const CMD_POWER_DATA: u16 = 0x0014;
pub const CMD_GET_INFO: u16 = 0x0020;
pub const CMD_TEST_ERROR: u16 = 0x0028;
pub const CMD_RESOURCE_BATTERY: u16 = 0x0030;
pub const CMD_VOLTS_DATA: u16 = 0x012B;
pub const CMD_AMPS_DATA: u16 = 0x022B;
pub const CMD_SERIAL_NUMBER: u16 = 0x0137;
pub const CMD_DATE_RELEASE: u16 = 0x0237;
pub const CMD_FACTORY_MANUFACTURER: u16 = 0x0337;
pub const CMD_NAME_DEVICE: u16 = 0x0437;
pub const CMD_NAME_DEVICE2: u16 = 0x0537;

// ----------------------------------------------------------------------------
// Exchange timing
// ----------------------------------------------------------------------------

/// Transmit and receive attempts per exchange.
pub const EXCHANGE_ATTEMPTS: u8 = 3;

/// Pause between failed transmit or receive attempts.
pub const RETRY_DELAY: Duration = Duration::from_millis(250);

/// Time the meter needs before its response starts arriving.
pub const TURNAROUND_DELAY: Duration = Duration::from_millis(100);

// ----------------------------------------------------------------------------
// Meter state
// ----------------------------------------------------------------------------

/// Maximum identity string length kept in meter state.
pub const IDENTITY_MAX_LEN: usize = 24;

/// Size of the identity buffers handed to the notification layer.
pub const NOTIFY_IDENTITY_LEN: usize = 20;

/// Countdown loaded into a field's notify counter whenever it changes.
pub const NOTIFY_MAX: u8 = 3;

/// Largest value the notification layer can carry for current.
pub const CURRENT_FIELD_MAX: u32 = 0xFFFF;
