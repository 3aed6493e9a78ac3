//! # Kaskad Command Catalog
//!
//! Every request the host can issue. A command identifier is 16 bits wide:
//! the low byte is the command code carried in the header, the high byte is
//! the sub-command that parameterized commands append as a one-byte payload.

use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A request understood by the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    OpenChannel,
    TariffsData,
    PowerData,
    ReadConfigure,
    GetInfo,
    TestError,
    ResourceBattery,
    AmpsData,
    VoltsData,
    SerialNumber,
    DateRelease,
    FactoryManufacturer,
    NameDevice,
    NameDevice2,
}

/// What the payload of a successful response to a command carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Acknowledgement only.
    Empty,
    /// Three 32-bit tariff counters.
    Tariffs,
    /// One 24-bit power value.
    Power,
    /// Phase byte followed by a 16-bit voltage.
    Volts,
    /// Phase byte followed by a 16- or 24-bit current.
    Amps,
    /// 16-bit worktime followed by 16-bit lifetime.
    Battery,
    /// Sub-command echo followed by a null-terminated string.
    Text,
    /// Opaque bytes this crate does not interpret.
    Raw,
}

impl ResponseShape {
    /// Smallest payload that holds a complete record of this shape.
    pub fn min_payload_len(self) -> usize {
        match self {
            ResponseShape::Empty | ResponseShape::Raw => 0,
            ResponseShape::Tariffs => 12,
            ResponseShape::Power => 3,
            ResponseShape::Volts => 3,
            ResponseShape::Amps => 3,
            ResponseShape::Battery => 4,
            ResponseShape::Text => 1,
        }
    }
}

impl Command {
    pub const ALL: [Command; 14] = [
        Command::OpenChannel,
        Command::TariffsData,
        Command::PowerData,
        Command::ReadConfigure,
        Command::GetInfo,
        Command::TestError,
        Command::ResourceBattery,
        Command::AmpsData,
        Command::VoltsData,
        Command::SerialNumber,
        Command::DateRelease,
        Command::FactoryManufacturer,
        Command::NameDevice,
        Command::NameDevice2,
    ];

    /// Full 16-bit command identifier.
    pub fn id(self) -> u16 {
        match self {
            Command::OpenChannel => CMD_OPEN_CHANNEL,
            Command::TariffsData => CMD_TARIFFS_DATA,
            Command::PowerData => CMD_POWER_DATA,
            Command::ReadConfigure => CMD_READ_CONFIGURE,
            Command::GetInfo => CMD_GET_INFO,
            Command::TestError => CMD_TEST_ERROR,
            Command::ResourceBattery => CMD_RESOURCE_BATTERY,
            Command::AmpsData => CMD_AMPS_DATA,
            Command::VoltsData => CMD_VOLTS_DATA,
            Command::SerialNumber => CMD_SERIAL_NUMBER,
            Command::DateRelease => CMD_DATE_RELEASE,
            Command::FactoryManufacturer => CMD_FACTORY_MANUFACTURER,
            Command::NameDevice => CMD_NAME_DEVICE,
            Command::NameDevice2 => CMD_NAME_DEVICE2,
        }
    }

    /// Looks up a command by its 16-bit identifier.
    pub fn from_id(id: u16) -> Option<Command> {
        Command::ALL.iter().copied().find(|c| c.id() == id)
    }

    /// Command code placed in the header and echoed by the meter.
    pub fn code(self) -> u8 {
        (self.id() & 0xFF) as u8
    }

    /// Sub-command byte for parameterized commands.
    pub fn sub_command(self) -> Option<u8> {
        match self {
            Command::AmpsData
            | Command::VoltsData
            | Command::SerialNumber
            | Command::DateRelease
            | Command::FactoryManufacturer
            | Command::NameDevice
            | Command::NameDevice2 => Some((self.id() >> 8) as u8),
            _ => None,
        }
    }

    /// Request payload length declared in the header.
    pub fn request_data_len(self) -> u8 {
        if self.sub_command().is_some() {
            1
        } else {
            0
        }
    }

    /// Length of the request frame before escaping.
    pub fn frame_len(self) -> usize {
        FRAME_PREFIX_LEN + HEADER_LEN + self.request_data_len() as usize + FRAME_SUFFIX_LEN
    }

    pub fn response_shape(self) -> ResponseShape {
        match self {
            Command::OpenChannel => ResponseShape::Empty,
            Command::TariffsData => ResponseShape::Tariffs,
            Command::PowerData => ResponseShape::Power,
            Command::VoltsData => ResponseShape::Volts,
            Command::AmpsData => ResponseShape::Amps,
            Command::ResourceBattery => ResponseShape::Battery,
            Command::SerialNumber
            | Command::DateRelease
            | Command::FactoryManufacturer
            | Command::NameDevice
            | Command::NameDevice2 => ResponseShape::Text,
            Command::ReadConfigure | Command::GetInfo | Command::TestError => ResponseShape::Raw,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::OpenChannel => "open-channel",
            Command::TariffsData => "tariffs-data",
            Command::PowerData => "power-data",
            Command::ReadConfigure => "read-configure",
            Command::GetInfo => "get-info",
            Command::TestError => "test-error",
            Command::ResourceBattery => "resource-battery",
            Command::AmpsData => "amps-data",
            Command::VoltsData => "volts-data",
            Command::SerialNumber => "serial-number",
            Command::DateRelease => "date-release",
            Command::FactoryManufacturer => "factory-manufacturer",
            Command::NameDevice => "name-device",
            Command::NameDevice2 => "name-device2",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = String;

    /// Accepts a command name (`tariffs-data`) or a hex identifier (`0x0005`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            let id = u16::from_str_radix(hex, 16).map_err(|e| format!("invalid id {s}: {e}"))?;
            return Command::from_id(id).ok_or_else(|| format!("unknown command id 0x{id:04X}"));
        }
        Command::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown command: {s}"))
    }
}
