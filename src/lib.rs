//! # meterbridge-rs - A Rust Crate for Kaskad Meter Polling
//!
//! The meterbridge-rs crate polls an electricity meter over a UART link using
//! the Kaskad framed binary protocol and keeps the decoded readings (tariffs,
//! voltage, current, power, battery resource and identity strings) together
//! with the change flags an upstream notification layer consumes.
//!
//! ## Features
//!
//! - Encode requests and validate responses: CRC-8, byte stuffing, header checks
//! - Bounded transmit/receive retries with the meter's turnaround timing
//! - Decode tariff, instantaneous, battery and identity registers
//! - Bind meter models to decoder sets, with explicit unsupported operations
//! - Run the ping / identity / measurement polling cycle
//! - Logging through the `log` facade and thiserror-based error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meterbridge_rs::{init_logger, BridgeConfig, MeterPoller};
//!
//! # async fn run() -> Result<(), meterbridge_rs::MeterError> {
//! init_logger();
//! let mut config = BridgeConfig::load("meterbridge.json")?;
//! let mut poller = MeterPoller::open(&mut config)?;
//! poller.poll_once().await?;
//! println!("{:?}", poller.state().tariffs());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod kaskad;
pub mod logging;
pub mod meter;
pub mod meter_poller;
pub mod payload;
pub mod util;

pub use crate::config::{BridgeConfig, DeviceType};
pub use crate::error::{MeterError, PktError};
pub use crate::logging::{init_logger, log_info};

// Protocol engine
pub use kaskad::{
    encode_request, Command, MeterLink, MeterSession, Packet, PacketHeader, SerialConfig,
    SerialLink, SessionConfig,
};

// Meter model and readings
pub use meter::{Capability, Changed, Device, Field, MeasureReport, MeterState, Operation};
pub use meter_poller::{CycleOutcome, MeterPoller};
pub use payload::{decode_record, MeterRecord};

/// Opens a session to the meter at `device_address` on serial port `port`.
///
/// # Arguments
/// * `port` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
/// * `device_address` - Address of the meter on the bus
///
/// # Returns
/// * `Ok(MeterSession)` - Session ready to run exchanges
/// * `Err(MeterError)` - The port could not be opened
pub fn connect(port: &str, device_address: u16) -> Result<MeterSession<SerialLink>, MeterError> {
    let link = SerialLink::open(port)?;
    Ok(MeterSession::new(link, SessionConfig::for_address(device_address)))
}

/// Runs one exchange for `command` and returns the validated response.
///
/// # Arguments
/// * `session` - Session to run the exchange on
/// * `command` - Command to send
///
/// # Returns
/// * `Ok(Packet)` - Validated response packet
/// * `Err(MeterError)` - The exchange failed
pub async fn send_command<L: MeterLink>(
    session: &mut MeterSession<L>,
    command: Command,
) -> Result<Packet, MeterError> {
    Ok(session.exchange(command).await?)
}
