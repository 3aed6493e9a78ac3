//! # Kaskad Transport Session
//!
//! Runs one request/response exchange at a time against a [`MeterLink`]:
//!
//! 1. **Build** the escaped request frame for the command.
//! 2. **Transmit** it, up to three attempts spaced by 250 ms. A write only
//!    counts when the driver accepts the whole frame. After a successful write
//!    the session waits 100 ms for the meter to turn around.
//! 3. **Receive** up to three drains of the link, spaced by 250 ms, applying
//!    the framing checks byte by byte until a terminator arrives.
//! 4. **Validate** the collected frame: unstuffing, checksum, meter status,
//!    source address and command echo, in that order.
//!
//! Every failure ends as one [`PktError`]; nothing is retried across exchanges.
//!
//! The receive step treats the first unescaped boundary byte after position 1
//! as the end of the frame. A meter that emitted a bare `0x55` inside its
//! payload would therefore be cut short. Once a terminator has arrived the
//! frame counts as collected, so a cut-short frame fails the checksum
//! comparison with [`PktError::Crc`]; [`PktError::Incomplete`] is only
//! reported when no terminator arrived at all.

use crate::constants::*;
use crate::error::PktError;
use crate::kaskad::command::Command;
use crate::kaskad::frame::{
    checksum, declared_checksum, encode_request, parse_frame, unstuff, Packet,
};
use crate::kaskad::link::MeterLink;
use crate::logging::log_frame;
use crate::util::hex::encode_hex;
use log::{debug, warn};
use std::time::Duration;
use tokio::time::sleep;

/// Exchange parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Address of the meter; requests go to it and responses must come from it.
    pub device_address: u16,
    /// Transmit attempts and receive attempts per exchange.
    pub attempts: u8,
    /// Pause between failed attempts.
    pub retry_delay: Duration,
    /// Pause between a successful write and the first receive drain.
    pub turnaround: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            device_address: 0,
            attempts: EXCHANGE_ATTEMPTS,
            retry_delay: RETRY_DELAY,
            turnaround: TURNAROUND_DELAY,
        }
    }
}

impl SessionConfig {
    pub fn for_address(device_address: u16) -> Self {
        SessionConfig {
            device_address,
            ..Default::default()
        }
    }
}

/// Owns the link and the receive buffer; one exchange runs at a time.
pub struct MeterSession<L: MeterLink> {
    link: L,
    config: SessionConfig,
    rx_buf: Vec<u8>,
    last_error: Option<PktError>,
}

impl<L: MeterLink> MeterSession<L> {
    pub fn new(link: L, config: SessionConfig) -> Self {
        MeterSession {
            link,
            config,
            rx_buf: Vec::with_capacity(PKT_BUFF_MAX_LEN),
            last_error: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_device_address(&mut self, device_address: u16) {
        self.config.device_address = device_address;
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Outcome of the most recent exchange, `None` if it succeeded or none ran yet.
    pub fn last_error(&self) -> Option<PktError> {
        self.last_error
    }

    /// Sends `command` and returns the validated response packet.
    pub async fn exchange(&mut self, command: Command) -> Result<Packet, PktError> {
        let result = self.run_exchange(command).await;
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => {
                warn!("{command}: {e}");
                self.last_error = Some(*e);
            }
        }
        result
    }

    /// Like [`exchange`](Self::exchange) for a raw 16-bit command identifier.
    /// Unknown identifiers build nothing and send nothing.
    pub async fn exchange_id(&mut self, id: u16) -> Result<Packet, PktError> {
        match Command::from_id(id) {
            Some(command) => self.exchange(command).await,
            None => {
                warn!("Unknown command id 0x{id:04X}, nothing sent");
                self.last_error = Some(PktError::NotSent);
                Err(PktError::NotSent)
            }
        }
    }

    async fn run_exchange(&mut self, command: Command) -> Result<Packet, PktError> {
        let wire = encode_request(command, self.config.device_address).map_err(|e| {
            warn!("Can't build a request for {command}: {e}");
            PktError::NotSent
        })?;

        self.transmit(&wire).await?;
        self.receive().await?;
        self.validate(command)
    }

    async fn transmit(&mut self, wire: &[u8]) -> Result<(), PktError> {
        for attempt in 1..=self.config.attempts {
            match self.link.write_bytes(wire).await {
                Ok(n) if n == wire.len() => {
                    debug!("send bytes: {n}");
                    log_frame("request pkt", wire);
                    sleep(self.config.turnaround).await;
                    return Ok(());
                }
                Ok(n) => warn!(
                    "Attempt {attempt} to send data to uart: {n} of {} bytes accepted",
                    wire.len()
                ),
                Err(e) => warn!("Attempt {attempt} to send data to uart failed: {e}"),
            }
            if attempt < self.config.attempts {
                sleep(self.config.retry_delay).await;
            }
        }

        warn!("Can't send a request pkt");
        Err(PktError::NotSent)
    }

    /// Fills `rx_buf` with one raw frame. A frame that straddles two drains is
    /// kept and completed by the next one.
    async fn receive(&mut self) -> Result<(), PktError> {
        let mut outcome = PktError::Timeout;
        self.rx_buf.clear();

        for attempt in 1..=self.config.attempts {
            loop {
                if self.rx_buf.len() >= PKT_BUFF_MAX_LEN {
                    warn!("Receive buffer full without a frame terminator, dropping {} bytes", self.rx_buf.len());
                    self.rx_buf.clear();
                    outcome = PktError::Incomplete;
                    break;
                }

                match self.link.available().await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Checking uart buffer failed: {e}");
                        break;
                    }
                }

                let byte = match self.link.read_byte().await {
                    Ok(byte) => byte,
                    Err(e) => {
                        warn!("Reading uart buffer failed: {e}");
                        break;
                    }
                };

                match self.rx_buf.len() {
                    0 if byte != FRAME_START => {
                        outcome = PktError::NoPacket;
                        continue;
                    }
                    1 if byte != FRAME_BOUNDARY => {
                        self.rx_buf.clear();
                        outcome = PktError::UnknownFormat;
                        continue;
                    }
                    _ => {}
                }

                self.rx_buf.push(byte);

                if self.rx_buf.len() > FRAME_PREFIX_LEN && byte == FRAME_BOUNDARY {
                    debug!("read bytes: {}", self.rx_buf.len());
                    return Ok(());
                }
            }

            if attempt < self.config.attempts {
                sleep(self.config.retry_delay).await;
            }
        }

        if self.rx_buf.is_empty() {
            Err(outcome)
        } else {
            debug!("partial pkt: 0x{}", encode_hex(&self.rx_buf));
            Err(PktError::Incomplete)
        }
    }

    fn validate(&self, command: Command) -> Result<Packet, PktError> {
        log_frame("response pkt", &self.rx_buf);

        let frame = unstuff(&self.rx_buf)?;

        let calculated = checksum(&frame);
        let received = declared_checksum(&frame);
        let mismatch = PktError::Crc {
            expected: received,
            calculated,
        };
        if calculated != received {
            return Err(mismatch);
        }
        let packet = parse_frame(&frame).map_err(|_| mismatch)?;

        let status = packet.status_code();
        if status != STATUS_OK {
            return Err(PktError::Response(status));
        }

        if packet.header.address_from != self.config.device_address {
            return Err(PktError::Address {
                expected: self.config.device_address,
                actual: packet.header.address_from,
            });
        }

        if packet.header.command != command.code() {
            return Err(PktError::DifferentCommand {
                expected: command.code(),
                actual: packet.header.command,
            });
        }

        Ok(packet)
    }
}
