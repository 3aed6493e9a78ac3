//! # Meter Serial Link
//!
//! The byte-level link the transport session drives. The session only needs
//! three operations from the UART driver: write a block of bytes, ask how many
//! received bytes are buffered, and take one buffered byte. [`MeterLink`]
//! captures exactly that, so a real port ([`SerialLink`]) and the scripted
//! [`MockLink`](crate::kaskad::link_mock::MockLink) are interchangeable.

use crate::error::MeterError;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort as _, SerialPortBuilderExt};

/// Trait for the UART operations the session consumes.
#[async_trait::async_trait]
pub trait MeterLink: Send {
    /// Writes `data` and returns how many bytes the driver accepted.
    async fn write_bytes(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Number of received bytes ready to be read without waiting.
    async fn available(&mut self) -> io::Result<usize>;

    /// Takes one received byte. Only called when [`available`](Self::available) reported data.
    async fn read_byte(&mut self) -> io::Result<u8>;
}

/// Configuration for serial connection.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baudrate: u32,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baudrate: 9600,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Meter link over a tokio-serial port.
pub struct SerialLink {
    port: tokio_serial::SerialStream,
    config: SerialConfig,
}

impl SerialLink {
    /// Opens `port_name` with the default 9600 8N1 settings.
    pub fn open(port_name: &str) -> Result<SerialLink, MeterError> {
        Self::open_with_config(port_name, SerialConfig::default())
    }

    /// Opens `port_name` with custom settings.
    pub fn open_with_config(port_name: &str, config: SerialConfig) -> Result<SerialLink, MeterError> {
        let port = tokio_serial::new(port_name, config.baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .timeout(config.timeout)
            .open_native_async()
            .map_err(|e| MeterError::SerialPortError(e.to_string()))?;

        log::debug!("Opened {} at {} baud", port_name, config.baudrate);
        Ok(SerialLink { port, config })
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl MeterLink for SerialLink {
    async fn write_bytes(&mut self, data: &[u8]) -> io::Result<usize> {
        let written = self.port.write(data).await?;
        self.port.flush().await?;
        Ok(written)
    }

    async fn available(&mut self) -> io::Result<usize> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(io::Error::from)
    }

    async fn read_byte(&mut self) -> io::Result<u8> {
        self.port.read_u8().await
    }
}
