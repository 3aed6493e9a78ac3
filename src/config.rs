//! # Bridge Configuration
//!
//! Settings the bridge consumes: which serial port to open, which meter
//! address to talk to, which meter model sits on the other end and how often
//! to poll it. A configuration can be loaded from a JSON file and then
//! overridden field by field from the command line.
//!
//! ```json
//! {
//!   "port": "/dev/ttyUSB0",
//!   "baudrate": 9600,
//!   "device_address": 20109,
//!   "device_type": "kaskad-1-mt",
//!   "poll_interval_secs": 30
//! }
//! ```

use crate::error::MeterError;
use crate::kaskad::link::SerialConfig;
use crate::kaskad::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Meter model configured for the bridge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    /// Not configured yet; binds as Kaskad-1-MT.
    #[default]
    Undefined,
    #[value(name = "kaskad-1-mt")]
    #[serde(rename = "kaskad-1-mt")]
    Kaskad1Mt,
    #[value(name = "kaskad-11")]
    #[serde(rename = "kaskad-11")]
    Kaskad11,
    #[value(name = "mercury-206")]
    #[serde(rename = "mercury-206")]
    Mercury206,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceType::Undefined => "undefined device",
            DeviceType::Kaskad1Mt => "Kaskad-1-MT",
            DeviceType::Kaskad11 => "Kaskad-11",
            DeviceType::Mercury206 => "Mercury-206",
        };
        f.write_str(name)
    }
}

/// Everything the bridge needs to reach and poll one meter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub port: String,
    pub baudrate: u32,
    pub device_address: u16,
    pub device_type: DeviceType,
    pub poll_interval_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            port: "/dev/ttyUSB0".to_string(),
            baudrate: SerialConfig::default().baudrate,
            device_address: 0,
            device_type: DeviceType::Undefined,
            poll_interval_secs: 30,
        }
    }
}

impl BridgeConfig {
    /// Reads a JSON configuration file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MeterError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| MeterError::ConfigError(format!("{}: {e}", path.display())))?;
        let config: BridgeConfig = serde_json::from_str(&text)
            .map_err(|e| MeterError::ConfigError(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MeterError> {
        if self.port.is_empty() {
            return Err(MeterError::ConfigError("serial port is empty".into()));
        }
        if self.baudrate == 0 {
            return Err(MeterError::ConfigError("baudrate must be nonzero".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(MeterError::ConfigError("poll interval must be nonzero".into()));
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::for_address(self.device_address)
    }

    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            baudrate: self.baudrate,
            ..Default::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"device_address": 20109, "device_type": "mercury-206"}"#)
                .unwrap();
        assert_eq!(config.device_address, 20109);
        assert_eq!(config.device_type, DeviceType::Mercury206);
        assert_eq!(config.baudrate, 9600);
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = BridgeConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MeterError::ConfigError(_))));
    }

    #[test]
    fn test_device_type_names() {
        assert_eq!(
            serde_json::to_string(&DeviceType::Kaskad1Mt).unwrap(),
            "\"kaskad-1-mt\""
        );
        assert_eq!(DeviceType::Kaskad11.to_string(), "Kaskad-11");
    }
}
