//! # Device Dispatch
//!
//! Binds the configured meter model to the decoder set that backs the generic
//! `measure`, `get_release_date` and `get_serial_number` entry points. A model
//! can leave an operation unbound; calling it then fails with
//! [`MeterError::Unsupported`] instead of silently doing nothing.
//!
//! | Model        | measure | release date | serial number |
//! |--------------|---------|--------------|---------------|
//! | Kaskad-1-MT  | Kaskad  | Kaskad       | Kaskad        |
//! | Kaskad-11    | Kaskad  | Kaskad       | Kaskad        |
//! | Mercury-206  | Kaskad  | Kaskad       | unsupported   |
//!
//! Kaskad-11 and Mercury-206 borrow the Kaskad decoders until they get their own.

use crate::config::{BridgeConfig, DeviceType};
use crate::error::MeterError;
use crate::kaskad::link::MeterLink;
use crate::kaskad::session::MeterSession;
use crate::meter::readings::{self, MeasureReport};
use crate::meter::state::MeterState;
use log::info;
use std::fmt;

/// Operations a meter model may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Measure,
    GetReleaseDate,
    GetSerialNumber,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Measure => "measure",
            Operation::GetReleaseDate => "get release date",
            Operation::GetSerialNumber => "get serial number",
        };
        f.write_str(name)
    }
}

/// Decoder implementations available in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderSet {
    /// Kaskad register layout, see [`readings`].
    Kaskad,
}

/// One operation of a model: either backed by a decoder set or explicitly absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Bound(DecoderSet),
    Unsupported,
}

impl Capability {
    pub fn is_supported(self) -> bool {
        matches!(self, Capability::Bound(_))
    }
}

/// The operations a model implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    pub measure: Capability,
    pub release_date: Capability,
    pub serial_number: Capability,
}

impl CapabilitySet {
    /// Capability table for `device_type`.
    ///
    /// Only the Kaskad register layout is implemented. Kaskad-11 and the
    /// supported Mercury-206 operations are bound to the Kaskad decoders as
    /// stand-ins until their own layouts exist; their readings are only as
    /// good as that overlap.
    pub fn for_model(device_type: DeviceType) -> Self {
        use Capability::*;
        use DecoderSet::Kaskad;

        match device_type {
            DeviceType::Undefined | DeviceType::Kaskad1Mt | DeviceType::Kaskad11 => CapabilitySet {
                measure: Bound(Kaskad),
                release_date: Bound(Kaskad),
                serial_number: Bound(Kaskad),
            },
            DeviceType::Mercury206 => CapabilitySet {
                measure: Bound(Kaskad),
                release_date: Bound(Kaskad),
                serial_number: Unsupported,
            },
        }
    }

    pub fn get(&self, operation: Operation) -> Capability {
        match operation {
            Operation::Measure => self.measure,
            Operation::GetReleaseDate => self.release_date,
            Operation::GetSerialNumber => self.serial_number,
        }
    }
}

/// A meter model with its bound capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    device_type: DeviceType,
    capabilities: CapabilitySet,
}

impl Device {
    /// Binds `device_type`; an undefined type binds as Kaskad-1-MT.
    pub fn bind(device_type: DeviceType) -> Self {
        let device_type = match device_type {
            DeviceType::Undefined => DeviceType::Kaskad1Mt,
            other => other,
        };
        Device {
            device_type,
            capabilities: CapabilitySet::for_model(device_type),
        }
    }

    /// Binds the configured model and records the resolved type back into `config`.
    pub fn from_config(config: &mut BridgeConfig) -> Self {
        let device = Self::bind(config.device_type);
        if config.device_type != device.device_type {
            info!("Device type not configured, using {}", device.device_type);
            config.device_type = device.device_type;
        }
        device
    }

    /// Rebinds to another model after reconfiguration.
    pub fn rebind(&mut self, device_type: DeviceType) {
        *self = Self::bind(device_type);
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn supports(&self, operation: Operation) -> bool {
        self.capabilities.get(operation).is_supported()
    }

    fn decoders(&self, operation: Operation) -> Result<DecoderSet, MeterError> {
        match self.capabilities.get(operation) {
            Capability::Bound(set) => Ok(set),
            Capability::Unsupported => Err(MeterError::Unsupported {
                operation,
                device: self.device_type,
            }),
        }
    }

    /// Reads the recurring measurement registers.
    pub async fn measure<L: MeterLink>(
        &self,
        session: &mut MeterSession<L>,
        state: &mut MeterState,
    ) -> Result<MeasureReport, MeterError> {
        match self.decoders(Operation::Measure)? {
            DecoderSet::Kaskad => Ok(readings::measure(session, state).await),
        }
    }

    /// Reads the release date. `Ok(true)` when it changed.
    pub async fn get_release_date<L: MeterLink>(
        &self,
        session: &mut MeterSession<L>,
        state: &mut MeterState,
    ) -> Result<bool, MeterError> {
        match self.decoders(Operation::GetReleaseDate)? {
            DecoderSet::Kaskad => readings::read_release_date(session, state).await,
        }
    }

    /// Reads the serial number. `Ok(true)` when it changed.
    pub async fn get_serial_number<L: MeterLink>(
        &self,
        session: &mut MeterSession<L>,
        state: &mut MeterState,
    ) -> Result<bool, MeterError> {
        match self.decoders(Operation::GetSerialNumber)? {
            DecoderSet::Kaskad => readings::read_serial_number(session, state).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_binds_kaskad_1_mt() {
        let mut config = BridgeConfig::default();
        let device = Device::from_config(&mut config);
        assert_eq!(device.device_type(), DeviceType::Kaskad1Mt);
        assert_eq!(config.device_type, DeviceType::Kaskad1Mt);
    }

    #[test]
    fn test_mercury_lacks_serial_number() {
        let device = Device::bind(DeviceType::Mercury206);
        assert!(device.supports(Operation::Measure));
        assert!(device.supports(Operation::GetReleaseDate));
        assert!(!device.supports(Operation::GetSerialNumber));
        assert_eq!(device.capabilities().serial_number, Capability::Unsupported);
    }

    #[test]
    fn test_rebind() {
        let mut device = Device::bind(DeviceType::Mercury206);
        device.rebind(DeviceType::Kaskad11);
        assert_eq!(device.device_type(), DeviceType::Kaskad11);
        assert!(device.supports(Operation::GetSerialNumber));
    }
}
