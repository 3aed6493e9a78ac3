//! The meter module holds the per-model side of the bridge: accumulated meter
//! state, the readings decoder for the Kaskad register layout and the device
//! dispatch that binds a configured model to its decoders.

pub mod device;
pub mod readings;
pub mod state;

pub use device::{Capability, CapabilitySet, DecoderSet, Device, Operation};
pub use readings::{MeasureReport, MEASURE_SEQUENCE};
pub use state::{Changed, Field, MeterState};
