//! The payload module contains the components responsible for decoding the
//! payload of validated Kaskad response packets into typed meter records.

pub mod data_encoding;
pub mod record;

pub use data_encoding::*;
pub use record::{decode_record, MeterRecord};
