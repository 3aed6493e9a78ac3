//! Unit tests for the `PktError` and `MeterError` enums and their `Display` output.

use meterbridge_rs::config::DeviceType;
use meterbridge_rs::error::{MeterError, PktError};
use meterbridge_rs::kaskad::command::Command;
use meterbridge_rs::meter::device::Operation;

/// Tests the plain exchange outcomes.
#[test]
fn test_pkt_error_messages() {
    assert_eq!(PktError::NotSent.to_string(), "No bytes sent");
    assert_eq!(PktError::Timeout.to_string(), "Response timeout");
    assert_eq!(PktError::NoPacket.to_string(), "No packet received");
    assert_eq!(PktError::UnknownFormat.to_string(), "Unknown packet format");
    assert_eq!(PktError::Incomplete.to_string(), "Incomplete packet");
    assert_eq!(PktError::Unstuffing.to_string(), "Byte unstuffing failed");
}

/// Tests the exchange outcomes that carry values.
#[test]
fn test_pkt_error_details() {
    let err = PktError::Crc { expected: 0x1F, calculated: 0xA0 };
    assert_eq!(err.to_string(), "CRC mismatch: expected 0x1F, calculated 0xA0");

    assert_eq!(PktError::Response(0x04).to_string(), "Meter reported error code 0x04");

    let err = PktError::Address { expected: 20109, actual: 1 };
    assert_eq!(err.to_string(), "Address mismatch: expected 20109, got 1");

    let err = PktError::DifferentCommand { expected: 0x05, actual: 0x14 };
    assert_eq!(err.to_string(), "Different command: expected 0x05, got 0x14");
}

/// Tests that exchange outcomes convert into the crate error.
#[test]
fn test_exchange_error_conversion() {
    let err: MeterError = PktError::Timeout.into();
    assert!(matches!(err, MeterError::Exchange(PktError::Timeout)));
    assert_eq!(err.to_string(), "Exchange failed: Response timeout");
}

#[test]
fn test_meter_error_messages() {
    let err = MeterError::ShortPayload {
        command: Command::TariffsData,
        expected: 12,
        actual: 4,
    };
    assert_eq!(
        err.to_string(),
        "Payload too short for tariffs-data: expected 12 bytes, got 4"
    );

    let err = MeterError::Unsupported {
        operation: Operation::Measure,
        device: DeviceType::Kaskad11,
    };
    assert_eq!(err.to_string(), "measure is not supported by Kaskad-11");

    assert_eq!(
        MeterError::SerialPortError("busy".into()).to_string(),
        "Serial port error: busy"
    );
    assert_eq!(MeterError::FrameTooLarge(140).to_string(), "Frame too large: 140 bytes");
}
