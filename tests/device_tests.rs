//! Tests for binding meter models and dispatching operations to their decoders.

mod common;

use common::*;
use meterbridge_rs::config::{BridgeConfig, DeviceType};
use meterbridge_rs::error::MeterError;
use meterbridge_rs::kaskad::command::Command;
use meterbridge_rs::kaskad::link_mock::MockLink;
use meterbridge_rs::kaskad::session::{MeterSession, SessionConfig};
use meterbridge_rs::meter::device::{Capability, DecoderSet, Device, Operation};
use meterbridge_rs::meter::state::MeterState;

fn session(link: &MockLink) -> MeterSession<MockLink> {
    MeterSession::new(link.clone(), SessionConfig::for_address(ADDR))
}

#[test]
fn test_capability_table() {
    for device_type in [DeviceType::Kaskad1Mt, DeviceType::Kaskad11] {
        let device = Device::bind(device_type);
        for operation in [Operation::Measure, Operation::GetReleaseDate, Operation::GetSerialNumber] {
            assert_eq!(
                device.capabilities().get(operation),
                Capability::Bound(DecoderSet::Kaskad),
                "{device_type} {operation}"
            );
        }
    }

    let mercury = Device::bind(DeviceType::Mercury206);
    assert!(mercury.supports(Operation::Measure));
    assert!(mercury.supports(Operation::GetReleaseDate));
    assert_eq!(mercury.capabilities().get(Operation::GetSerialNumber), Capability::Unsupported);
}

#[test]
fn test_configured_type_is_kept() {
    let mut config = BridgeConfig {
        device_type: DeviceType::Kaskad11,
        ..Default::default()
    };
    let device = Device::from_config(&mut config);
    assert_eq!(device.device_type(), DeviceType::Kaskad11);
    assert_eq!(config.device_type, DeviceType::Kaskad11);
}

#[test]
fn test_undefined_type_written_back() {
    let mut config = BridgeConfig::default();
    assert_eq!(config.device_type, DeviceType::Undefined);

    Device::from_config(&mut config);
    assert_eq!(config.device_type, DeviceType::Kaskad1Mt);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_serial_number_sends_nothing() {
    let link = MockLink::new();
    let mut session = session(&link);
    let mut state = MeterState::new();
    let device = Device::bind(DeviceType::Mercury206);

    let err = device.get_serial_number(&mut session, &mut state).await.unwrap_err();

    assert!(matches!(
        err,
        MeterError::Unsupported {
            operation: Operation::GetSerialNumber,
            device: DeviceType::Mercury206
        }
    ));
    assert_eq!(err.to_string(), "get serial number is not supported by Mercury-206");
    assert_eq!(link.write_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_bound_operations_dispatch() {
    let link = MockLink::new();
    let mut session = session(&link);
    let mut state = MeterState::new();
    let device = Device::bind(DeviceType::Kaskad1Mt);

    reply(&link, Command::SerialNumber, &text_payload(0x01, "009217"));
    reply(&link, Command::DateRelease, &text_payload(0x02, "01.02.2020"));
    reply_measure(&link);

    assert!(device.get_serial_number(&mut session, &mut state).await.unwrap());
    assert!(device.get_release_date(&mut session, &mut state).await.unwrap());
    let report = device.measure(&mut session, &mut state).await.unwrap();

    assert!(report.failed.is_empty());
    assert_eq!(state.serial_number(), "009217");
    assert_eq!(state.release_date(), "01.02.2020");
    assert_eq!(state.voltage(), 230);
}
