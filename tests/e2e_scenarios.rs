//! End-to-end polling scenarios against a scripted meter.
//!
//! These tests drive complete cycles through the poller, session, codec and
//! decoders without hardware, on tokio's paused clock.

mod common;

use common::*;
use meterbridge_rs::config::DeviceType;
use meterbridge_rs::error::PktError;
use meterbridge_rs::kaskad::command::Command;
use meterbridge_rs::kaskad::link_mock::{MockLink, WriteBehavior};
use meterbridge_rs::kaskad::session::{MeterSession, SessionConfig};
use meterbridge_rs::meter::device::Device;
use meterbridge_rs::meter::readings::MEASURE_SEQUENCE;
use meterbridge_rs::meter::state::{Changed, Field};
use meterbridge_rs::meter_poller::{CycleOutcome, MeterPoller};
use std::time::Duration;

fn poller(link: &MockLink, device_type: DeviceType) -> MeterPoller<MockLink> {
    MeterPoller::new(
        MeterSession::new(link.clone(), SessionConfig::for_address(ADDR)),
        Device::bind(device_type),
    )
}

#[tokio::test(start_paused = true)]
async fn test_first_cycle_fetches_identity_once() {
    let link = MockLink::new();
    let mut poller = poller(&link, DeviceType::Kaskad1Mt);

    reply(&link, Command::OpenChannel, &[]);
    reply(&link, Command::SerialNumber, &text_payload(0x01, "009217"));
    reply(&link, Command::DateRelease, &text_payload(0x02, "15.03.2019"));
    reply_measure(&link);

    let outcome = poller.poll_once().await.unwrap();
    assert!(matches!(
        outcome,
        CycleOutcome::Completed { identity_fetched: true, ref report } if report.failed.is_empty()
    ));

    let mut expected = vec![Command::OpenChannel, Command::SerialNumber, Command::DateRelease];
    expected.extend(MEASURE_SEQUENCE);
    assert_eq!(sent_commands(&link), expected);
    assert_eq!(poller.state().serial_number(), "009217");

    // second cycle skips the identity fetch
    link.clear();
    reply(&link, Command::OpenChannel, &[]);
    reply_measure(&link);

    let outcome = poller.poll_once().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Completed { identity_fetched: false, .. }));
    let mut expected = vec![Command::OpenChannel];
    expected.extend(MEASURE_SEQUENCE);
    assert_eq!(sent_commands(&link), expected);
}

#[tokio::test(start_paused = true)]
async fn test_identity_waits_for_first_answer() {
    let link = MockLink::new();
    let mut poller = poller(&link, DeviceType::Kaskad11);

    let outcome = poller.poll_once().await.unwrap();
    assert_eq!(outcome, CycleOutcome::NoResponse(PktError::Timeout));
    assert!(poller.is_first_cycle());
    assert_eq!(sent_commands(&link), vec![Command::OpenChannel]);

    link.clear();
    reply(&link, Command::OpenChannel, &[]);
    let outcome = poller.poll_once().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Completed { identity_fetched: true, .. }));
    assert!(!poller.is_first_cycle());
}

#[tokio::test(start_paused = true)]
async fn test_unwritable_link_skips_cycle() {
    let link = MockLink::new();
    link.script_writes([WriteBehavior::Fail; 3]);
    let mut poller = poller(&link, DeviceType::Kaskad1Mt);

    let outcome = poller.poll_once().await.unwrap();
    assert_eq!(outcome, CycleOutcome::NoResponse(PktError::NotSent));
    assert_eq!(link.write_attempts(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stale_values_survive_failed_cycle() {
    let link = MockLink::new();
    let mut poller = poller(&link, DeviceType::Kaskad1Mt);
    poller.state_mut().take_changed(Changed::all());

    reply(&link, Command::OpenChannel, &[]);
    reply(&link, Command::SerialNumber, &text_payload(0x01, "1"));
    reply(&link, Command::DateRelease, &text_payload(0x02, "01.01.2020"));
    reply_measure(&link);
    poller.poll_once().await.unwrap();
    poller.state_mut().take_changed(Changed::all());

    link.clear();
    reply(&link, Command::OpenChannel, &[]);
    let outcome = poller.poll_once().await.unwrap();

    let CycleOutcome::Completed { report, .. } = outcome else {
        panic!("cycle did not complete");
    };
    assert_eq!(report.failed, MEASURE_SEQUENCE.to_vec());
    assert_eq!(poller.state().voltage(), 230);
    assert_eq!(poller.state().tariffs(), [1000, 2000, 3000]);
    assert!(poller.state().changed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reset_refetches_identity() {
    let link = MockLink::new();
    let mut poller = poller(&link, DeviceType::Mercury206);

    reply(&link, Command::OpenChannel, &[]);
    reply(&link, Command::DateRelease, &text_payload(0x02, "15.03.2019"));
    poller.poll_once().await.unwrap();
    assert!(!poller.is_first_cycle());

    poller.reset();
    link.clear();
    reply(&link, Command::OpenChannel, &[]);
    reply(&link, Command::DateRelease, &text_payload(0x02, "16.03.2019"));
    poller.poll_once().await.unwrap();

    assert_eq!(&sent_commands(&link)[..2], &[Command::OpenChannel, Command::DateRelease]);
    assert_eq!(poller.state().release_date(), "16.03.2019");
    assert_eq!(poller.state().notify_pending(Field::ReleaseDate), 3);
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_when_asked() {
    let link = MockLink::new();
    let mut poller = poller(&link, DeviceType::Kaskad1Mt);
    let mut cycles = 0;

    poller
        .run(Duration::from_secs(30), |outcome, state| {
            assert!(matches!(outcome, CycleOutcome::NoResponse(_)));
            state.take_changed(Changed::all());
            cycles += 1;
            cycles < 3
        })
        .await
        .unwrap();

    assert_eq!(cycles, 3);
    assert_eq!(link.write_attempts(), 3);
}
