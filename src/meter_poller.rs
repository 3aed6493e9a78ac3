//! # Meter Poller
//!
//! This module provides the [`MeterPoller`] struct, the entry point that drives
//! one meter through repeated measurement cycles. A cycle is:
//!
//! 1. Ping the meter with the open-channel command. No answer ends the cycle.
//! 2. On the first answered cycle since startup, fetch the serial number and
//!    the release date once.
//! 3. Read tariffs, battery resource, voltage, power and current.
//!
//! Failures never escalate past the cycle: the affected fields keep their
//! previous values until a later cycle refreshes them.

use crate::config::BridgeConfig;
use crate::error::{MeterError, PktError};
use crate::kaskad::link::{MeterLink, SerialLink};
use crate::kaskad::session::MeterSession;
use crate::meter::device::{Device, Operation};
use crate::meter::readings::{self, MeasureReport};
use crate::meter::state::MeterState;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Result of one [`MeterPoller::poll_once`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The meter did not answer the ping.
    NoResponse(PktError),
    /// The measurement pass ran.
    Completed {
        /// The one-time identity fetch ran during this cycle.
        identity_fetched: bool,
        report: MeasureReport,
    },
}

/// Polls a single meter and accumulates its readings.
pub struct MeterPoller<L: MeterLink> {
    session: MeterSession<L>,
    device: Device,
    state: MeterState,
    first_cycle: bool,
}

impl MeterPoller<SerialLink> {
    /// Opens the configured serial port and binds the configured device model.
    /// An undefined model is resolved and written back into `config`.
    pub fn open(config: &mut BridgeConfig) -> Result<Self, MeterError> {
        config.validate()?;
        let link = SerialLink::open_with_config(&config.port, config.serial_config())?;
        let device = Device::from_config(config);
        Ok(MeterPoller::new(
            MeterSession::new(link, config.session_config()),
            device,
        ))
    }
}

impl<L: MeterLink> MeterPoller<L> {
    pub fn new(session: MeterSession<L>, device: Device) -> Self {
        MeterPoller {
            session,
            device,
            state: MeterState::new(),
            first_cycle: true,
        }
    }

    pub fn state(&self) -> &MeterState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MeterState {
        &mut self.state
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn session(&self) -> &MeterSession<L> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MeterSession<L> {
        &mut self.session
    }

    /// Whether the identity fetch is still pending.
    pub fn is_first_cycle(&self) -> bool {
        self.first_cycle
    }

    /// Schedules the identity fetch again, as after a reset.
    pub fn reset(&mut self) {
        self.first_cycle = true;
    }

    /// Rebinds the device model and reschedules the identity fetch.
    pub fn set_device(&mut self, device: Device) {
        self.device = device;
        self.first_cycle = true;
    }

    /// Sends the open-channel command.
    pub async fn ping(&mut self) -> Result<(), PktError> {
        if readings::ping(&mut self.session).await {
            Ok(())
        } else {
            Err(self.session.last_error().unwrap_or(PktError::Timeout))
        }
    }

    /// Fetches the serial number and release date through the bound device.
    /// Unsupported operations are logged and skipped.
    pub async fn fetch_identity(&mut self) {
        for operation in [Operation::GetSerialNumber, Operation::GetReleaseDate] {
            let result = match operation {
                Operation::GetSerialNumber => {
                    self.device
                        .get_serial_number(&mut self.session, &mut self.state)
                        .await
                }
                _ => {
                    self.device
                        .get_release_date(&mut self.session, &mut self.state)
                        .await
                }
            };
            match result {
                Ok(changed) => debug!("{operation}: changed {changed}"),
                Err(e @ MeterError::Unsupported { .. }) => info!("{e}"),
                Err(MeterError::Exchange(_)) => {}
                Err(e) => warn!("{operation}: {e}"),
            }
        }
    }

    /// Runs one measurement cycle.
    pub async fn poll_once(&mut self) -> Result<CycleOutcome, MeterError> {
        if !self.device.supports(Operation::Measure) {
            return Err(MeterError::Unsupported {
                operation: Operation::Measure,
                device: self.device.device_type(),
            });
        }

        if let Err(e) = self.ping().await {
            warn!("{} did not answer: {e}", self.device.device_type());
            return Ok(CycleOutcome::NoResponse(e));
        }

        let identity_fetched = self.first_cycle;
        if self.first_cycle {
            self.fetch_identity().await;
            self.first_cycle = false;
        }

        let report = self.device.measure(&mut self.session, &mut self.state).await?;
        info!(
            "Cycle done: {} updated, {} unchanged, {} failed",
            report.updated.len(),
            report.unchanged.len(),
            report.failed.len()
        );
        Ok(CycleOutcome::Completed {
            identity_fetched,
            report,
        })
    }

    /// Runs a cycle every `period`, handing each outcome to `on_cycle`.
    /// Stops when `on_cycle` returns `false` or a cycle fails outright.
    pub async fn run<F>(&mut self, period: Duration, mut on_cycle: F) -> Result<(), MeterError>
    where
        F: FnMut(&CycleOutcome, &mut MeterState) -> bool,
    {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let outcome = self.poll_once().await?;
            if !on_cycle(&outcome, &mut self.state) {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceType;
    use crate::kaskad::command::Command;
    use crate::kaskad::link_mock::{encode_response, MockLink};
    use crate::kaskad::session::SessionConfig;

    const ADDR: u16 = 0x1234;

    fn poller(link: &MockLink, device_type: DeviceType) -> MeterPoller<MockLink> {
        MeterPoller::new(
            MeterSession::new(link.clone(), SessionConfig::for_address(ADDR)),
            Device::bind(device_type),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_meter_skips_cycle() {
        let link = MockLink::new();
        let mut poller = poller(&link, DeviceType::Kaskad1Mt);

        let outcome = poller.poll_once().await.unwrap();
        assert_eq!(outcome, CycleOutcome::NoResponse(PktError::Timeout));
        assert!(poller.is_first_cycle());
        assert_eq!(link.tx_frames().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mercury_skips_serial_number() {
        let link = MockLink::new();
        let mut poller = poller(&link, DeviceType::Mercury206);

        link.queue_reply(encode_response(Command::OpenChannel, ADDR, 0, &[]).unwrap());
        let mut date = vec![0x02];
        date.extend_from_slice(b"15.03.2019\0");
        link.queue_reply(encode_response(Command::DateRelease, ADDR, 0, &date).unwrap());

        let outcome = poller.poll_once().await.unwrap();
        let CycleOutcome::Completed { identity_fetched, report } = outcome else {
            panic!("cycle did not complete");
        };
        assert!(identity_fetched);
        assert_eq!(report.failed.len(), 5);
        assert_eq!(poller.state().release_date(), "15.03.2019");
        assert_eq!(poller.state().serial_number(), "");
        assert!(!poller.is_first_cycle());
    }
}
