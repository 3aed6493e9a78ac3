//! # Kaskad Readings Decoder
//!
//! Fetches one register at a time through a [`MeterSession`], decodes the
//! response payload and folds the result into [`MeterState`]. A failed
//! exchange or an undecodable payload leaves the state untouched; the stale
//! value is kept until a later cycle succeeds.

use crate::error::MeterError;
use crate::kaskad::command::Command;
use crate::kaskad::link::MeterLink;
use crate::kaskad::session::MeterSession;
use crate::meter::state::MeterState;
use crate::payload::data_encoding::{battery_percent, fit_u16};
use crate::payload::record::{decode_record, MeterRecord};
use log::{debug, info, warn};

/// Registers read on every measurement cycle, in order.
pub const MEASURE_SEQUENCE: [Command; 5] = [
    Command::TariffsData,
    Command::ResourceBattery,
    Command::VoltsData,
    Command::PowerData,
    Command::AmpsData,
];

/// Which registers of one measurement pass updated state and which failed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MeasureReport {
    /// Fetched successfully and changed at least one field.
    pub updated: Vec<Command>,
    /// Fetched successfully, nothing new.
    pub unchanged: Vec<Command>,
    /// Exchange or decoding failed.
    pub failed: Vec<Command>,
}

/// Folds a decoded record into `state`. Returns whether any field changed.
pub fn apply_record(
    state: &mut MeterState,
    command: Command,
    record: &MeterRecord,
) -> Result<bool, MeterError> {
    let changed = match record {
        MeterRecord::Tariffs(tariffs) => {
            let mut changed = false;
            for (index, &tariff) in tariffs.iter().enumerate() {
                changed |= state.update_tariff(index, tariff);
            }
            debug!("tariff1: {}, tariff2: {}, tariff3: {}", tariffs[0], tariffs[1], tariffs[2]);
            changed
        }
        MeterRecord::Current { phase, amps } => {
            let amps = fit_u16(*amps);
            debug!("phase: {phase}, amps: {amps}");
            state.update_current(amps)
        }
        MeterRecord::Voltage { phase, volts } => {
            debug!("phase: {phase}, volts: {volts}");
            state.update_voltage(*volts)
        }
        MeterRecord::Power(power) => {
            debug!("power: {power}");
            state.update_power(*power)
        }
        MeterRecord::Battery { worktime, lifetime } => {
            let level = battery_percent(*worktime, *lifetime).ok_or_else(|| {
                MeterError::InvalidRecord(format!(
                    "battery lifetime is zero (worktime {worktime})"
                ))
            })?;
            debug!("Resource battery: {level}%");
            state.update_battery(level)
        }
        MeterRecord::Text(bytes) => match command {
            Command::SerialNumber => {
                info!("Serial Number: {}", String::from_utf8_lossy(bytes));
                state.update_serial_number(bytes)
            }
            Command::DateRelease => {
                info!("Date of release: {}", String::from_utf8_lossy(bytes));
                state.update_release_date(bytes)
            }
            _ => {
                info!("{command}: {}", String::from_utf8_lossy(bytes));
                false
            }
        },
        MeterRecord::Ack | MeterRecord::Raw(_) => false,
    };
    Ok(changed)
}

/// Runs one exchange for `command` and applies its record to `state`.
pub async fn fetch<L: MeterLink>(
    session: &mut MeterSession<L>,
    state: &mut MeterState,
    command: Command,
) -> Result<bool, MeterError> {
    debug!("Start command to receive {command}");
    let packet = session.exchange(command).await?;
    let record = decode_record(command, &packet.payload)?;
    apply_record(state, command, &record)
}

/// Opens the channel to the meter. `true` when the meter answered.
pub async fn ping<L: MeterLink>(session: &mut MeterSession<L>) -> bool {
    debug!("Start of the ping command");
    session.exchange(Command::OpenChannel).await.is_ok()
}

pub async fn read_tariffs<L: MeterLink>(
    session: &mut MeterSession<L>,
    state: &mut MeterState,
) -> Result<bool, MeterError> {
    fetch(session, state, Command::TariffsData).await
}

pub async fn read_current<L: MeterLink>(
    session: &mut MeterSession<L>,
    state: &mut MeterState,
) -> Result<bool, MeterError> {
    fetch(session, state, Command::AmpsData).await
}

pub async fn read_voltage<L: MeterLink>(
    session: &mut MeterSession<L>,
    state: &mut MeterState,
) -> Result<bool, MeterError> {
    fetch(session, state, Command::VoltsData).await
}

pub async fn read_power<L: MeterLink>(
    session: &mut MeterSession<L>,
    state: &mut MeterState,
) -> Result<bool, MeterError> {
    fetch(session, state, Command::PowerData).await
}

pub async fn read_battery<L: MeterLink>(
    session: &mut MeterSession<L>,
    state: &mut MeterState,
) -> Result<bool, MeterError> {
    fetch(session, state, Command::ResourceBattery).await
}

pub async fn read_serial_number<L: MeterLink>(
    session: &mut MeterSession<L>,
    state: &mut MeterState,
) -> Result<bool, MeterError> {
    fetch(session, state, Command::SerialNumber).await
}

pub async fn read_release_date<L: MeterLink>(
    session: &mut MeterSession<L>,
    state: &mut MeterState,
) -> Result<bool, MeterError> {
    fetch(session, state, Command::DateRelease).await
}

/// Reads every register of [`MEASURE_SEQUENCE`]. A failure on one register
/// does not stop the others.
pub async fn measure<L: MeterLink>(
    session: &mut MeterSession<L>,
    state: &mut MeterState,
) -> MeasureReport {
    let mut report = MeasureReport::default();
    for command in MEASURE_SEQUENCE {
        match fetch(session, state, command).await {
            Ok(true) => report.updated.push(command),
            Ok(false) => report.unchanged.push(command),
            Err(e) => {
                if !matches!(e, MeterError::Exchange(_)) {
                    warn!("{command}: {e}");
                }
                report.failed.push(command);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::state::{Changed, Field};

    fn quiet_state() -> MeterState {
        let mut state = MeterState::new();
        state.take_changed(Changed::all());
        state
    }

    #[test]
    fn test_apply_tariffs_per_register() {
        let mut state = quiet_state();
        apply_record(&mut state, Command::TariffsData, &MeterRecord::Tariffs([10, 20, 30])).unwrap();
        state.take_changed(Changed::all());

        let changed =
            apply_record(&mut state, Command::TariffsData, &MeterRecord::Tariffs([9, 21, 30]))
                .unwrap();
        assert!(changed);
        assert_eq!(state.tariffs(), [10, 21, 30]);
        assert_eq!(state.changed(), Changed::TARIFF_2);
    }

    #[test]
    fn test_apply_current_fits_sixteen_bits() {
        let mut state = quiet_state();
        let record = MeterRecord::Current { phase: 1, amps: 1_234_567 };
        assert!(apply_record(&mut state, Command::AmpsData, &record).unwrap());
        assert_eq!(state.current(), 12345);
        assert_eq!(state.notify_pending(Field::Current), crate::constants::NOTIFY_MAX);
    }

    #[test]
    fn test_apply_battery_zero_lifetime() {
        let mut state = quiet_state();
        let record = MeterRecord::Battery { worktime: 5, lifetime: 0 };
        let err = apply_record(&mut state, Command::ResourceBattery, &record).unwrap_err();
        assert!(matches!(err, MeterError::InvalidRecord(_)));
        assert_eq!(state.battery_level(), 0);
        assert!(state.changed().is_empty());
    }

    #[test]
    fn test_apply_text_for_unpublished_command() {
        let mut state = quiet_state();
        let record = MeterRecord::Text(b"KASKAD".to_vec());
        assert!(!apply_record(&mut state, Command::FactoryManufacturer, &record).unwrap());
        assert_eq!(state.serial_number(), "");
    }
}
