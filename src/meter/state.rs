//! # Meter State
//!
//! Last-known meter readings plus the change bookkeeping consumed by the
//! notification layer. A single [`MeterState`] lives for the whole process;
//! only the readings decoder mutates it, and only with values taken from
//! fully validated responses.
//!
//! Two outputs are exposed to the notification layer:
//!
//! - [`Changed`] flags, raised when a field takes a new value and cleared by
//!   the consumer with [`MeterState::take_changed`].
//! - A per-field notify countdown, loaded with [`NOTIFY_MAX`] on every change
//!   and decremented by [`MeterState::consume_notify`].

use crate::constants::{IDENTITY_MAX_LEN, NOTIFY_IDENTITY_LEN, NOTIFY_MAX};
use crate::payload::{parse_release_date, serialize_lossy};
use bitflags::bitflags;
use chrono::NaiveDate;
use serde::Serialize;
use std::borrow::Cow;

bitflags! {
    /// Fields that changed since the notification layer last looked.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Changed: u16 {
        const TARIFF_1      = 0b0000_0000_0001;
        const TARIFF_2      = 0b0000_0000_0010;
        const TARIFF_3      = 0b0000_0000_0100;
        const VOLTAGE       = 0b0000_0000_1000;
        const CURRENT       = 0b0000_0001_0000;
        const POWER         = 0b0000_0010_0000;
        const BATTERY       = 0b0000_0100_0000;
        const SERIAL_NUMBER = 0b0000_1000_0000;
        const RELEASE_DATE  = 0b0001_0000_0000;

        /// Any tariff register.
        const TARIFFS = Self::TARIFF_1.bits() | Self::TARIFF_2.bits() | Self::TARIFF_3.bits();

        /// Power, voltage, current and battery, published together.
        const PVA = Self::VOLTAGE.bits()
            | Self::CURRENT.bits()
            | Self::POWER.bits()
            | Self::BATTERY.bits();
    }
}

/// A single published meter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Field {
    Tariff1,
    Tariff2,
    Tariff3,
    Voltage,
    Current,
    Power,
    Battery,
    SerialNumber,
    ReleaseDate,
}

impl Field {
    pub const COUNT: usize = 9;

    pub const ALL: [Field; Field::COUNT] = [
        Field::Tariff1,
        Field::Tariff2,
        Field::Tariff3,
        Field::Voltage,
        Field::Current,
        Field::Power,
        Field::Battery,
        Field::SerialNumber,
        Field::ReleaseDate,
    ];

    pub fn flag(self) -> Changed {
        match self {
            Field::Tariff1 => Changed::TARIFF_1,
            Field::Tariff2 => Changed::TARIFF_2,
            Field::Tariff3 => Changed::TARIFF_3,
            Field::Voltage => Changed::VOLTAGE,
            Field::Current => Changed::CURRENT,
            Field::Power => Changed::POWER,
            Field::Battery => Changed::BATTERY,
            Field::SerialNumber => Changed::SERIAL_NUMBER,
            Field::ReleaseDate => Changed::RELEASE_DATE,
        }
    }

    pub fn tariff(index: usize) -> Option<Field> {
        match index {
            0 => Some(Field::Tariff1),
            1 => Some(Field::Tariff2),
            2 => Some(Field::Tariff3),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Last-known readings of one meter.
#[derive(Debug, Clone, Serialize)]
pub struct MeterState {
    tariffs: [u32; 3],
    voltage: u16,
    current: u16,
    power: u32,
    battery_level: u8,
    #[serde(serialize_with = "serialize_lossy")]
    serial_number: Vec<u8>,
    #[serde(serialize_with = "serialize_lossy")]
    release_date: Vec<u8>,
    release: Option<NaiveDate>,
    #[serde(skip)]
    serial_number_notify: Vec<u8>,
    #[serde(skip)]
    release_date_notify: Vec<u8>,
    #[serde(skip)]
    changed: Changed,
    #[serde(skip)]
    notify: [u8; Field::COUNT],
}

impl Default for MeterState {
    fn default() -> Self {
        Self::new()
    }
}

impl MeterState {
    /// Fresh state. Tariff and power/voltage/current flags start raised so the
    /// first notification pass publishes the initial snapshot.
    pub fn new() -> Self {
        MeterState {
            tariffs: [0; 3],
            voltage: 0,
            current: 0,
            power: 0,
            battery_level: 0,
            serial_number: Vec::new(),
            release_date: Vec::new(),
            release: None,
            serial_number_notify: Vec::new(),
            release_date_notify: Vec::new(),
            changed: Changed::TARIFFS | Changed::PVA,
            notify: [0; Field::COUNT],
        }
    }

    pub fn tariffs(&self) -> [u32; 3] {
        self.tariffs
    }

    pub fn voltage(&self) -> u16 {
        self.voltage
    }

    pub fn current(&self) -> u16 {
        self.current
    }

    pub fn power(&self) -> u32 {
        self.power
    }

    pub fn battery_level(&self) -> u8 {
        self.battery_level
    }

    /// Serial number as text; bytes that are not UTF-8 are replaced.
    pub fn serial_number(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.serial_number)
    }

    /// Serial number bytes exactly as the meter sent them.
    pub fn serial_number_bytes(&self) -> &[u8] {
        &self.serial_number
    }

    pub fn release_date(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.release_date)
    }

    pub fn release_date_bytes(&self) -> &[u8] {
        &self.release_date
    }

    /// Release date parsed into a calendar date, when the meter's format is recognized.
    pub fn release(&self) -> Option<NaiveDate> {
        self.release
    }

    /// Serial number as handed to the notification layer (possibly truncated).
    pub fn serial_number_notify(&self) -> &[u8] {
        &self.serial_number_notify
    }

    /// Release date as handed to the notification layer (possibly truncated).
    pub fn release_date_notify(&self) -> &[u8] {
        &self.release_date_notify
    }

    pub fn changed(&self) -> Changed {
        self.changed
    }

    /// Clears `mask` and reports whether any of it was raised.
    pub fn take_changed(&mut self, mask: Changed) -> bool {
        let raised = self.changed.intersects(mask);
        self.changed.remove(mask);
        raised
    }

    /// Remaining notify countdown of `field`.
    pub fn notify_pending(&self, field: Field) -> u8 {
        self.notify[field.index()]
    }

    /// Decrements the countdown of `field`; returns whether a notification was due.
    pub fn consume_notify(&mut self, field: Field) -> bool {
        let slot = &mut self.notify[field.index()];
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    fn mark(&mut self, field: Field) {
        self.changed.insert(field.flag());
        self.notify[field.index()] = NOTIFY_MAX;
    }

    /// Tariff registers only move forward: a reading replaces the stored one only when greater.
    pub(crate) fn update_tariff(&mut self, index: usize, value: u32) -> bool {
        let Some(field) = Field::tariff(index) else {
            return false;
        };
        if value <= self.tariffs[index] {
            return false;
        }
        self.tariffs[index] = value;
        self.mark(field);
        true
    }

    pub(crate) fn update_voltage(&mut self, volts: u16) -> bool {
        if self.voltage == volts {
            return false;
        }
        self.voltage = volts;
        self.mark(Field::Voltage);
        true
    }

    pub(crate) fn update_current(&mut self, amps: u16) -> bool {
        if self.current == amps {
            return false;
        }
        self.current = amps;
        self.mark(Field::Current);
        true
    }

    pub(crate) fn update_power(&mut self, power: u32) -> bool {
        if self.power == power {
            return false;
        }
        self.power = power;
        self.mark(Field::Power);
        true
    }

    pub(crate) fn update_battery(&mut self, level: u8) -> bool {
        if self.battery_level == level {
            return false;
        }
        self.battery_level = level;
        self.mark(Field::Battery);
        true
    }

    pub(crate) fn update_serial_number(&mut self, bytes: &[u8]) -> bool {
        let Some(bytes) = changed_identity(&self.serial_number, bytes) else {
            return false;
        };
        self.serial_number_notify = notify_copy(&bytes);
        self.serial_number = bytes;
        self.mark(Field::SerialNumber);
        true
    }

    pub(crate) fn update_release_date(&mut self, bytes: &[u8]) -> bool {
        let Some(bytes) = changed_identity(&self.release_date, bytes) else {
            return false;
        };
        self.release = std::str::from_utf8(&bytes)
            .ok()
            .and_then(|text| parse_release_date(text.trim()));
        self.release_date_notify = notify_copy(&bytes);
        self.release_date = bytes;
        self.mark(Field::ReleaseDate);
        true
    }
}

/// Bounds `bytes` to the state's identity length and returns them when they differ from `stored`.
fn changed_identity(stored: &[u8], bytes: &[u8]) -> Option<Vec<u8>> {
    let bytes = &bytes[..bytes.len().min(IDENTITY_MAX_LEN)];
    (bytes != stored).then(|| bytes.to_vec())
}

fn notify_copy(bytes: &[u8]) -> Vec<u8> {
    bytes[..bytes.len().min(NOTIFY_IDENTITY_LEN)].to_vec()
}
