//! Mock meter link for testing
//!
//! This module provides a scripted [`MeterLink`] that can be used to test the
//! transport session, decoders and poller without a meter on the wire. Writes
//! can be scripted to fail or come up short, received bytes can be made to
//! appear after a (tokio virtual-time) delay, and canned replies can be armed
//! to arrive right after the next complete request.

use crate::constants::*;
use crate::error::MeterError;
use crate::kaskad::command::Command;
use crate::kaskad::frame::{stuff, Direction, Packet, PacketHeader};
use crate::kaskad::link::MeterLink;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// How the mock answers one write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBehavior {
    /// Accept every byte.
    Accept,
    /// Accept only this many bytes.
    Short(usize),
    /// Fail with an I/O error.
    Fail,
}

#[derive(Default)]
struct MockState {
    write_script: VecDeque<WriteBehavior>,
    write_attempts: usize,
    tx_frames: Vec<Vec<u8>>,
    rx: VecDeque<u8>,
    delayed: Vec<(Instant, Vec<u8>)>,
    replies: VecDeque<Vec<u8>>,
    reads: usize,
}

/// Mock link that simulates a meter on the other end of the UART.
#[derive(Clone, Default)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the outcome of the next write calls; unscripted writes are accepted.
    pub fn script_writes<I: IntoIterator<Item = WriteBehavior>>(&self, script: I) {
        self.state.lock().unwrap().write_script.extend(script);
    }

    /// Queue data to be read from the link right away.
    pub fn queue_rx_data(&self, data: &[u8]) {
        self.state.lock().unwrap().rx.extend(data);
    }

    /// Queue data that becomes readable once `delay` has elapsed.
    pub fn queue_rx_data_after(&self, delay: Duration, data: &[u8]) {
        let due = Instant::now() + delay;
        self.state.lock().unwrap().delayed.push((due, data.to_vec()));
    }

    /// Arms a reply that is delivered as soon as the next write is fully accepted.
    pub fn queue_reply(&self, frame: Vec<u8>) {
        self.state.lock().unwrap().replies.push_back(frame);
    }

    /// Frames that were fully or partially accepted, in write order.
    pub fn tx_frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().tx_frames.clone()
    }

    /// Number of write calls made so far, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.state.lock().unwrap().write_attempts
    }

    /// Number of bytes the session has read so far.
    pub fn reads(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    /// Bytes still waiting to be read (delayed data excluded).
    pub fn rx_pending(&self) -> usize {
        self.state.lock().unwrap().rx.len()
    }

    /// Clear all buffers and scripts.
    pub fn clear(&self) {
        *self.state.lock().unwrap() = MockState::default();
    }
}

#[async_trait::async_trait]
impl MeterLink for MockLink {
    async fn write_bytes(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.write_attempts += 1;

        let behavior = state.write_script.pop_front().unwrap_or(WriteBehavior::Accept);
        let accepted = match behavior {
            WriteBehavior::Accept => data.len(),
            WriteBehavior::Short(n) => n.min(data.len()),
            WriteBehavior::Fail => {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted write failure"))
            }
        };

        state.tx_frames.push(data[..accepted].to_vec());
        if accepted == data.len() {
            if let Some(reply) = state.replies.pop_front() {
                state.rx.extend(reply);
            }
        }
        Ok(accepted)
    }

    async fn available(&mut self) -> io::Result<usize> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap();

        let mut due: Vec<(Instant, Vec<u8>)> = Vec::new();
        state.delayed.retain(|(at, data)| {
            if *at <= now {
                due.push((*at, data.clone()));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(at, _)| *at);
        for (_, data) in due {
            state.rx.extend(data);
        }

        Ok(state.rx.len())
    }

    async fn read_byte(&mut self) -> io::Result<u8> {
        let mut state = self.state.lock().unwrap();
        let byte = state
            .rx
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "no data buffered"))?;
        state.reads += 1;
        Ok(byte)
    }
}

/// Encodes the escaped frame a meter at `device_address` would send back for `command`.
pub fn encode_response(
    command: Command,
    device_address: u16,
    status: u8,
    payload: &[u8],
) -> Result<Vec<u8>, MeterError> {
    let header = PacketHeader {
        direction: Direction::FromDevice,
        address_to: PROG_ADDR,
        address_from: device_address,
        command: command.code(),
        password_status: status as u32,
        data_len: 0,
    };
    let packet = Packet::new(header, payload.to_vec())?;
    Ok(stuff(&packet.to_bytes()))
}
