//! Scripted meter replies shared by the integration tests.

#![allow(dead_code)]

use meterbridge_rs::kaskad::command::Command;
use meterbridge_rs::kaskad::frame::{parse_frame, unstuff};
use meterbridge_rs::kaskad::link_mock::{encode_response, MockLink};

pub const ADDR: u16 = 20109;

pub fn reply(link: &MockLink, command: Command, payload: &[u8]) {
    link.queue_reply(encode_response(command, ADDR, 0, payload).unwrap());
}

pub fn tariffs_payload(t1: u32, t2: u32, t3: u32) -> Vec<u8> {
    [t1, t2, t3].iter().flat_map(|t| t.to_le_bytes()).collect()
}

pub fn text_payload(sub_command: u8, text: &str) -> Vec<u8> {
    let mut payload = vec![sub_command];
    payload.extend_from_slice(text.as_bytes());
    payload.push(0);
    payload
}

/// Queues answers for one full measurement pass.
pub fn reply_measure(link: &MockLink) {
    reply(link, Command::TariffsData, &tariffs_payload(1000, 2000, 3000));
    reply(link, Command::ResourceBattery, &[50, 0, 100, 0]);
    reply(link, Command::VoltsData, &[0x01, 0xE6, 0x00]);
    reply(link, Command::PowerData, &[0x10, 0x27, 0x00]);
    reply(link, Command::AmpsData, &[0x01, 0x40, 0x42, 0x0F]);
}

/// Commands the host sent, decoded from the captured request frames.
pub fn sent_commands(link: &MockLink) -> Vec<Command> {
    link.tx_frames()
        .iter()
        .map(|wire| {
            let packet = parse_frame(&unstuff(wire).unwrap()).unwrap();
            let sub = packet.payload.first().copied().unwrap_or(0) as u16;
            Command::from_id(packet.header.command as u16 | sub << 8).unwrap()
        })
        .collect()
}
