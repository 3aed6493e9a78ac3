#![no_main]

use libfuzzer_sys::fuzz_target;
use meterbridge_rs::kaskad::command::Command;
use meterbridge_rs::payload::decode_record;

fuzz_target!(|data: &[u8]| {
    if let Some((&selector, payload)) = data.split_first() {
        let command = Command::ALL[selector as usize % Command::ALL.len()];
        let _ = decode_record(command, payload);
    }
});
