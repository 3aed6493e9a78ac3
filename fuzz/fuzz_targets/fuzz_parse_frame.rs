#![no_main]

use libfuzzer_sys::fuzz_target;
use meterbridge_rs::kaskad::frame::{checksum, parse_frame, stuff, unstuff};

fuzz_target!(|data: &[u8]| {
    // Received bytes go through the same steps as in the session
    if let Ok(frame) = unstuff(data) {
        let _ = checksum(&frame);
        let _ = parse_frame(&frame);

        // Escaping what was unescaped must give the input back
        assert_eq!(unstuff(&stuff(&frame)).as_deref(), Ok(frame.as_slice()));
    }

    let _ = parse_frame(data);
});
