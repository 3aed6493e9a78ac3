//! Tests for the logging helpers.

use meterbridge_rs::kaskad::command::Command;
use meterbridge_rs::kaskad::frame::encode_request;
use meterbridge_rs::logging::{init_logger_with_level, log_frame, log_info};

/// Tests that the helpers do not panic once a logger is installed.
#[test]
fn test_logging() {
    init_logger_with_level("debug");
    log_info("This is an info message");
    log_frame("request pkt", &encode_request(Command::TariffsData, 20109).unwrap());
}

/// Tests that installing the logger twice is harmless.
#[test]
fn test_init_logger_twice() {
    init_logger_with_level("info");
    init_logger_with_level("warn");
}
