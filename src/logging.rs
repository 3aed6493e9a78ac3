use log::{debug, info, log_enabled, Level};

/// Initializes the logger with the `env_logger` crate. `RUST_LOG` selects the level.
pub fn init_logger() {
    env_logger::init();
}

/// Like [`init_logger`], but falls back to `default_level` when `RUST_LOG` is unset.
/// Safe to call more than once.
pub fn init_logger_with_level(default_level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init();
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs `frame` as a hex dump under `label` at debug level.
pub fn log_frame(label: &str, frame: &[u8]) {
    if log_enabled!(Level::Debug) {
        debug!("{label} ({} bytes): {}", frame.len(), crate::util::hex::format_hex_compact(frame));
    }
}
