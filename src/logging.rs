use log::{debug, log_enabled, Level};

/// Initializes the logger with the `env_logger` crate.
///
/// Safe to call more than once; later calls leave the first logger in place.
pub fn init_logger() {
    let _ = env_logger::try_init();
}

/// Logs a wire frame as hex at debug level.
///
/// The hex string is only built when debug logging is enabled.
pub fn log_frame(direction: &str, bytes: &[u8]) {
    if log_enabled!(Level::Debug) {
        debug!("{direction} {}", hex::encode(bytes));
    }
}
