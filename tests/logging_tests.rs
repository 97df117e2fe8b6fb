//! Tests for logger setup and wire frame dumps.

use ca821x_core::logging::{init_logger, log_frame};
use ca821x_core::{Ca821x, ChipVariant, MockTransceiver, TransportConfig, MAC_PAN_ID};

/// Tests that initializing the logger twice is harmless.
#[test]
fn test_init_logger_twice() {
    init_logger();
    init_logger();
}

/// Tests that frame dumps accept empty and full-size frames.
#[test]
fn test_log_frame() {
    init_logger();
    log_frame("TX", &[]);
    log_frame("RX", &[0x45, 0x02, 0x40, 0x00]);
    log_frame("RX", &[0xFF; 256]);
}

/// Tests that a request/confirm exchange runs with debug frame dumps enabled.
#[test]
fn test_exchange_with_logging_enabled() {
    init_logger();
    log::set_max_level(log::LevelFilter::Debug);
    let config = TransportConfig::for_variant(ChipVariant::Ca8210);
    let mut dev = Ca821x::new(MockTransceiver::with_chip_model(), config).unwrap();
    dev.mlme_set_request_sync(MAC_PAN_ID, 0, &[0xCD, 0xAB]).unwrap();
    assert_eq!(dev.mlme_get_request_sync(MAC_PAN_ID, 0).unwrap(), vec![0xCD, 0xAB]);
}
