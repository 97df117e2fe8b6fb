//! Tests for the transceiver workarounds applied around requests: the
//! boundary-length fix, the mixed direct/indirect probe, channel
//! calibration and recovery of a stalled transmission cache.

use std::cell::RefCell;
use std::rc::Rc;

use ca821x_core::api::security::{FullAddr, SecSpec};
use ca821x_core::*;

fn device(variant: ChipVariant) -> (Ca821x<MockTransceiver>, MockTransceiver) {
    let mock = MockTransceiver::with_chip_model();
    let config = TransportConfig {
        sync_timeout_ms: 20,
        ..TransportConfig::for_variant(variant)
    };
    (Ca821x::new(mock.clone(), config).unwrap(), mock)
}

fn send_data(dev: &mut Ca821x<MockTransceiver>, handle: u8, tx_options: TxOptions) -> Result<(), Ca821xError> {
    dev.mcps_data_request(
        MAC_MODE_SHORT_ADDR,
        &FullAddr::short(0x1234, 0x0002),
        handle,
        tx_options,
        &[0x01, 0x02],
        &SecSpec::none(),
    )
}

/// Tests that the boundary-length fix is undone after the PHY data request
/// and that undoing it a second time sends nothing.
#[test]
fn test_boundary_fix_undone_once() {
    let (mut dev, mock) = device(ChipVariant::Ca8211);
    mock.set_pib(MAC_RX_ON_WHEN_IDLE, &[1]);

    dev.pcps_data_request(3, TxOptions::empty(), &[0x55; 17]).unwrap();
    let ids = mock.received_ids();
    let data_at = ids.iter().position(|&id| id == PCPS_DATA_REQUEST).unwrap();
    assert!(ids[..data_at].contains(&TDME_SETSFR_REQUEST));
    assert!(ids[data_at..].contains(&TDME_SETSFR_REQUEST));

    assert!(!dev.hotfix().boundary_fix_active);
    assert_eq!(mock.sfr(0, 0xD9), Some(0x0F));
    assert_eq!(mock.hwme(0x8A), Some(vec![0x93, 0x68, 0x00]));
    assert_eq!(mock.pib(MAC_RX_ON_WHEN_IDLE), Some(vec![1]));

    mock.clear_received();
    dev.boundary_post_fix();
    assert!(mock.received().is_empty());
}

/// Tests that other PHY data lengths go out untouched.
#[test]
fn test_regular_length_not_bracketed() {
    let (mut dev, mock) = device(ChipVariant::Ca8211);
    dev.pcps_data_request(3, TxOptions::empty(), &[0x55; 20]).unwrap();
    assert_eq!(mock.received_ids(), vec![PCPS_DATA_REQUEST]);
}

/// Tests that a direct data request sent while an indirect one is queued
/// is followed by the fixed probe on the CA-8211 only.
#[test]
fn test_mixed_direct_indirect_probe() {
    let (mut dev, mock) = device(ChipVariant::Ca8211);
    send_data(&mut dev, 1, TxOptions::INDIRECT).unwrap();
    send_data(&mut dev, 2, TxOptions::ACK_REQUESTED).unwrap();
    assert_eq!(
        mock.received_ids(),
        vec![MCPS_DATA_REQUEST, MCPS_DATA_REQUEST, MLME_POLL_REQUEST]
    );
    assert_eq!(mock.received()[2], vec![MLME_POLL_REQUEST, 0x01, 0x00]);

    let (mut dev, mock) = device(ChipVariant::Ca8210);
    send_data(&mut dev, 1, TxOptions::INDIRECT).unwrap();
    send_data(&mut dev, 2, TxOptions::ACK_REQUESTED).unwrap();
    assert_eq!(mock.received_ids(), vec![MCPS_DATA_REQUEST, MCPS_DATA_REQUEST]);
}

/// Tests that a channel change writes the LO calibration before the set
/// request goes out.
#[test]
fn test_channel_change_calibrates_first() {
    let (mut dev, mock) = device(ChipVariant::Ca8211);
    dev.mlme_set_request_sync(PHY_CURRENT_CHANNEL, 0, &[15]).unwrap();
    assert_eq!(mock.received_ids(), vec![TDME_SETSFR_REQUEST, MLME_SET_REQUEST]);
    assert_eq!(mock.sfr(1, 0xBF), Some(0xAD));
}

/// Tests that an unconfirmed transmission triggers recovery: a failure
/// confirm reaches the handler, the MAC is reset and the receiver state is
/// restored.
#[test]
fn test_stalled_cache_recovered() {
    let (mut dev, mock) = device(ChipVariant::Ca8211);
    mock.set_pib(MAC_RX_ON_WHEN_IDLE, &[1]);
    let confirms = Rc::new(RefCell::new(Vec::new()));
    let c = confirms.clone();
    dev.set_handler(MCPS_DATA_CONFIRM, move |msg, _| {
        c.borrow_mut().push((msg.byte(0), MacStatus(msg.byte(1))));
        Ok(())
    })
    .unwrap();

    send_data(&mut dev, 9, TxOptions::ACK_REQUESTED).unwrap();
    dev.drain().unwrap();
    mock.advance_ms(1000);
    dev.drain().unwrap();

    assert_eq!(*confirms.borrow(), vec![(9, MacStatus::SYSTEM_ERROR)]);
    assert_eq!(dev.cache().active_count(), 0);
    assert!(mock.received_ids().contains(&MLME_RESET_REQUEST));
    assert_eq!(mock.pib(MAC_RX_ON_WHEN_IDLE), Some(vec![1]));
    assert!(!dev.hotfix().flush_active);
}

/// Tests that a successful purge removes the cache entry so no recovery
/// happens later.
#[test]
fn test_purged_entry_not_recovered() {
    let (mut dev, mock) = device(ChipVariant::Ca8211);
    send_data(&mut dev, 4, TxOptions::ACK_REQUESTED).unwrap();
    dev.mcps_purge_request_sync(4).unwrap();
    assert_eq!(dev.cache().active_count(), 0);

    mock.advance_ms(1000);
    mock.clear_received();
    dev.drain().unwrap();
    assert!(!mock.received_ids().contains(&MLME_RESET_REQUEST));
}

/// Tests chip init on the CA-8210 clears the hardware LQI limit and writes
/// the TX power default.
#[test]
fn test_chip_init_defaults() {
    let (mut dev, mock) = device(ChipVariant::Ca8210);
    dev.tdme_chip_init().unwrap();
    assert_eq!(mock.sfr(0, 0xFE), Some(0x3F));
    assert_eq!(mock.sfr(1, 0xE1), Some(0x29));
    assert_eq!(mock.hwme(HWME_LQI_LIMIT), Some(vec![0]));

    let (mut dev, mock) = device(ChipVariant::Ca8211);
    dev.tdme_chip_init().unwrap();
    assert_eq!(mock.hwme(HWME_LQI_LIMIT), None);
}

/// Tests that asynchronous requests are refused while a sync chain is
/// running and accepted again once it stops.
#[test]
fn test_sync_chain_blocks_async_requests() {
    let (mut dev, mock) = device(ChipVariant::Ca8211);
    dev.start_sync_chain().unwrap();
    assert_eq!(send_data(&mut dev, 1, TxOptions::empty()), Err(Ca821xError::InvalidState));
    dev.tdme_setsfr_request_sync(1, 0xE2, 0x54).unwrap();
    dev.stop_sync_chain().unwrap();

    send_data(&mut dev, 1, TxOptions::empty()).unwrap();
    assert_eq!(mock.sfr(1, 0xE2), Some(0x54));
    assert_eq!(mock.received_ids().last(), Some(&MCPS_DATA_REQUEST));
}
