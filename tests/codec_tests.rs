//! Tests for the command codec: request packing, confirm and indication
//! parsing, and the trailing security block.

use ca821x_core::api::confirms::{
    AssociateConfirm, BeaconNotifyIndication, CommStatusIndication, DataIndication, PurgeConfirm,
};
use ca821x_core::api::requests::{self, StartParams};
use ca821x_core::api::security::{parse_full_addr, parse_sec_spec, FullAddr, SecSpec};
use ca821x_core::*;
use nom::number::complete::{le_u16, le_u32};
use proptest::prelude::*;

fn secured() -> SecSpec {
    SecSpec {
        security_level: 5,
        key_id_mode: 1,
        key_source: [1, 2, 3, 4, 5, 6, 7, 8],
        key_index: 3,
    }
}

/// Parses the trailing security block and checks nothing follows it.
fn assert_security_tail(rest: &[u8], expected: &SecSpec) {
    let (rest, security) = parse_sec_spec(rest).unwrap();
    assert_eq!(&security, expected);
    assert!(rest.is_empty());
}

/// Tests that an associate request unpacks to its fields for an unsecured
/// and a secured block.
#[test]
fn test_associate_request_fields_recovered() {
    let coord = FullAddr::extended(0xBEEF, [8, 7, 6, 5, 4, 3, 2, 1]);
    for security in [SecSpec::none(), secured()] {
        let msg = requests::mlme_associate_request(15, &coord, 0x8E, &security).unwrap();
        assert_eq!(msg.len(), 13 + security.encoded_len());

        let payload = msg.payload();
        assert_eq!(payload[0], 15);
        let (rest, parsed_coord) = parse_full_addr(&payload[1..]).unwrap();
        assert_eq!(parsed_coord, coord);
        assert_eq!(rest[0], 0x8E);
        let (rest, parsed_security) = parse_sec_spec(&rest[1..]).unwrap();
        assert_eq!(parsed_security, security);
        assert!(rest.is_empty());
    }
}

/// Tests that a data indication with a secured trailer decodes on both
/// hardware generations.
#[test]
fn test_data_indication_security_trailer() {
    let src = FullAddr::short(0x1234, 0x0001);
    let dst = FullAddr::short(0x1234, 0x0002);
    for variant in [ChipVariant::Ca8210, ChipVariant::Ca8211] {
        let mut p = Vec::new();
        src.write_to(&mut p);
        dst.write_to(&mut p);
        p.extend_from_slice(&[2, 200, 9, 0x10, 0, 0, 0]);
        if variant == ChipVariant::Ca8211 {
            p.push(1);
        }
        p.extend_from_slice(&[0xCA, 0xFE]);
        secured().write_to(&mut p);

        let msg = Message::new(MCPS_DATA_INDICATION, &p).unwrap();
        let ind = DataIndication::from_message(&msg, variant).unwrap();
        assert_eq!(ind.src, src);
        assert_eq!(ind.dst, dst);
        assert_eq!(ind.link_quality, 200);
        assert_eq!(ind.timestamp, 0x10);
        assert_eq!(ind.msdu, vec![0xCA, 0xFE]);
        assert_eq!(ind.security, secured());
        assert_eq!(ind.frame_pending.is_some(), variant == ChipVariant::Ca8211);
    }
}

/// Tests the associate confirm, purge confirm and comm-status layouts.
#[test]
fn test_management_confirms() {
    let msg = Message::new(MLME_ASSOCIATE_CONFIRM, &[0x02, 0x00, 0x00, 0x00]).unwrap();
    let cnf = AssociateConfirm::from_message(&msg, ChipVariant::Ca8211).unwrap();
    assert_eq!(cnf.short_address, 0x0002);
    assert!(cnf.status.is_success());

    let msg = Message::new(MCPS_PURGE_CONFIRM, &[0x11, 0xF0]).unwrap();
    let cnf = PurgeConfirm::from_message(&msg, ChipVariant::Ca8211).unwrap();
    assert_eq!(cnf.msdu_handle, 0x11);
    assert_eq!(cnf.status, MacStatus(0xF0));

    let mut p = 0x1234u16.to_le_bytes().to_vec();
    p.push(MAC_MODE_SHORT_ADDR);
    p.extend_from_slice(&[0x01, 0x00, 0, 0, 0, 0, 0, 0]);
    p.push(MAC_MODE_LONG_ADDR);
    p.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
    p.extend_from_slice(&[0xE8, 0]);
    let msg = Message::new(MLME_COMM_STATUS_INDICATION, &p).unwrap();
    let ind = CommStatusIndication::from_message(&msg, ChipVariant::Ca8211).unwrap();
    assert_eq!(ind.src.mac_addr(), Some(MacAddr::Short(0x0001)));
    assert_eq!(ind.dst.mac_addr(), Some(MacAddr::Extended([1, 2, 3, 4, 5, 6, 7, 8])));
    assert_eq!(ind.status, MacStatus::INVALID_PARAMETER);
}

/// Tests that a beacon notification exposes its pending address lists and
/// beacon payload.
#[test]
fn test_beacon_notify_pending_addresses() {
    let mut p = vec![0x42];
    FullAddr::short(0x1234, 0x0000).write_to(&mut p);
    p.extend_from_slice(&[20, 0xFF, 0xCF, 0, 150, 0, 0, 0, 0, 0, 0]);
    // one short and one extended pending address
    p.push(0x11);
    p.extend_from_slice(&0x0007u16.to_le_bytes());
    p.extend_from_slice(&[9; 8]);
    p.extend_from_slice(&[3, b'a', b'b', b'c']);

    let msg = Message::new(MLME_BEACON_NOTIFY_INDICATION, &p).unwrap();
    let ind = BeaconNotifyIndication::from_message(&msg, ChipVariant::Ca8211).unwrap();
    assert_eq!(ind.bsn, 0x42);
    assert_eq!(ind.pan_descriptor.channel, 20);
    assert_eq!(ind.pan_descriptor.link_quality, 150);
    assert_eq!(ind.pending_short, vec![0x0007]);
    assert_eq!(ind.pending_extended, vec![[9; 8]]);
    assert_eq!(ind.sdu, b"abc".to_vec());
}

/// Tests that every synchronous request kind maps to its confirm and
/// asynchronous kinds have none.
#[test]
fn test_sync_response_table() {
    use ca821x_core::transport::sync_response_id;
    assert_eq!(sync_response_id(MLME_GET_REQUEST), Some(MLME_GET_CONFIRM));
    assert_eq!(sync_response_id(MLME_SET_REQUEST), Some(MLME_SET_CONFIRM));
    assert_eq!(sync_response_id(TDME_SETSFR_REQUEST), Some(TDME_SETSFR_CONFIRM));
    assert_eq!(sync_response_id(HWME_HAES_REQUEST), Some(HWME_HAES_CONFIRM));
    assert_eq!(sync_response_id(MCPS_DATA_REQUEST), None);
    assert_eq!(sync_response_id(MLME_SCAN_REQUEST), None);
}

/// Tests that whole frames round-trip through the byte-level send path.
#[test]
fn test_send_raw_returns_confirm_bytes() {
    let mut dev = Ca821x::new(MockTransceiver::with_chip_model(), TransportConfig::default()).unwrap();
    let reply = dev
        .send_raw(&[TDME_GETSFR_REQUEST, 2, 1, 0xE1])
        .unwrap()
        .unwrap();
    assert_eq!(reply, vec![TDME_GETSFR_CONFIRM, 4, 0, 1, 0xE1, 0]);
    assert_eq!(dev.send_raw(&[MLME_GET_REQUEST, 5, 0]), Err(Ca821xError::InvalidArgs));
}

/// Tests that a data request unpacks to its fields and that the unsecured
/// form is ten bytes shorter.
#[test]
fn test_data_request_fields_recovered() {
    let dst = FullAddr::short(0x1234, 0x0002);
    let msdu = [0xDE, 0xAD, 0xBE, 0xEF];
    for security in [SecSpec::none(), secured()] {
        let tx_options = TxOptions::ACK_REQUESTED | TxOptions::INDIRECT;
        let msg =
            requests::mcps_data_request(MAC_MODE_LONG_ADDR, &dst, 0x42, tx_options, &msdu, &security).unwrap();
        assert_eq!(msg.command_id(), MCPS_DATA_REQUEST);
        assert_eq!(msg.len(), 15 + msdu.len() + security.encoded_len());

        let payload = msg.payload();
        assert_eq!(payload[0], MAC_MODE_LONG_ADDR);
        let (rest, parsed_dst) = parse_full_addr(&payload[1..]).unwrap();
        assert_eq!(parsed_dst, dst);
        assert_eq!(rest[..3], [msdu.len() as u8, 0x42, tx_options.bits()]);
        assert_eq!(rest[3..7], msdu);
        assert_security_tail(&rest[7..], &security);
    }
}

/// Tests that a disassociate request unpacks to its fields.
#[test]
fn test_disassociate_request_fields_recovered() {
    let device = FullAddr::extended(0xBEEF, [1, 2, 3, 4, 5, 6, 7, 8]);
    for security in [SecSpec::none(), secured()] {
        let msg = requests::mlme_disassociate_request(&device, 2, true, &security).unwrap();
        assert_eq!(msg.len(), 13 + security.encoded_len());

        let (rest, parsed_device) = parse_full_addr(msg.payload()).unwrap();
        assert_eq!(parsed_device, device);
        assert_eq!(rest[..2], [2, 1]);
        assert_security_tail(&rest[2..], &security);
    }
}

/// Tests that an orphan response unpacks to its fields.
#[test]
fn test_orphan_response_fields_recovered() {
    let orphan = [8, 7, 6, 5, 4, 3, 2, 1];
    for security in [SecSpec::none(), secured()] {
        let msg = requests::mlme_orphan_response(orphan, 0x0102, true, &security).unwrap();
        assert_eq!(msg.command_id(), MLME_ORPHAN_RESPONSE);
        assert_eq!(msg.len(), 11 + security.encoded_len());

        let payload = msg.payload();
        assert_eq!(payload[..8], orphan);
        let (rest, short) = le_u16::<_, nom::error::Error<&[u8]>>(&payload[8..]).unwrap();
        assert_eq!(short, 0x0102);
        assert_eq!(rest[0], 1);
        assert_security_tail(&rest[1..], &security);
    }
}

/// Tests that a scan request unpacks to its fields.
#[test]
fn test_scan_request_fields_recovered() {
    for security in [SecSpec::none(), secured()] {
        let msg = requests::mlme_scan_request(ACTIVE_SCAN, 0x07FF_F800, 5, &security).unwrap();
        assert_eq!(msg.len(), 6 + security.encoded_len());

        let payload = msg.payload();
        assert_eq!(payload[0], ACTIVE_SCAN);
        let (rest, channels) = le_u32::<_, nom::error::Error<&[u8]>>(&payload[1..]).unwrap();
        assert_eq!(channels, 0x07FF_F800);
        assert_eq!(rest[0], 5);
        assert_security_tail(&rest[1..], &security);
    }
}

/// Tests that both security blocks of a start request shrink independently.
#[test]
fn test_start_request_fields_recovered() {
    for (realign, beacon) in [(SecSpec::none(), secured()), (secured(), SecSpec::none())] {
        let params = StartParams {
            pan_id: 0x1AAA,
            channel: 11,
            beacon_order: 15,
            superframe_order: 15,
            pan_coordinator: true,
            battery_life_extension: false,
            coord_realignment: true,
            coord_realign_security: realign,
            beacon_security: beacon,
        };
        let msg = requests::mlme_start_request(&params).unwrap();
        assert_eq!(msg.len(), 8 + realign.encoded_len() + beacon.encoded_len());

        let payload = msg.payload();
        assert_eq!(u16::from_le_bytes([payload[0], payload[1]]), 0x1AAA);
        assert_eq!(payload[2..8], [11, 15, 15, 1, 0, 1]);
        let (rest, parsed_realign) = parse_sec_spec(&payload[8..]).unwrap();
        assert_eq!(parsed_realign, realign);
        assert_security_tail(rest, &beacon);
    }
}

/// Tests that a poll request carries the interval on the CA-8210 only.
#[test]
fn test_poll_request_fields_recovered() {
    let coord = FullAddr::short(0x1234, 0x0000);
    for security in [SecSpec::none(), secured()] {
        for variant in [ChipVariant::Ca8210, ChipVariant::Ca8211] {
            let msg = requests::mlme_poll_request(variant, &coord, 30, &security).unwrap();
            let (mut rest, parsed_coord) = parse_full_addr(msg.payload()).unwrap();
            assert_eq!(parsed_coord, coord);
            if variant == ChipVariant::Ca8210 {
                assert_eq!(msg.len(), 13 + security.encoded_len());
                assert_eq!(u16::from_le_bytes([rest[0], rest[1]]), 30);
                rest = &rest[2..];
            } else {
                assert_eq!(msg.len(), 11 + security.encoded_len());
            }
            assert_security_tail(rest, &security);
        }
    }
}

proptest! {
    #[test]
    fn prop_security_block_round_trips(
        security_level in 0u8..8,
        key_id_mode in 0u8..4,
        key_source in any::<[u8; 8]>(),
        key_index in any::<u8>(),
    ) {
        let security = SecSpec { security_level, key_id_mode, key_source, key_index };
        let msg = requests::mlme_scan_request(PASSIVE_SCAN, 0x0000_0800, 3, &security).unwrap();
        let (rest, parsed) = parse_sec_spec(&msg.payload()[6..]).unwrap();
        prop_assert!(rest.is_empty());
        if security_level == 0 {
            prop_assert_eq!(msg.len(), 7);
            prop_assert_eq!(parsed, SecSpec::none());
        } else {
            prop_assert_eq!(msg.len(), 6 + SecSpec::LEN);
            prop_assert_eq!(parsed, security);
        }
    }
}
