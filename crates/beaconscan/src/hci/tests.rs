//! Unit tests for HCI command encoding and event decoding

use super::command::*;
use super::constants::*;
use super::event::*;
use super::socket::{classify_receive_error, command_deadline, HciFilter};
use crate::error::ReceiveError;
use crate::gap::AddressType;
use std::io;
use std::time::{Duration, Instant};

/// Build a raw LE Advertising Report packet as a raw socket returns it
fn advertising_event(reports: &[(u8, [u8; 6], &[u8], u8)]) -> Vec<u8> {
    let mut params = vec![EVT_LE_ADVERTISING_REPORT, reports.len() as u8];
    for (address_type, address, data, rssi) in reports {
        params.push(0x00); // Event_Type: ADV_IND
        params.push(*address_type);
        params.extend_from_slice(address);
        params.push(data.len() as u8);
        params.extend_from_slice(data);
        params.push(*rssi);
    }

    let mut packet = vec![HCI_EVENT_PKT, EVT_LE_META_EVENT, params.len() as u8];
    packet.extend_from_slice(&params);
    packet
}

#[test]
fn test_scan_parameters_command() {
    let command = build_scan_parameters_command();

    assert_eq!(command.ogf(), OGF_LE);
    assert_eq!(command.ocf(), OCF_LE_SET_SCAN_PARAMETERS);
    assert_eq!(command.opcode(), 0x200B);
    assert_eq!(command.response_len(), 1);
    assert_eq!(command.params().len(), LE_SET_SCAN_PARAMETERS_CP_SIZE);
    assert_eq!(command.params(), &[0x00, 0x10, 0x00, 0x10, 0x00, 0x00, 0x00]);

    let params = ScanParameters::from_bytes(command.params()).unwrap();
    assert_eq!(
        params,
        ScanParameters {
            scan_type: LE_SCAN_PASSIVE,
            interval: 0x0010,
            window: 0x0010,
            own_address_type: 0x00,
            filter_policy: LE_SCAN_FILTER_ACCEPT_ALL,
        }
    );
}

#[test]
fn test_scan_parameters_round_trip() {
    let params = ScanParameters {
        scan_type: 0x01,
        interval: 0x4000,
        window: 0x0012,
        own_address_type: 0x01,
        filter_policy: 0x01,
    };

    let bytes = params.to_bytes();
    assert_eq!(bytes, [0x01, 0x00, 0x40, 0x12, 0x00, 0x01, 0x01]);
    assert_eq!(ScanParameters::from_bytes(&bytes), Some(params));

    assert_eq!(ScanParameters::from_bytes(&bytes[..6]), None);
    assert_eq!(ScanParameters::from_bytes(&[0u8; 8]), None);
}

#[test]
fn test_event_mask_command() {
    let command = build_event_mask_command();

    assert_eq!(command.ocf(), OCF_LE_SET_EVENT_MASK);
    assert_eq!(command.opcode(), 0x2001);
    assert_eq!(command.response_len(), 1);
    assert_eq!(command.params(), &[0xFF; 8]);
    assert!(LeEventMask::everything().contains(LeEventMask::ADVERTISING_REPORT));
}

#[test]
fn test_scan_enable_command() {
    let enable = build_scan_enable_command(true);
    assert_eq!(enable.ocf(), OCF_LE_SET_SCAN_ENABLE);
    assert_eq!(enable.opcode(), 0x200C);
    assert_eq!(enable.response_len(), 1);
    assert_eq!(enable.params(), &[0x01, 0x00]);

    let disable = build_scan_enable_command(false);
    assert_eq!(disable.params(), &[0x00, 0x00]);
}

#[test]
fn test_command_packet() {
    let packet = build_scan_enable_command(true).to_packet();

    assert_eq!(packet[0], HCI_COMMAND_PKT);
    assert_eq!(u16::from_le_bytes([packet[1], packet[2]]), 0x200C);
    assert_eq!(packet[3], 2);
    assert_eq!(&packet[4..], &[0x01, 0x00]);
}

#[test]
fn test_hci_event_parsing() {
    // Command Complete for LE Set Scan Enable, status success
    let data = [EVT_CMD_COMPLETE, 4, 1, 0x0C, 0x20, 0x00];

    let event = HciEvent::parse(&data).unwrap();
    assert_eq!(event.event_code, EVT_CMD_COMPLETE);
    assert_eq!(event.parameter_total_length, 4);
    assert_eq!(event.command_opcode(), Some(0x200C));
    assert_eq!(event.command_status(), Some(0x00));

    // Command Status for LE Set Scan Parameters, command disallowed
    let data = [EVT_CMD_STATUS, 4, 0x0C, 1, 0x0B, 0x20];

    let event = HciEvent::parse(&data).unwrap();
    assert_eq!(event.command_opcode(), Some(0x200B));
    assert_eq!(event.command_status(), Some(0x0C));

    // Invalid data tests
    assert!(HciEvent::parse(&[]).is_none());
    assert!(HciEvent::parse(&[EVT_CMD_COMPLETE, 10, 1, 2]).is_none());

    let meta = HciEvent::parse(&[EVT_LE_META_EVENT, 1, EVT_LE_ADVERTISING_REPORT]).unwrap();
    assert_eq!(meta.command_opcode(), None);
    assert_eq!(meta.command_status(), None);
}

#[test]
fn test_decode_short_buffer() {
    assert_eq!(decode(&[]).count(), 0);
    assert_eq!(decode(&[HCI_EVENT_PKT]).count(), 0);
    assert_eq!(decode(&[HCI_EVENT_PKT, EVT_LE_META_EVENT]).count(), 0);
    // Header only, no subevent byte
    assert_eq!(decode(&[HCI_EVENT_PKT, EVT_LE_META_EVENT, 0]).count(), 0);
}

#[test]
fn test_decode_other_subevent() {
    // LE Connection Complete
    let mut packet = advertising_event(&[(0, [1, 2, 3, 4, 5, 6], &[], 0xF6)]);
    packet[3] = 0x01;
    assert_eq!(decode(&packet).count(), 0);
}

#[test]
fn test_decode_other_event() {
    let packet = [HCI_EVENT_PKT, EVT_CMD_COMPLETE, 4, 1, 0x0C, 0x20, 0x00];
    assert_eq!(decode(&packet).count(), 0);

    let mut packet = advertising_event(&[(0, [1, 2, 3, 4, 5, 6], &[], 0xF6)]);
    packet[0] = HCI_COMMAND_PKT;
    assert_eq!(decode(&packet).count(), 0);
}

#[test]
fn test_decode_single_report() {
    let packet = advertising_event(&[(
        0x01,
        [0x1A, 0x2B, 0x3C, 0x4D, 0x5E, 0x6F],
        &[0x02, 0x01, 0x06],
        0xF6,
    )]);

    let records: Vec<_> = decode(&packet).collect();
    assert_eq!(
        records,
        vec![BeaconRecord {
            address: "6F:5E:4D:3C:2B:1A".to_string(),
            address_type: AddressType::Random,
            rssi: -10,
        }]
    );
}

#[test]
fn test_decode_positive_rssi() {
    let packet = advertising_event(&[(0x00, [0; 6], &[], 0x05)]);

    let record = decode(&packet).next().unwrap();
    assert_eq!(record.rssi, 5);
    assert_eq!(record.address, "00:00:00:00:00:00");
    assert_eq!(record.address_type, AddressType::Public);
}

#[test]
fn test_decode_back_to_back_reports() {
    let packet = advertising_event(&[
        (0x00, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06], &[], 0xFE),
        (0x00, [0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F], &[], 0x0A),
    ]);

    let records: Vec<_> = decode(&packet).map(|r| (r.address, r.rssi)).collect();
    assert_eq!(
        records,
        vec![
            ("06:05:04:03:02:01".to_string(), -2),
            ("0F:0E:0D:0C:0B:0A".to_string(), 10),
        ]
    );
}

#[test]
fn test_decode_reports_with_payload() {
    let name = [0x05, 0x09, b'T', b'a', b'g', b'1'];
    let packet = advertising_event(&[
        (0x00, [0x11, 0x22, 0x33, 0x44, 0x55, 0x66], &name, 0xC3),
        (0x01, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF], &[0x02, 0x01, 0x06], 0xB0),
        (0x00, [0x01, 0x00, 0x00, 0x00, 0x00, 0x00], &[], 0x00),
    ]);

    let records: Vec<_> = decode(&packet).map(|r| (r.address, r.rssi)).collect();
    assert_eq!(
        records,
        vec![
            ("66:55:44:33:22:11".to_string(), -61),
            ("FF:EE:DD:CC:BB:AA".to_string(), -80),
            ("00:00:00:00:00:01".to_string(), 0),
        ]
    );
}

#[test]
fn test_decode_stops_at_report_count() {
    let mut packet = advertising_event(&[
        (0x00, [1, 1, 1, 1, 1, 1], &[], 0xF0),
        (0x00, [2, 2, 2, 2, 2, 2], &[], 0xF1),
    ]);
    // Announce a single report even though two follow
    packet[4] = 1;

    let records: Vec<_> = decode(&packet).collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].address, "01:01:01:01:01:01");

    packet[4] = 0;
    assert_eq!(decode(&packet).count(), 0);
}

#[test]
fn test_decode_count_beyond_buffer() {
    let mut packet = advertising_event(&[(0x00, [1, 2, 3, 4, 5, 6], &[], 0xF6)]);
    packet[4] = 200;

    let records: Vec<_> = decode(&packet).collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].rssi, -10);
}

#[test]
fn test_decode_length_beyond_buffer() {
    let mut packet = advertising_event(&[
        (0x00, [1, 2, 3, 4, 5, 6], &[], 0xF6),
        (0x00, [7, 8, 9, 10, 11, 12], &[0x01, 0x02], 0xF6),
    ]);
    // Second report claims more data than the buffer holds
    let second_start = 5 + ADV_REPORT_HEADER_SIZE + 1;
    packet[second_start + ADV_REPORT_HEADER_SIZE - 1] = 0xF0;

    let records: Vec<_> = decode(&packet).collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].address, "06:05:04:03:02:01");
}

#[test]
fn test_decode_truncated_rssi() {
    let mut packet = advertising_event(&[(0x00, [1, 2, 3, 4, 5, 6], &[0xAA], 0xF6)]);
    packet.pop();
    packet[2] -= 1;

    assert_eq!(decode(&packet).count(), 0);
}

#[test]
fn test_decode_respects_declared_length() {
    let mut packet = advertising_event(&[(0x00, [1, 2, 3, 4, 5, 6], &[], 0xF6)]);
    // Trailing bytes past the declared parameter length are ignored
    packet.extend_from_slice(&[0x00, 0x00, 9, 9, 9, 9, 9, 9, 0, 0x10]);
    packet[4] = 2;

    assert_eq!(decode(&packet).count(), 1);
}

#[test]
fn test_decode_is_fused() {
    let packet = advertising_event(&[(0x00, [1, 2, 3, 4, 5, 6], &[], 0xF6)]);

    let mut reports = decode(&packet);
    assert_eq!(reports.remaining(), 1);
    assert!(reports.next().is_some());
    assert_eq!(reports.remaining(), 0);
    assert!(reports.next().is_none());
    assert!(reports.next().is_none());
}

#[test]
fn test_hci_filter_bits() {
    let mut filter = HciFilter::default();
    filter.set_ptype(HCI_EVENT_PKT);
    filter.set_event(EVT_LE_META_EVENT);
    filter.set_event(EVT_CMD_COMPLETE);

    assert_eq!(filter.type_mask, 1 << HCI_EVENT_PKT);
    assert_eq!(filter.event_mask[0], 1 << EVT_CMD_COMPLETE);
    assert_eq!(filter.event_mask[1], 1 << (EVT_LE_META_EVENT - 32));
    assert_eq!(filter.opcode, 0);
}

#[test]
fn test_classify_receive_error() {
    let classify = |errno| classify_receive_error(io::Error::from_raw_os_error(errno));

    assert!(matches!(classify(libc::EINTR), ReceiveError::Interrupted));
    assert!(matches!(classify(libc::EAGAIN), ReceiveError::Transient));
    assert!(matches!(classify(libc::EWOULDBLOCK), ReceiveError::Transient));
    match classify(libc::EBADF) {
        ReceiveError::Fatal(e) => assert_eq!(e.raw_os_error(), Some(libc::EBADF)),
        other => panic!("expected a fatal error, got {:?}", other),
    }
    assert!(matches!(
        classify_receive_error(io::Error::new(io::ErrorKind::Other, "no errno")),
        ReceiveError::Fatal(_)
    ));
}

#[test]
fn test_command_deadline() {
    let now = Instant::now();

    assert_eq!(
        command_deadline(now, Duration::from_millis(1000)),
        now + Duration::from_millis(1000)
    );
    // Clamped to the longest poll wait instead of overflowing
    let far = command_deadline(now, Duration::from_millis(u64::MAX));
    assert_eq!(far - now, Duration::from_millis(libc::c_int::MAX as u64));
}
