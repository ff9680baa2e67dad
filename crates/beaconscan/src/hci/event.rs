//! HCI event parsing
//!
//! [`decode`] turns one raw buffer read from the HCI socket into the beacon
//! records it carries. Malformed input never fails: it simply yields fewer
//! (or no) records.

use crate::gap::{AddressType, BdAddr, BD_ADDR_LEN};
use crate::hci::constants::*;
use std::iter::FusedIterator;

/// Packet type indicator plus the event header
pub const MIN_EVENT_LEN: usize = 1 + HCI_EVENT_HDR_SIZE;

/// Event type, address type, address and data length
pub const ADV_REPORT_HEADER_SIZE: usize = 2 + BD_ADDR_LEN + 1;

const PARAM_LEN_OFFSET: usize = 2;
const SUBEVENT_OFFSET: usize = MIN_EVENT_LEN;
const REPORT_COUNT_OFFSET: usize = SUBEVENT_OFFSET + 1;
const FIRST_REPORT_OFFSET: usize = REPORT_COUNT_OFFSET + 1;

/// HCI Event packet, without the packet type indicator
#[derive(Debug, Clone)]
pub struct HciEvent {
    pub event_code: u8,
    pub parameter_total_length: u8,
    pub parameters: Vec<u8>,
}

impl HciEvent {
    /// Parse an HCI event from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HCI_EVENT_HDR_SIZE {
            return None;
        }

        let event_code = data[0];
        let parameter_total_length = data[1];

        let parameters = data
            .get(HCI_EVENT_HDR_SIZE..HCI_EVENT_HDR_SIZE + parameter_total_length as usize)?
            .to_vec();

        Some(HciEvent {
            event_code,
            parameter_total_length,
            parameters,
        })
    }

    /// Opcode this event answers, for Command Complete and Command Status
    pub fn command_opcode(&self) -> Option<u16> {
        let bytes = match self.event_code {
            EVT_CMD_COMPLETE => self.parameters.get(1..3)?,
            EVT_CMD_STATUS => self.parameters.get(2..4)?,
            _ => return None,
        };
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Status byte of a Command Complete or Command Status event
    pub fn command_status(&self) -> Option<u8> {
        match self.event_code {
            EVT_CMD_COMPLETE => self.parameters.get(3).copied(),
            EVT_CMD_STATUS => self.parameters.first().copied(),
            _ => None,
        }
    }
}

/// One decoded advertising report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconRecord {
    /// `XX:XX:XX:XX:XX:XX`, most significant byte first
    pub address: String,
    pub address_type: AddressType,
    pub rssi: i8,
}

/// Decode the advertising reports carried by a raw event buffer
///
/// The buffer starts with the packet type indicator, as read from a raw HCI
/// socket. Anything that is not an LE Advertising Report meta event yields
/// an empty iterator.
pub fn decode(raw: &[u8]) -> AdvertisingReports<'_> {
    match report_count(raw) {
        Some((buf, count)) => AdvertisingReports {
            buf,
            offset: FIRST_REPORT_OFFSET,
            remaining: count,
        },
        None => AdvertisingReports {
            buf: &[],
            offset: FIRST_REPORT_OFFSET,
            remaining: 0,
        },
    }
}

/// Validate framing and return the event bytes plus the report count
fn report_count(raw: &[u8]) -> Option<(&[u8], u8)> {
    if raw.len() < MIN_EVENT_LEN {
        return None;
    }
    if raw[0] != HCI_EVENT_PKT || raw[1] != EVT_LE_META_EVENT {
        return None;
    }

    // Never look past what the event header declares
    let declared = MIN_EVENT_LEN + raw[PARAM_LEN_OFFSET] as usize;
    let buf = &raw[..declared.min(raw.len())];

    if *buf.get(SUBEVENT_OFFSET)? != EVT_LE_ADVERTISING_REPORT {
        return None;
    }
    let count = *buf.get(REPORT_COUNT_OFFSET)?;

    Some((buf, count))
}

/// Iterator over the reports of one LE Advertising Report event
#[derive(Debug, Clone)]
pub struct AdvertisingReports<'a> {
    buf: &'a [u8],
    offset: usize,
    remaining: u8,
}

impl<'a> AdvertisingReports<'a> {
    /// Reports still announced by the count byte
    pub fn remaining(&self) -> usize {
        self.remaining as usize
    }

    fn read_report(&self) -> Option<(BeaconRecord, usize)> {
        let start = self.offset;
        let header = self.buf.get(start..start + ADV_REPORT_HEADER_SIZE)?;

        let address_type = AddressType::from(header[1]);
        let address = BdAddr::from_slice(&header[2..2 + BD_ADDR_LEN])?;
        let data_length = header[ADV_REPORT_HEADER_SIZE - 1] as usize;

        // RSSI sits right after the advertising data
        let rssi_offset = start + ADV_REPORT_HEADER_SIZE + data_length;
        let rssi = *self.buf.get(rssi_offset)? as i8;

        let record = BeaconRecord {
            address: address.to_string(),
            address_type,
            rssi,
        };
        Some((record, rssi_offset + 1))
    }
}

impl<'a> Iterator for AdvertisingReports<'a> {
    type Item = BeaconRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        match self.read_report() {
            Some((record, next)) => {
                self.remaining -= 1;
                self.offset = next;
                Some(record)
            }
            None => {
                // Truncated report: nothing after it can be trusted either
                self.remaining = 0;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}

impl<'a> FusedIterator for AdvertisingReports<'a> {}
