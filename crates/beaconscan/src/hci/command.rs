//! LE controller commands used to set up passive scanning
//!
//! Every command is built as a [`CommandEnvelope`]: the opcode parts, the
//! fixed-layout parameter block and the size of the expected response.

use crate::hci::constants::*;
use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Size of the response every LE configuration command returns (the status)
pub const COMMAND_RESPONSE_LEN: usize = 1;

/// A command request ready to be sent to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEnvelope {
    ogf: u8,
    ocf: u16,
    params: Vec<u8>,
    response_len: usize,
}

impl CommandEnvelope {
    fn le(ocf: u16, params: Vec<u8>) -> Self {
        Self {
            ogf: OGF_LE,
            ocf,
            params,
            response_len: COMMAND_RESPONSE_LEN,
        }
    }

    pub fn ogf(&self) -> u8 {
        self.ogf
    }

    pub fn ocf(&self) -> u16 {
        self.ocf
    }

    /// The packed 16-bit opcode, `ogf << 10 | ocf`
    pub fn opcode(&self) -> u16 {
        ((self.ogf as u16) << 10) | (self.ocf & 0x3ff)
    }

    pub fn params(&self) -> &[u8] {
        &self.params
    }

    /// Number of response bytes the caller waits for
    pub fn response_len(&self) -> usize {
        self.response_len
    }

    /// Convert the command to a raw HCI packet
    pub fn to_packet(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(4 + self.params.len());
        packet.push(HCI_COMMAND_PKT);
        packet.extend_from_slice(&self.opcode().to_le_bytes());
        packet.push(self.params.len() as u8);
        packet.extend_from_slice(&self.params);
        packet
    }
}

/// Parameters of LE Set Scan Parameters
///
/// Interval and window are in units of 0.625 ms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanParameters {
    pub scan_type: u8,
    pub interval: u16,
    pub window: u16,
    pub own_address_type: u8,
    pub filter_policy: u8,
}

impl ScanParameters {
    /// Serialize to the 7 byte wire layout
    pub fn to_bytes(&self) -> [u8; LE_SET_SCAN_PARAMETERS_CP_SIZE] {
        let mut result = [0u8; LE_SET_SCAN_PARAMETERS_CP_SIZE];
        let mut cursor = Cursor::new(&mut result[..]);

        // The buffer is exactly the size of the fields, so these cannot fail
        cursor.write_u8(self.scan_type).unwrap();
        cursor.write_u16::<LittleEndian>(self.interval).unwrap();
        cursor.write_u16::<LittleEndian>(self.window).unwrap();
        cursor.write_u8(self.own_address_type).unwrap();
        cursor.write_u8(self.filter_policy).unwrap();

        result
    }

    /// Parse the 7 byte wire layout
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() != LE_SET_SCAN_PARAMETERS_CP_SIZE {
            return None;
        }

        let mut cursor = Cursor::new(data);
        Some(Self {
            scan_type: cursor.read_u8().ok()?,
            interval: cursor.read_u16::<LittleEndian>().ok()?,
            window: cursor.read_u16::<LittleEndian>().ok()?,
            own_address_type: cursor.read_u8().ok()?,
            filter_policy: cursor.read_u8().ok()?,
        })
    }
}

bitflags! {
    /// LE Set Event Mask bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LeEventMask: u64 {
        const CONNECTION_COMPLETE = 1 << 0;
        const ADVERTISING_REPORT = 1 << 1;
        const CONNECTION_UPDATE_COMPLETE = 1 << 2;
        const READ_REMOTE_FEATURES_COMPLETE = 1 << 3;
        const LONG_TERM_KEY_REQUEST = 1 << 4;
    }
}

impl LeEventMask {
    /// Every bit set, including ones this crate has no name for
    pub fn everything() -> Self {
        Self::from_bits_retain(u64::MAX)
    }
}

/// Parameters of LE Set Scan Enable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanEnable {
    pub enable: u8,
    pub filter_duplicates: u8,
}

impl ScanEnable {
    pub fn to_bytes(&self) -> [u8; LE_SET_SCAN_ENABLE_CP_SIZE] {
        [self.enable, self.filter_duplicates]
    }
}

/// Passive scan, 10 ms interval and window, public address, accept all
pub fn build_scan_parameters_command() -> CommandEnvelope {
    let mut cp = ScanParameters::default();
    cp.scan_type = LE_SCAN_PASSIVE;
    cp.interval = LE_SCAN_INTERVAL;
    cp.window = LE_SCAN_WINDOW;
    cp.own_address_type = crate::gap::PUBLIC_DEVICE_ADDRESS;
    cp.filter_policy = LE_SCAN_FILTER_ACCEPT_ALL;

    CommandEnvelope::le(OCF_LE_SET_SCAN_PARAMETERS, cp.to_bytes().to_vec())
}

/// Unmask every LE meta sub-event
pub fn build_event_mask_command() -> CommandEnvelope {
    let mut params = [0u8; LE_SET_EVENT_MASK_CP_SIZE];
    LittleEndian::write_u64(&mut params, LeEventMask::everything().bits());

    CommandEnvelope::le(OCF_LE_SET_EVENT_MASK, params.to_vec())
}

/// Turn scanning on or off; duplicate filtering is always disabled
pub fn build_scan_enable_command(enable: bool) -> CommandEnvelope {
    let mut cp = ScanEnable::default();
    cp.enable = enable as u8;
    cp.filter_duplicates = 0x00;

    CommandEnvelope::le(OCF_LE_SET_SCAN_ENABLE, cp.to_bytes().to_vec())
}
