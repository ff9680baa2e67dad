//! HCI protocol constants
//!
//! This module contains constants used in the Bluetooth HCI protocol.

// HCI packet types
pub const HCI_COMMAND_PKT: u8 = 0x01;
pub const HCI_EVENT_PKT: u8 = 0x04;

// Size of the HCI event header (event code + parameter length)
pub const HCI_EVENT_HDR_SIZE: usize = 2;

// Largest event packet the controller can deliver, packet type included
pub const HCI_MAX_EVENT_SIZE: usize = 260;

// OGF (Opcode Group Field) for LE controller commands
pub const OGF_LE: u8 = 0x08;

// LE Command OCF values (OGF: 0x08)
pub const OCF_LE_SET_EVENT_MASK: u16 = 0x0001;
pub const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
pub const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

// Parameter sizes of the LE commands above
pub const LE_SET_EVENT_MASK_CP_SIZE: usize = 8;
pub const LE_SET_SCAN_PARAMETERS_CP_SIZE: usize = 7;
pub const LE_SET_SCAN_ENABLE_CP_SIZE: usize = 2;

// HCI Events
pub const EVT_CMD_COMPLETE: u8 = 0x0E;
pub const EVT_CMD_STATUS: u8 = 0x0F;
pub const EVT_LE_META_EVENT: u8 = 0x3E;

// LE Meta Events
pub const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

// Scan parameter values
pub const LE_SCAN_PASSIVE: u8 = 0x00;
pub const LE_SCAN_INTERVAL: u16 = 0x0010; // 10 ms
pub const LE_SCAN_WINDOW: u16 = 0x0010; // 10 ms
pub const LE_SCAN_FILTER_ACCEPT_ALL: u8 = 0x00;

// Socket level options for raw HCI sockets
pub const SOL_HCI: i32 = 0;
pub const HCI_FILTER: i32 = 2;
pub const HCI_FLT_TYPE_BITS: u8 = 31;
pub const HCI_FLT_EVENT_BITS: u8 = 63;

// Default per-command timeout, in milliseconds
pub const HCI_COMMAND_TIMEOUT_MS: u64 = 1000;
