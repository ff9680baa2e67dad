//! Bluetooth HCI (Host Controller Interface) implementation
//!
//! Command encoding, event decoding and the raw socket for the subset of
//! LE commands and events passive scanning needs.

pub mod command;
pub mod constants;
pub mod event;
pub mod socket;

#[cfg(test)]
mod tests;

pub use command::{
    build_event_mask_command, build_scan_enable_command, build_scan_parameters_command,
    CommandEnvelope, LeEventMask, ScanEnable, ScanParameters,
};
pub use event::{decode, AdvertisingReports, BeaconRecord, HciEvent};
pub use socket::{HciFilter, HciSocket, HCI_MAX_DEV};
