//! beaconscan - passive Bluetooth LE beacon scanning over raw HCI
//!
//! This library configures a Bluetooth controller for passive LE scanning
//! through a raw HCI socket, decodes the LE Advertising Report events it
//! streams back and hands each observed address and RSSI to a sink.

pub mod error;
pub mod gap;
pub mod hci;
pub mod scan;
pub mod transport;

// Re-export common types for convenience
pub use error::{CommandFailure, HciError, ReceiveError, ScanError, TransportError};
pub use gap::{AddressType, BdAddr};
pub use hci::{decode, BeaconRecord, CommandEnvelope, HciSocket};
pub use scan::{
    scan, BeaconSink, CancelToken, LineSink, ScanConfig, ScanController, ScanState, ScanSummary,
    StopReason, VecSink,
};
pub use transport::HciTransport;
