//! Error types for the beaconscan library
//!
//! This module defines the error types used throughout the library.

use thiserror::Error;

/// Errors that can occur when working with HCI sockets
#[derive(Error, Debug)]
pub enum HciError {
    #[error("Failed to open HCI socket: {0}")]
    SocketError(#[from] std::io::Error),

    #[error("Failed to bind to HCI device: {0}")]
    BindError(std::io::Error),

    #[error("Failed to install HCI filter: {0}")]
    FilterError(std::io::Error),

    #[error("Invalid HCI device name: {0}")]
    InvalidDeviceName(String),

    #[error("No Bluetooth adapter available")]
    NoDevice,
}

/// Failure of a single command round trip on the control channel
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Timed out waiting for command response")]
    Timeout,

    #[error("HCI channel is closed")]
    Closed,

    #[error("HCI I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single receive call on the control channel
#[derive(Error, Debug)]
pub enum ReceiveError {
    /// The blocked read was interrupted by a signal
    #[error("Receive interrupted")]
    Interrupted,

    /// Retryable condition such as `EAGAIN`
    #[error("Receive temporarily unavailable")]
    Transient,

    /// A bounded wait elapsed with nothing to read
    #[error("No event within the receive wait")]
    Idle,

    #[error("Failed to receive HCI event: {0}")]
    Fatal(std::io::Error),
}

/// Why a configuration command did not succeed
#[derive(Error, Debug)]
pub enum CommandFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("controller returned status 0x{0:02X}")]
    Status(u8),
}

/// Errors surfaced by the scan controller
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to set scan parameters: {0}")]
    ParametersFailed(CommandFailure),

    #[error("Failed to set event mask: {0}")]
    MaskFailed(CommandFailure),

    #[error("Failed to enable scan: {0}")]
    EnableFailed(CommandFailure),

    #[error("Failed to disable scan: {0}")]
    DisableFailed(CommandFailure),

    #[error("Failed to receive HCI event: {0}")]
    Receive(std::io::Error),

    #[error("Scan controller is {0:?}, expected {1:?}")]
    InvalidState(crate::scan::ScanState, crate::scan::ScanState),
}
