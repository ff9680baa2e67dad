//! The duplex control channel the scan controller drives
//!
//! [`HciSocket`](crate::hci::HciSocket) is the Linux implementation; tests
//! provide scripted ones.

use crate::error::{ReceiveError, TransportError};
use crate::hci::CommandEnvelope;
use std::time::Duration;

pub trait HciTransport {
    /// Send a command and wait up to `timeout` for its status byte
    fn send(&mut self, command: &CommandEnvelope, timeout: Duration) -> Result<u8, TransportError>;

    /// Receive one raw event buffer
    ///
    /// With `wait` set the call returns [`ReceiveError::Idle`] once it has
    /// waited that long without data; with `None` it blocks until data or
    /// an error arrives.
    fn receive(&mut self, wait: Option<Duration>) -> Result<Vec<u8>, ReceiveError>;

    /// Release the channel. Calling it again is a no-op.
    fn close(&mut self);
}

impl<T: HciTransport + ?Sized> HciTransport for &mut T {
    fn send(&mut self, command: &CommandEnvelope, timeout: Duration) -> Result<u8, TransportError> {
        (**self).send(command, timeout)
    }

    fn receive(&mut self, wait: Option<Duration>) -> Result<Vec<u8>, ReceiveError> {
        (**self).receive(wait)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
