//! HCI Socket implementation for Bluetooth communication
//!
//! This module provides a wrapper around the raw HCI socket interface,
//! allowing for communication with Bluetooth controllers.

use crate::error::{HciError, ReceiveError, TransportError};
use crate::hci::command::CommandEnvelope;
use crate::hci::constants::*;
use crate::hci::event::HciEvent;
use crate::transport::HciTransport;
use log::{debug, trace, warn};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

// Bluetooth socket constants
const AF_BLUETOOTH: i32 = 31;
const BTPROTO_HCI: i32 = 1;
const HCI_CHANNEL_RAW: i32 = 0;

/// Adapter indices tried when no device is named
pub const HCI_MAX_DEV: u16 = 16;

/// Longest single wait `poll` accepts
const MAX_WAIT: Duration = Duration::from_millis(libc::c_int::MAX as u64);

/// Represents an HCI socket
#[derive(Debug)]
pub struct HciSocket {
    fd: RawFd,
    dev_id: u16,
}

// Define the sockaddr_hci structure
#[repr(C)]
struct SockaddrHci {
    hci_family: libc::sa_family_t,
    hci_dev: u16,
    hci_channel: u16,
}

/// Kernel side packet filter of a raw HCI socket (`struct hci_filter`)
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HciFilter {
    pub type_mask: u32,
    pub event_mask: [u32; 2],
    pub opcode: u16,
}

impl HciFilter {
    /// Let packets of the given type through
    pub fn set_ptype(&mut self, packet_type: u8) {
        let nr = packet_type & HCI_FLT_TYPE_BITS;
        self.type_mask |= 1 << nr;
    }

    /// Let events with the given event code through
    pub fn set_event(&mut self, event_code: u8) {
        let nr = (event_code & HCI_FLT_EVENT_BITS) as usize;
        self.event_mask[nr >> 5] |= 1 << (nr & 31);
    }

    /// Only pass Command Complete / Command Status for this opcode
    pub fn set_opcode(&mut self, opcode: u16) {
        self.opcode = opcode.to_le();
    }
}

impl HciSocket {
    /// Gets the raw file descriptor for the socket
    pub fn as_raw_fd(&self) -> RawFd {
        self.fd
    }

    /// Index of the adapter this socket is bound to
    pub fn dev_id(&self) -> u16 {
        self.dev_id
    }

    pub fn is_open(&self) -> bool {
        self.fd >= 0
    }

    /// Opens a new HCI socket
    ///
    /// # Arguments
    ///
    /// * `dev_id` - The device ID to open (0 for the first device)
    ///
    /// # Returns
    ///
    /// A new `HciSocket` instance or an error if the socket could not be opened
    pub fn open(dev_id: u16) -> Result<Self, HciError> {
        // Open a raw HCI socket
        let fd = unsafe {
            libc::socket(
                AF_BLUETOOTH,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                BTPROTO_HCI,
            )
        };

        if fd < 0 {
            return Err(HciError::SocketError(io::Error::last_os_error()));
        }

        // Bind to the specified device
        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as libc::sa_family_t,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_RAW as u16,
        };

        let result = unsafe {
            libc::bind(
                fd,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrHci>() as libc::socklen_t,
            )
        };

        if result < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(HciError::BindError(err));
        }

        debug!("opened HCI socket for hci{}", dev_id);
        Ok(HciSocket { fd, dev_id })
    }

    /// Opens the lowest-numbered adapter present
    ///
    /// Indices whose bind fails with `ENODEV` are skipped; any other failure
    /// is returned as is.
    pub fn open_first() -> Result<Self, HciError> {
        for dev_id in 0..HCI_MAX_DEV {
            match Self::open(dev_id) {
                Ok(socket) => return Ok(socket),
                Err(HciError::BindError(e)) if e.raw_os_error() == Some(libc::ENODEV) => {
                    trace!("no adapter hci{}", dev_id);
                }
                Err(e) => return Err(e),
            }
        }
        Err(HciError::NoDevice)
    }

    /// Opens the adapter named `hciN`
    pub fn open_named(name: &str) -> Result<Self, HciError> {
        Self::open(parse_device_name(name)?)
    }

    /// Restrict the socket to LE Meta events
    pub fn set_le_meta_filter(&self) -> Result<(), HciError> {
        let mut filter = HciFilter::default();
        filter.set_ptype(HCI_EVENT_PKT);
        filter.set_event(EVT_LE_META_EVENT);

        self.set_filter(&filter).map_err(HciError::FilterError)
    }

    pub fn get_filter(&self) -> io::Result<HciFilter> {
        let mut filter = HciFilter::default();
        let mut len = std::mem::size_of::<HciFilter>() as libc::socklen_t;

        let result = unsafe {
            libc::getsockopt(
                self.fd,
                SOL_HCI,
                HCI_FILTER,
                &mut filter as *mut _ as *mut libc::c_void,
                &mut len,
            )
        };

        if result < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(filter)
    }

    pub fn set_filter(&self, filter: &HciFilter) -> io::Result<()> {
        let result = unsafe {
            libc::setsockopt(
                self.fd,
                SOL_HCI,
                HCI_FILTER,
                filter as *const _ as *const libc::c_void,
                std::mem::size_of::<HciFilter>() as libc::socklen_t,
            )
        };

        if result < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Wait until the socket is readable; `Ok(false)` when `timeout` elapsed
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.min(MAX_WAIT).as_millis() as libc::c_int;

        let result = unsafe { libc::poll(&mut pfd, 1, millis) };
        if result < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(result > 0)
    }

    fn read_into(&self, buffer: &mut [u8]) -> io::Result<usize> {
        let bytes_read = unsafe {
            libc::read(
                self.fd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
            )
        };

        if bytes_read < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(bytes_read as usize)
    }

    /// Sends a command and waits for the controller's status
    ///
    /// The socket filter is narrowed to the command's completion events for
    /// the duration of the exchange and restored afterwards.
    pub fn send_request(
        &mut self,
        command: &CommandEnvelope,
        timeout: Duration,
    ) -> Result<u8, TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }

        let saved = self.get_filter()?;

        let mut filter = HciFilter::default();
        filter.set_ptype(HCI_EVENT_PKT);
        filter.set_event(EVT_CMD_COMPLETE);
        filter.set_event(EVT_CMD_STATUS);
        filter.set_opcode(command.opcode());
        self.set_filter(&filter)?;

        let result = self.exchange(command, timeout);

        if let Err(e) = self.set_filter(&saved) {
            warn!("failed to restore HCI filter: {}", e);
        }
        result
    }

    fn exchange(&self, command: &CommandEnvelope, timeout: Duration) -> Result<u8, TransportError> {
        let packet = command.to_packet();
        debug!(
            "sending command opcode 0x{:04X} ({} parameter bytes)",
            command.opcode(),
            command.params().len()
        );

        let written = unsafe {
            libc::write(
                self.fd,
                packet.as_ptr() as *const libc::c_void,
                packet.len(),
            )
        };
        if written < 0 {
            return Err(TransportError::Io(io::Error::last_os_error()));
        }

        let deadline = command_deadline(Instant::now(), timeout);
        let mut buffer = [0u8; HCI_MAX_EVENT_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout);
            }

            match self.wait_readable(remaining) {
                Ok(true) => {}
                Ok(false) => return Err(TransportError::Timeout),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Io(e)),
            }

            let len = match self.read_into(&mut buffer) {
                Ok(len) => len,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(TransportError::Io(e)),
            };

            if len < 1 || buffer[0] != HCI_EVENT_PKT {
                continue;
            }
            let Some(event) = HciEvent::parse(&buffer[1..len]) else {
                continue;
            };
            if event.command_opcode() != Some(command.opcode()) {
                continue;
            }
            if let Some(status) = event.command_status() {
                return Ok(status);
            }
        }
    }

    /// Read one raw packet, packet type indicator included
    pub fn read_raw(&self, wait: Option<Duration>) -> Result<Vec<u8>, ReceiveError> {
        if !self.is_open() {
            return Err(ReceiveError::Fatal(io::Error::new(
                io::ErrorKind::NotConnected,
                "HCI socket is closed",
            )));
        }

        if let Some(wait) = wait {
            match self.wait_readable(wait) {
                Ok(true) => {}
                Ok(false) => return Err(ReceiveError::Idle),
                Err(e) => return Err(classify_receive_error(e)),
            }
        }

        let mut buffer = [0u8; HCI_MAX_EVENT_SIZE];
        let len = self.read_into(&mut buffer).map_err(classify_receive_error)?;

        trace!("received {}", hex::encode(&buffer[..len]));
        Ok(buffer[..len].to_vec())
    }

    /// Close the socket. Safe to call more than once.
    pub fn close(&mut self) {
        if self.fd >= 0 {
            unsafe {
                libc::close(self.fd);
            }
            debug!("closed HCI socket for hci{}", self.dev_id);
            self.fd = -1;
        }
    }
}

/// When a command round trip started at `now` gives up
///
/// Timeouts longer than a single `poll` can wait are clamped to it.
pub(crate) fn command_deadline(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout.min(MAX_WAIT)).unwrap_or(now)
}

pub(crate) fn classify_receive_error(err: io::Error) -> ReceiveError {
    match err.raw_os_error() {
        Some(libc::EINTR) => ReceiveError::Interrupted,
        Some(code) if code == libc::EAGAIN || code == libc::EWOULDBLOCK => ReceiveError::Transient,
        _ => ReceiveError::Fatal(err),
    }
}

/// Parse an adapter name such as `hci0` into its index
pub fn parse_device_name(name: &str) -> Result<u16, HciError> {
    name.strip_prefix("hci")
        .and_then(|index| index.parse::<u16>().ok())
        .ok_or_else(|| HciError::InvalidDeviceName(name.to_string()))
}

impl HciTransport for HciSocket {
    fn send(&mut self, command: &CommandEnvelope, timeout: Duration) -> Result<u8, TransportError> {
        let result = self.send_request(command, timeout);
        if let Err(e) = &result {
            if !matches!(e, TransportError::Closed) {
                debug!("command 0x{:04X} failed ({}), closing socket", command.opcode(), e);
            }
            self.close();
        }
        result
    }

    fn receive(&mut self, wait: Option<Duration>) -> Result<Vec<u8>, ReceiveError> {
        self.read_raw(wait)
    }

    fn close(&mut self) {
        HciSocket::close(self)
    }
}

impl AsRawFd for HciSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for HciSocket {
    fn drop(&mut self) {
        self.close();
    }
}

