use super::cancel::CancelToken;
use super::sink::BeaconSink;
use crate::error::{CommandFailure, ReceiveError, ScanError};
use crate::hci::constants::HCI_COMMAND_TIMEOUT_MS;
use crate::hci::{
    build_event_mask_command, build_scan_enable_command, build_scan_parameters_command, decode,
    CommandEnvelope,
};
use crate::transport::HciTransport;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// Default bounded wait of a single receive call
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(500);

/// Lifecycle of a [`ScanController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Configuring,
    Scanning,
    Stopping,
}

/// Scan settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Upper bound of one configuration command round trip
    pub command_timeout: Duration,
    /// Stop once this much time has passed since `run` began
    pub deadline: Option<Duration>,
    /// Stop after emitting this many records
    pub limit: Option<usize>,
    /// Bounded wait for each receive call. `None` blocks until data
    /// arrives, so a deadline only fires once some traffic is seen.
    pub idle_poll: Option<Duration>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(HCI_COMMAND_TIMEOUT_MS),
            deadline: None,
            limit: None,
            idle_poll: Some(DEFAULT_IDLE_POLL),
        }
    }
}

impl ScanConfig {
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_idle_poll(mut self, idle_poll: Option<Duration>) -> Self {
        self.idle_poll = idle_poll;
        self
    }
}

/// Why the receive loop ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    DeadlineElapsed,
    LimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Records handed to the sink
    pub records: usize,
    pub reason: StopReason,
}

/// Drives a control channel through configure, scan and teardown
#[derive(Debug)]
pub struct ScanController {
    config: ScanConfig,
    cancel: CancelToken,
    state: ScanState,
}

impl ScanController {
    pub fn new(config: ScanConfig, cancel: CancelToken) -> Self {
        Self {
            config,
            cancel,
            state: ScanState::Idle,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn expect_state(&self, expected: ScanState) -> Result<(), ScanError> {
        if self.state != expected {
            return Err(ScanError::InvalidState(self.state, expected));
        }
        Ok(())
    }

    fn transition(&mut self, next: ScanState) {
        debug!("scan state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn command<T: HciTransport>(
        &self,
        channel: &mut T,
        command: &CommandEnvelope,
    ) -> Result<(), CommandFailure> {
        match channel.send(command, self.config.command_timeout)? {
            0 => Ok(()),
            status => Err(CommandFailure::Status(status)),
        }
    }

    /// Configure the controller and enable scanning
    ///
    /// Sends scan parameters, the LE event mask and scan enable, in that
    /// order. The first failure aborts the sequence and nothing after it is
    /// sent.
    pub fn start<T: HciTransport>(&mut self, channel: &mut T) -> Result<(), ScanError> {
        self.expect_state(ScanState::Idle)?;
        self.transition(ScanState::Configuring);

        let result = self
            .command(channel, &build_scan_parameters_command())
            .map_err(ScanError::ParametersFailed)
            .and_then(|()| {
                self.command(channel, &build_event_mask_command())
                    .map_err(ScanError::MaskFailed)
            })
            .and_then(|()| {
                self.command(channel, &build_scan_enable_command(true))
                    .map_err(ScanError::EnableFailed)
            });

        match result {
            Ok(()) => {
                info!("scanning enabled");
                self.transition(ScanState::Scanning);
                Ok(())
            }
            Err(e) => {
                self.transition(ScanState::Idle);
                Err(e)
            }
        }
    }

    /// Receive, decode and emit until a stop condition fires
    ///
    /// The cancel token is checked after every receive, the deadline after
    /// every receive and after every emitted record. Transient and idle
    /// receives keep the loop going; any other receive error ends it.
    pub fn run<T, S>(&mut self, channel: &mut T, sink: &mut S) -> Result<ScanSummary, ScanError>
    where
        T: HciTransport,
        S: BeaconSink + ?Sized,
    {
        self.expect_state(ScanState::Scanning)?;

        // A deadline past what `Instant` can represent never elapses
        let ends_at = self
            .config
            .deadline
            .and_then(|deadline| Instant::now().checked_add(deadline));
        let elapsed = || ends_at.is_some_and(|at| Instant::now() >= at);
        let mut records = 0usize;

        let stop = |reason: StopReason, records: usize| -> Result<ScanSummary, ScanError> {
            info!("scan stopped: {:?} after {} records", reason, records);
            Ok(ScanSummary { records, reason })
        };

        if self.config.limit == Some(0) {
            return stop(StopReason::LimitReached, records);
        }

        loop {
            let received = channel.receive(self.config.idle_poll);

            if self.cancel.is_cancelled() {
                return stop(StopReason::Cancelled, records);
            }

            match received {
                Ok(buffer) => {
                    for record in decode(&buffer) {
                        sink.emit(&record.address, record.rssi);
                        records += 1;

                        if self.config.limit.is_some_and(|limit| records >= limit) {
                            return stop(StopReason::LimitReached, records);
                        }
                        if elapsed() {
                            return stop(StopReason::DeadlineElapsed, records);
                        }
                    }
                }
                Err(ReceiveError::Interrupted | ReceiveError::Transient | ReceiveError::Idle) => {}
                Err(ReceiveError::Fatal(e)) => {
                    warn!("receive failed after {} records: {}", records, e);
                    return Err(ScanError::Receive(e));
                }
            }

            if elapsed() {
                return stop(StopReason::DeadlineElapsed, records);
            }
        }
    }

    /// Disable scanning
    ///
    /// Sends the disable command exactly once. A failure is reported but the
    /// controller is back to `Idle` either way.
    pub fn stop<T: HciTransport>(&mut self, channel: &mut T) -> Result<(), ScanError> {
        self.expect_state(ScanState::Scanning)?;
        self.transition(ScanState::Stopping);

        let result = self
            .command(channel, &build_scan_enable_command(false))
            .map_err(ScanError::DisableFailed);

        self.transition(ScanState::Idle);
        if result.is_ok() {
            info!("scanning disabled");
        }
        result
    }
}

/// Configure, scan and always tear down
///
/// When `start` fails nothing is disabled, since scanning never began.
/// Otherwise `stop` runs exactly once however `run` ended. An error from
/// `run` takes precedence over one from `stop`.
pub fn scan<T, S>(
    channel: &mut T,
    config: ScanConfig,
    cancel: CancelToken,
    sink: &mut S,
) -> Result<ScanSummary, ScanError>
where
    T: HciTransport,
    S: BeaconSink + ?Sized,
{
    let mut controller = ScanController::new(config, cancel);
    controller.start(channel)?;

    let outcome = controller.run(channel, sink);
    let stopped = controller.stop(channel);

    match (outcome, stopped) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(stop_err)) => {
            warn!("{}", stop_err);
            Err(e)
        }
    }
}
