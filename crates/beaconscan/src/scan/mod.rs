//! Bluetooth LE passive scanning
//!
//! This module configures the controller for passive scanning, runs the
//! receive loop and hands every decoded advertising report to a sink.

mod cancel;
mod controller;
pub mod sink;


pub use cancel::CancelToken;
pub use controller::{scan, ScanConfig, ScanController, ScanState, ScanSummary, StopReason};
pub use sink::{BeaconSink, LineSink, VecSink};
