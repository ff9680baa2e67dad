//! Destinations for decoded beacon records

use log::warn;
use std::io::{self, Write};

/// Receives every decoded record, in arrival order
pub trait BeaconSink {
    fn emit(&mut self, address: &str, rssi: i8);
}

impl<F> BeaconSink for F
where
    F: FnMut(&str, i8),
{
    fn emit(&mut self, address: &str, rssi: i8) {
        self(address, rssi)
    }
}

/// Writes one `"<address> <rssi>"` line per record
///
/// A failed write is logged and the scan carries on.
#[derive(Debug)]
pub struct LineSink<W: Write> {
    writer: W,
    failed_writes: usize,
}

impl<W: Write> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failed_writes: 0,
        }
    }

    /// Number of records that could not be written
    pub fn failed_writes(&self) -> usize {
        self.failed_writes
    }

    /// Flush and hand back the writer
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> BeaconSink for LineSink<W> {
    fn emit(&mut self, address: &str, rssi: i8) {
        if let Err(e) = writeln!(self.writer, "{} {}", address, rssi) {
            self.failed_writes += 1;
            warn!("failed to write record for {}: {}", address, e);
        }
    }
}

/// Keeps every record in memory
#[derive(Debug, Default, Clone)]
pub struct VecSink {
    pub records: Vec<(String, i8)>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BeaconSink for VecSink {
    fn emit(&mut self, address: &str, rssi: i8) {
        self.records.push((address.to_string(), rssi));
    }
}
