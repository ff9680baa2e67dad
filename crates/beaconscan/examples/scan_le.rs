//! Example: Scanning for BLE beacons
//! 
//! This example demonstrates how to scan for BLE beacons using the beaconscan library.
//! 
//! Note: This example requires root privileges to run, as opening raw HCI sockets
//! requires elevated permissions.

use beaconscan::{scan, CancelToken, HciSocket, ScanConfig};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Opening HCI socket for device 0...");
    let mut socket = HciSocket::open(0)?;
    socket.set_le_meta_filter()?;

    println!("Scanning for 10 seconds...");
    let config = ScanConfig::default().with_deadline(Duration::from_secs(10));
    let mut print = |address: &str, rssi: i8| println!("{} {}", address, rssi);

    let summary = scan(&mut socket, config, CancelToken::new(), &mut print)?;

    println!("Scan complete! {} advertisements", summary.records);
    Ok(())
}
