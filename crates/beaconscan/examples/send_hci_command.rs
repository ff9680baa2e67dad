//! Example: Sending HCI commands
//! 
//! This example demonstrates how to send the LE scan commands one by one and
//! read the raw events the controller streams back.

use beaconscan::hci::{
    build_event_mask_command, build_scan_enable_command, build_scan_parameters_command, decode,
    HciSocket,
};
use beaconscan::ReceiveError;
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Opening HCI socket for device 0...");
    let mut socket = HciSocket::open(0)?;
    socket.set_le_meta_filter()?;
    let timeout = Duration::from_secs(1);

    let status = socket.send_request(&build_scan_parameters_command(), timeout)?;
    println!("LE scan parameters set, status 0x{:02X}", status);

    let status = socket.send_request(&build_event_mask_command(), timeout)?;
    println!("LE event mask set, status 0x{:02X}", status);

    let status = socket.send_request(&build_scan_enable_command(true), timeout)?;
    println!("LE scan enabled, status 0x{:02X}", status);

    // Read events for a few seconds
    let start_time = Instant::now();
    while start_time.elapsed() < Duration::from_secs(5) {
        match socket.read_raw(Some(Duration::from_millis(100))) {
            Ok(buffer) => {
                for record in decode(&buffer) {
                    println!("{:?}", record);
                }
            }
            Err(ReceiveError::Idle) => continue,
            Err(e) => eprintln!("Error reading event: {}", e),
        }
    }

    println!("\nDisabling LE scanning...");
    let status = socket.send_request(&build_scan_enable_command(false), timeout)?;
    println!("LE scan disabled, status 0x{:02X}", status);

    Ok(())
}
