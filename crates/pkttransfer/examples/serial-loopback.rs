//! Two transfer instances talking over an in-memory UART pair.
//!
//! Run with:
//!   cargo run --example serial-loopback

use pkttransfer::driver::{PacketTransfer, TransferConfig};
use pkttransfer::link::MemoryByteLink;

const MAX_PAYLOAD: usize = 64;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (uart_a, uart_b) = MemoryByteLink::pair();

    let mut tx_a = [0u8; MAX_PAYLOAD + 2];
    let mut rx_a = [0u8; MAX_PAYLOAD + 2];
    let mut tx_b = [0u8; MAX_PAYLOAD + 2];
    let mut rx_b = [0u8; MAX_PAYLOAD + 2];

    let mut node_a = PacketTransfer::serial(
        uart_a,
        |payload: &[u8]| println!("A got {:?}", String::from_utf8_lossy(payload)),
        TransferConfig::new(MAX_PAYLOAD, &mut tx_a, &mut rx_a)?,
    );
    let mut node_b = PacketTransfer::serial(
        uart_b,
        |payload: &[u8]| println!("B got {:?}", String::from_utf8_lossy(payload)),
        TransferConfig::new(MAX_PAYLOAD, &mut tx_b, &mut rx_b)?,
    );

    node_a.send(b"ping from A")?;
    node_b.send(&[0x7E, 0x7D, 0x00])?;

    // The main loop: poll both nodes until neither has anything left to move.
    let mut polls = 0;
    loop {
        let a = node_a.task()?;
        let b = node_b.task()?;
        polls += 1;
        if a.is_idle() && b.is_idle() {
            break;
        }
    }

    println!("done after {polls} polls");
    println!("A: {:?}", node_a.stats());
    println!("B: {:?}", node_b.stats());
    Ok(())
}
