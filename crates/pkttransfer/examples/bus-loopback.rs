//! Two transfer instances on a shared in-memory CAN-style bus.
//!
//! Frames travel in chunks of up to eight bytes; each node only accepts
//! chunks carrying its receive identifier.
//!
//! Run with:
//!   cargo run --example bus-loopback

use pkttransfer::driver::{LinkIds, PacketTransfer, TransferConfig};
use pkttransfer::link::MemoryBus;

const MAX_PAYLOAD: usize = 32;
const ID_A_TO_B: u32 = 0x101;
const ID_B_TO_A: u32 = 0x102;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bus = MemoryBus::new();

    let mut tx_a = [0u8; MAX_PAYLOAD + 2];
    let mut rx_a = [0u8; MAX_PAYLOAD + 2];
    let mut tx_b = [0u8; MAX_PAYLOAD + 2];
    let mut rx_b = [0u8; MAX_PAYLOAD + 2];

    let mut replies = Vec::new();
    let mut node_a = PacketTransfer::bus(
        bus.node(),
        LinkIds::new(ID_A_TO_B, ID_B_TO_A),
        |payload: &[u8]| replies.push(payload.to_vec()),
        TransferConfig::new(MAX_PAYLOAD, &mut tx_a, &mut rx_a)?,
    );
    let mut node_b = PacketTransfer::bus(
        bus.node(),
        LinkIds::new(ID_B_TO_A, ID_A_TO_B),
        |payload: &[u8]| println!("B got {} bytes: {payload:02X?}", payload.len()),
        TransferConfig::new(MAX_PAYLOAD, &mut tx_b, &mut rx_b)?,
    );

    node_a.send(b"status?")?;
    node_b.send(b"status: ok")?;

    for _ in 0..64 {
        let a = node_a.task()?;
        let b = node_b.task()?;
        if a.is_idle() && b.is_idle() {
            break;
        }
    }

    println!("A: {:?}", node_a.state());
    println!("B: {:?}", node_b.stats());
    for reply in &replies {
        println!("A got {:?}", String::from_utf8_lossy(reply));
    }
    Ok(())
}
