//! Hardware link capabilities for packet transfer.
//!
//! The framing driver never talks to a peripheral directly. It talks to one
//! of two small capability traits:
//! - [`ByteLink`] for byte-stream links (UART, USB CDC, RS-485)
//! - [`ChunkLink`] for message links carrying at most [`CHUNK_SIZE`] bytes
//!   per message, tagged with a link identifier (CAN)
//!
//! This is the lowest layer of pkttransfer. The in-memory links in
//! [`memory`] implement both traits and are used by tests, the CLI and the
//! demos.

pub mod memory;
pub mod traits;

pub use memory::{MemoryBus, MemoryBusNode, MemoryByteLink};
pub use traits::{ByteLink, Chunk, ChunkLink, LinkKind, CHUNK_SIZE};
