//! Framed, CRC-checked packet transfer over serial and bus links.
//!
//! Payloads are wrapped in `0x7E` delimiters with `0x7D` byte stuffing and a
//! CRC-16/X-25 trailer, then moved one hardware unit per poll so the driver
//! fits a bare-metal main loop.
//!
//! # Crate Structure
//!
//! - [`link`]: hardware capability traits and in-memory links
//! - [`frame`]: CRC, stuffing state machines and whole-frame helpers
//! - [`driver`]: the polling [`PacketTransfer`](driver::PacketTransfer) instance

/// Re-export link types.
pub mod link {
    pub use pkttransfer_link::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pkttransfer_frame::*;
}

/// Re-export driver types.
pub mod driver {
    pub use pkttransfer_driver::*;
}
