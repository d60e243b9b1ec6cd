//! Polling packet transfer over serial and bus links.
//!
//! A [`PacketTransfer`] owns one link, one delivery callback and two
//! caller-provided scratch buffers. The application queues a payload with
//! [`send`](PacketTransfer::send) and calls [`task`](PacketTransfer::task)
//! from its main loop; each call moves at most one hardware unit in each
//! direction and never blocks or allocates.

pub mod config;
pub mod error;
pub mod port;
pub mod selftest;
pub mod state;
pub mod transfer;

pub use config::{TransferConfig, TransferLimits};
pub use error::{ConfigError, Result, TransferError, TxOverflow};
pub use port::{BusPort, LinkIds, Port, SerialPort, TxProgress};
pub use selftest::{run_check, self_test, SelfTestCheck, SelfTestError};
pub use state::{TransferState, TransferStats};
pub use transfer::{BusTransfer, Delivery, PacketTransfer, SerialTransfer, TaskOutcome};
