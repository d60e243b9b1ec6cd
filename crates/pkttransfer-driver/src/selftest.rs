//! Built-in checks runnable on the target or from the CLI `doctor` command.

use std::fmt;

use pkttransfer_frame::{crc16, encoded_len};
use pkttransfer_link::{MemoryBus, MemoryByteLink};
use tracing::debug;

use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::port::LinkIds;
use crate::transfer::PacketTransfer;

const CRC_VECTOR: &[u8] = b"123456789";
const CRC_EXPECTED: u16 = 0x906E;

const PATTERN: [u8; 12] = [
    0x7E, 0x7D, 0x00, 0xFF, 0x5E, 0x5D, 0x7D, 0x7E, 0x01, 0x02, 0x7E, 0x03,
];
const PATTERN_MAX: usize = PATTERN.len();

const BUS_TX_ID: u32 = 0x7E1;
const BUS_RX_ID: u32 = 0x7E2;

/// One built-in check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelfTestCheck {
    /// CRC of `"123456789"` equals `0x906E`.
    CrcVector,
    /// A stuffed frame survives a looped-back byte link.
    SerialLoopback,
    /// A stuffed frame survives a two-node chunked bus.
    BusLoopback,
}

impl SelfTestCheck {
    pub const ALL: [SelfTestCheck; 3] = [
        SelfTestCheck::CrcVector,
        SelfTestCheck::SerialLoopback,
        SelfTestCheck::BusLoopback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SelfTestCheck::CrcVector => "crc-vector",
            SelfTestCheck::SerialLoopback => "serial-loopback",
            SelfTestCheck::BusLoopback => "bus-loopback",
        }
    }
}

impl fmt::Display for SelfTestCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed built-in check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelfTestError {
    #[error("CRC reference vector mismatch: got {got:#06x}, expected {expected:#06x}")]
    CrcVector { got: u16, expected: u16 },

    #[error("{check}: frame not delivered within {steps} task calls")]
    NotDelivered { check: SelfTestCheck, steps: usize },

    #[error("{check}: delivered payload differs from the one sent")]
    PayloadMismatch { check: SelfTestCheck },

    #[error("{check}: {source}")]
    Transfer {
        check: SelfTestCheck,
        #[source]
        source: TransferError,
    },
}

/// Run every check, stopping at the first failure.
pub fn self_test() -> Result<(), SelfTestError> {
    for check in SelfTestCheck::ALL {
        run_check(check)?;
    }
    Ok(())
}

/// Run a single check.
pub fn run_check(check: SelfTestCheck) -> Result<(), SelfTestError> {
    let result = match check {
        SelfTestCheck::CrcVector => crc_vector(),
        SelfTestCheck::SerialLoopback => serial_loopback(),
        SelfTestCheck::BusLoopback => bus_loopback(),
    };
    debug!(check = check.as_str(), ok = result.is_ok(), "self-test check");
    result
}

fn crc_vector() -> Result<(), SelfTestError> {
    let got = crc16(CRC_VECTOR);
    if got == CRC_EXPECTED {
        Ok(())
    } else {
        Err(SelfTestError::CrcVector {
            got,
            expected: CRC_EXPECTED,
        })
    }
}

/// Fixed-size capture of the last delivered payload.
#[derive(Default)]
struct Capture {
    buf: [u8; PATTERN_MAX],
    len: Option<usize>,
}

impl Capture {
    fn store(&mut self, payload: &[u8]) {
        let len = payload.len().min(PATTERN_MAX);
        self.buf[..len].copy_from_slice(&payload[..len]);
        self.len = Some(payload.len());
    }

    fn verify(&self, check: SelfTestCheck, steps: usize) -> Result<(), SelfTestError> {
        match self.len {
            None => Err(SelfTestError::NotDelivered { check, steps }),
            Some(len) if len == PATTERN.len() && self.buf == PATTERN => Ok(()),
            Some(_) => Err(SelfTestError::PayloadMismatch { check }),
        }
    }
}

fn transfer_err(check: SelfTestCheck) -> impl Fn(TransferError) -> SelfTestError {
    move |source| SelfTestError::Transfer { check, source }
}

fn step_budget() -> usize {
    // Enough for the whole frame plus slack, in single-byte steps.
    2 * encoded_len(&PATTERN) + 4
}

fn serial_loopback() -> Result<(), SelfTestError> {
    let check = SelfTestCheck::SerialLoopback;
    let mut tx = [0u8; PATTERN_MAX + 2];
    let mut rx = [0u8; PATTERN_MAX + 2];
    let config = TransferConfig::new(PATTERN_MAX, &mut tx, &mut rx).map_err(transfer_err(check))?;

    let mut capture = Capture::default();
    let mut transfer = PacketTransfer::serial(
        MemoryByteLink::loopback(),
        |payload: &[u8]| capture.store(payload),
        config,
    );
    transfer.send(&PATTERN).map_err(transfer_err(check))?;

    let steps = step_budget();
    for _ in 0..steps {
        if transfer.task().map_err(transfer_err(check))?.frames_delivered > 0 {
            break;
        }
    }

    capture.verify(check, steps)
}

fn bus_loopback() -> Result<(), SelfTestError> {
    let check = SelfTestCheck::BusLoopback;
    let bus = MemoryBus::new();

    let mut tx_a = [0u8; PATTERN_MAX + 2];
    let mut rx_a = [0u8; PATTERN_MAX + 2];
    let mut tx_b = [0u8; PATTERN_MAX + 2];
    let mut rx_b = [0u8; PATTERN_MAX + 2];
    let config_a =
        TransferConfig::new(PATTERN_MAX, &mut tx_a, &mut rx_a).map_err(transfer_err(check))?;
    let config_b =
        TransferConfig::new(PATTERN_MAX, &mut tx_b, &mut rx_b).map_err(transfer_err(check))?;

    let mut capture = Capture::default();
    let mut sender = PacketTransfer::bus(
        bus.node(),
        LinkIds::new(BUS_TX_ID, BUS_RX_ID),
        |_: &[u8]| {},
        config_a,
    );
    let mut receiver = PacketTransfer::bus(
        bus.node(),
        LinkIds::new(BUS_RX_ID, BUS_TX_ID),
        |payload: &[u8]| capture.store(payload),
        config_b,
    );
    sender.send(&PATTERN).map_err(transfer_err(check))?;

    let steps = step_budget();
    for _ in 0..steps {
        sender.task().map_err(transfer_err(check))?;
        if receiver.task().map_err(transfer_err(check))?.frames_delivered > 0 {
            break;
        }
    }

    capture.verify(check, steps)
}
