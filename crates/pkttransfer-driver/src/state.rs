use pkttransfer_frame::{CodecState, DropReason};

use crate::port::LinkIds;

/// Running counters of one transfer instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Frames the receiver saw begin, counted once per frame.
    pub frames_started: u64,
    /// Frames whose closing delimiter went out.
    pub frames_sent: u64,
    /// Frames delivered to the application.
    pub frames_received: u64,
    pub dropped_overflow: u64,
    pub dropped_bad_escape: u64,
    pub dropped_crc: u64,
    pub dropped_runt: u64,
}

impl TransferStats {
    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::Overflow => self.dropped_overflow += 1,
            DropReason::BadEscape => self.dropped_bad_escape += 1,
            DropReason::CrcMismatch => self.dropped_crc += 1,
            DropReason::Runt => self.dropped_runt += 1,
        }
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_overflow + self.dropped_bad_escape + self.dropped_crc + self.dropped_runt
    }
}

/// Snapshot of both directions of a transfer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferState {
    pub initialized: bool,
    pub tx_state: CodecState,
    /// Content length (payload plus CRC) of the queued frame; 0 when idle.
    pub tx_size: usize,
    /// Content bytes of the queued frame already emitted.
    pub sent_size: usize,
    pub rx_state: CodecState,
    /// Unstuffed bytes accumulated for the frame in progress.
    pub rx_size: usize,
    /// Bus identifiers, `None` for byte-stream links.
    pub link_ids: Option<LinkIds>,
    pub stats: TransferStats,
}

impl TransferState {
    pub fn tx_idle(&self) -> bool {
        self.tx_size == 0
    }
}
