//! Adapters between the framing state machines and a hardware link.
//!
//! The link kind is chosen at compile time: a transfer instance is generic
//! over a [`Port`], which is either a [`SerialPort`] moving one byte per step
//! or a [`BusPort`] moving up to [`CHUNK_SIZE`] bytes per step.

use pkttransfer_frame::FrameEncoder;
use pkttransfer_link::{ByteLink, Chunk, ChunkLink, LinkKind, CHUNK_SIZE};

/// Outcome of one TX attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxProgress {
    /// The hardware could not accept data; nothing was emitted.
    NotReady,
    /// `bytes` wire bytes were handed to the hardware.
    Sent { bytes: usize, frame_done: bool },
}

/// One hardware unit per step, in each direction.
pub trait Port {
    fn kind(&self) -> LinkKind;

    /// Emit the next hardware unit of the frame whose content is `content`.
    fn poll_tx(&mut self, encoder: &mut FrameEncoder, content: &[u8]) -> TxProgress;

    /// Read one hardware unit, feeding each received byte to `sink`.
    /// Returns the number of bytes fed.
    fn poll_rx<F: FnMut(u8)>(&mut self, sink: F) -> usize;

    fn link_ids(&self) -> Option<LinkIds> {
        None
    }
}

/// Byte-stream link (UART and similar).
#[derive(Debug)]
pub struct SerialPort<L> {
    link: L,
}

impl<L: ByteLink> SerialPort<L> {
    pub fn new(link: L) -> Self {
        Self { link }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }
}

impl<L: ByteLink> Port for SerialPort<L> {
    fn kind(&self) -> LinkKind {
        LinkKind::Stream
    }

    fn poll_tx(&mut self, encoder: &mut FrameEncoder, content: &[u8]) -> TxProgress {
        if !self.link.tx_ready() {
            return TxProgress::NotReady;
        }
        let step = encoder.step(content);
        self.link.send_byte(step.byte);
        TxProgress::Sent {
            bytes: 1,
            frame_done: step.frame_done,
        }
    }

    fn poll_rx<F: FnMut(u8)>(&mut self, mut sink: F) -> usize {
        if !self.link.rx_ready() {
            return 0;
        }
        sink(self.link.recv_byte());
        1
    }
}

/// Message identifiers used on a bus link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkIds {
    /// Identifier stamped on every outgoing chunk.
    pub tx: u32,
    /// Only chunks carrying this identifier are accepted.
    pub rx: u32,
}

impl LinkIds {
    pub fn new(tx: u32, rx: u32) -> Self {
        Self { tx, rx }
    }
}

/// Chunked message bus link (CAN and similar).
#[derive(Debug)]
pub struct BusPort<L> {
    link: L,
    ids: LinkIds,
}

impl<L: ChunkLink> BusPort<L> {
    pub fn new(link: L, ids: LinkIds) -> Self {
        Self { link, ids }
    }

    pub fn ids(&self) -> LinkIds {
        self.ids
    }

    pub fn set_tx_id(&mut self, id: u32) {
        self.ids.tx = id;
    }

    pub fn set_rx_id(&mut self, id: u32) {
        self.ids.rx = id;
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }
}

impl<L: ChunkLink> Port for BusPort<L> {
    fn kind(&self) -> LinkKind {
        LinkKind::Chunked
    }

    // A chunk never spans two frames: it ends early at the closing delimiter.
    fn poll_tx(&mut self, encoder: &mut FrameEncoder, content: &[u8]) -> TxProgress {
        if !self.link.tx_ready() {
            return TxProgress::NotReady;
        }

        let mut chunk: Chunk = [0u8; CHUNK_SIZE];
        let mut len = 0;
        let mut frame_done = false;
        while len < CHUNK_SIZE {
            let step = encoder.step(content);
            chunk[len] = step.byte;
            len += 1;
            if step.frame_done {
                frame_done = true;
                break;
            }
        }

        self.link.send_chunk(self.ids.tx, &chunk[..len]);
        TxProgress::Sent {
            bytes: len,
            frame_done,
        }
    }

    fn poll_rx<F: FnMut(u8)>(&mut self, mut sink: F) -> usize {
        if !self.link.rx_ready() {
            return 0;
        }

        let mut chunk: Chunk = [0u8; CHUNK_SIZE];
        let len = self.link.recv_chunk(self.ids.rx, &mut chunk).min(CHUNK_SIZE);
        for &byte in &chunk[..len] {
            sink(byte);
        }
        len
    }

    fn link_ids(&self) -> Option<LinkIds> {
        Some(self.ids)
    }
}
