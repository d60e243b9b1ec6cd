use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::traits::{ByteLink, Chunk, ChunkLink, CHUNK_SIZE};

type ByteQueue = Arc<Mutex<VecDeque<u8>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking peer cannot leave a queue half-updated, so poisoning is ignored.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory byte-stream link.
///
/// Two ends created by [`MemoryByteLink::pair`] behave like a crossed-over
/// UART: bytes sent on one end become readable on the other. An optional
/// capacity bounds the number of bytes in flight per direction, so
/// `tx_ready` reports `false` until the peer reads.
#[derive(Debug, Clone)]
pub struct MemoryByteLink {
    tx: ByteQueue,
    rx: ByteQueue,
    capacity: Option<usize>,
}

impl MemoryByteLink {
    /// Create two connected ends with unbounded queues.
    pub fn pair() -> (Self, Self) {
        Self::build_pair(None)
    }

    /// Create two connected ends that hold at most `capacity` bytes in flight
    /// per direction.
    pub fn pair_with_capacity(capacity: usize) -> (Self, Self) {
        Self::build_pair(Some(capacity))
    }

    /// Create a single end whose transmitted bytes come back on its own receiver.
    pub fn loopback() -> Self {
        let queue = ByteQueue::default();
        Self {
            tx: Arc::clone(&queue),
            rx: queue,
            capacity: None,
        }
    }

    fn build_pair(capacity: Option<usize>) -> (Self, Self) {
        let a_to_b = ByteQueue::default();
        let b_to_a = ByteQueue::default();
        let a = Self {
            tx: Arc::clone(&a_to_b),
            rx: Arc::clone(&b_to_a),
            capacity,
        };
        let b = Self {
            tx: b_to_a,
            rx: a_to_b,
            capacity,
        };
        (a, b)
    }

    /// Append raw bytes to this end's receive queue, bypassing the peer.
    pub fn push_rx(&self, bytes: &[u8]) {
        lock(&self.rx).extend(bytes.iter().copied());
    }

    /// Remove and return everything waiting in this end's receive queue.
    pub fn take_rx(&self) -> Vec<u8> {
        lock(&self.rx).drain(..).collect()
    }

    /// Number of bytes waiting in this end's receive queue.
    pub fn rx_len(&self) -> usize {
        lock(&self.rx).len()
    }

    /// Number of bytes sent by this end and not yet read by the peer.
    pub fn tx_len(&self) -> usize {
        lock(&self.tx).len()
    }
}

impl ByteLink for MemoryByteLink {
    fn tx_ready(&mut self) -> bool {
        match self.capacity {
            Some(cap) => lock(&self.tx).len() < cap,
            None => true,
        }
    }

    fn rx_ready(&mut self) -> bool {
        !lock(&self.rx).is_empty()
    }

    fn send_byte(&mut self, byte: u8) {
        lock(&self.tx).push_back(byte);
    }

    fn recv_byte(&mut self) -> u8 {
        lock(&self.rx).pop_front().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BusMessage {
    link_id: u32,
    len: usize,
    data: Chunk,
}

#[derive(Debug, Default)]
struct BusInner {
    inboxes: Vec<VecDeque<BusMessage>>,
}

/// In-memory broadcast bus.
///
/// Every message sent by a node is delivered to every other node's inbox,
/// like frames on a shared CAN bus. Receivers filter by link identifier.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    inner: Arc<Mutex<BusInner>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new node to the bus.
    pub fn node(&self) -> MemoryBusNode {
        let mut inner = lock(&self.inner);
        inner.inboxes.push(VecDeque::new());
        MemoryBusNode {
            bus: self.clone(),
            index: inner.inboxes.len() - 1,
        }
    }

    /// Number of attached nodes.
    pub fn node_count(&self) -> usize {
        lock(&self.inner).inboxes.len()
    }
}

/// One node attached to a [`MemoryBus`].
#[derive(Debug, Clone)]
pub struct MemoryBusNode {
    bus: MemoryBus,
    index: usize,
}

impl MemoryBusNode {
    /// Place a message directly in this node's inbox.
    ///
    /// Data beyond [`CHUNK_SIZE`] bytes is cut off, as a real controller would.
    pub fn inject(&self, link_id: u32, data: &[u8]) {
        let message = to_message(link_id, data);
        lock(&self.bus.inner).inboxes[self.index].push_back(message);
    }

    /// Remove and return every message waiting in this node's inbox.
    pub fn drain(&self) -> Vec<(u32, Vec<u8>)> {
        lock(&self.bus.inner).inboxes[self.index]
            .drain(..)
            .map(|m| (m.link_id, m.data[..m.len].to_vec()))
            .collect()
    }

    /// Number of messages waiting in this node's inbox.
    pub fn pending(&self) -> usize {
        lock(&self.bus.inner).inboxes[self.index].len()
    }
}

fn to_message(link_id: u32, data: &[u8]) -> BusMessage {
    let len = data.len().min(CHUNK_SIZE);
    let mut chunk = [0u8; CHUNK_SIZE];
    chunk[..len].copy_from_slice(&data[..len]);
    BusMessage {
        link_id,
        len,
        data: chunk,
    }
}

impl ChunkLink for MemoryBusNode {
    fn tx_ready(&mut self) -> bool {
        true
    }

    fn rx_ready(&mut self) -> bool {
        !lock(&self.bus.inner).inboxes[self.index].is_empty()
    }

    fn send_chunk(&mut self, link_id: u32, data: &[u8]) {
        let message = to_message(link_id, data);
        let mut inner = lock(&self.bus.inner);
        for (index, inbox) in inner.inboxes.iter_mut().enumerate() {
            if index != self.index {
                inbox.push_back(message.clone());
            }
        }
    }

    fn recv_chunk(&mut self, link_id: u32, buf: &mut Chunk) -> usize {
        let next = lock(&self.bus.inner).inboxes[self.index].pop_front();
        let Some(message) = next else {
            return 0;
        };
        if message.link_id != link_id {
            trace!(
                node = self.index,
                link_id = message.link_id,
                filter = link_id,
                "ignoring bus message for another link"
            );
            return 0;
        }
        buf[..message.len].copy_from_slice(&message.data[..message.len]);
        message.len
    }
}
