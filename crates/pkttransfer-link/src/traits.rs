/// Maximum data bytes carried by one bus message (classic CAN data field).
pub const CHUNK_SIZE: usize = 8;

/// Storage for one bus message.
pub type Chunk = [u8; CHUNK_SIZE];

/// The kind of hardware a link talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// One byte per transfer unit.
    Stream,
    /// Up to [`CHUNK_SIZE`] bytes per transfer unit, tagged with a link id.
    Chunked,
}

impl LinkKind {
    /// Maximum number of bytes moved by one hardware call.
    pub fn unit_size(self) -> usize {
        match self {
            LinkKind::Stream => 1,
            LinkKind::Chunked => CHUNK_SIZE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LinkKind::Stream => "stream",
            LinkKind::Chunked => "chunked",
        }
    }
}

/// A byte-stream link such as a UART.
///
/// All methods are called from the driver's polling step and must not block.
/// `send_byte` is only called after `tx_ready` returned `true` in the same
/// step, `recv_byte` only after `rx_ready` returned `true`.
pub trait ByteLink {
    /// Whether one more byte can be handed to the hardware right now.
    fn tx_ready(&mut self) -> bool;

    /// Whether at least one received byte is waiting.
    fn rx_ready(&mut self) -> bool;

    /// Hand one byte to the hardware.
    fn send_byte(&mut self, byte: u8);

    /// Take one received byte from the hardware.
    fn recv_byte(&mut self) -> u8;
}

/// A message-oriented link such as a CAN controller.
///
/// Every message carries at most [`CHUNK_SIZE`] data bytes and a numeric
/// link identifier used to multiplex frames sharing one bus.
pub trait ChunkLink {
    /// Whether one more message can be queued right now.
    fn tx_ready(&mut self) -> bool;

    /// Whether at least one received message is waiting.
    fn rx_ready(&mut self) -> bool;

    /// Queue one message of `data.len() <= CHUNK_SIZE` bytes tagged with `link_id`.
    fn send_chunk(&mut self, link_id: u32, data: &[u8]);

    /// Take one received message into `buf` and return its length.
    ///
    /// Messages whose identifier differs from `link_id` are consumed and
    /// reported as zero-length.
    fn recv_chunk(&mut self, link_id: u32, buf: &mut Chunk) -> usize;
}

impl<L: ByteLink + ?Sized> ByteLink for &mut L {
    fn tx_ready(&mut self) -> bool {
        (**self).tx_ready()
    }

    fn rx_ready(&mut self) -> bool {
        (**self).rx_ready()
    }

    fn send_byte(&mut self, byte: u8) {
        (**self).send_byte(byte)
    }

    fn recv_byte(&mut self) -> u8 {
        (**self).recv_byte()
    }
}

impl<L: ChunkLink + ?Sized> ChunkLink for &mut L {
    fn tx_ready(&mut self) -> bool {
        (**self).tx_ready()
    }

    fn rx_ready(&mut self) -> bool {
        (**self).rx_ready()
    }

    fn send_chunk(&mut self, link_id: u32, data: &[u8]) {
        (**self).send_chunk(link_id, data)
    }

    fn recv_chunk(&mut self, link_id: u32, buf: &mut Chunk) -> usize {
        (**self).recv_chunk(link_id, buf)
    }
}
