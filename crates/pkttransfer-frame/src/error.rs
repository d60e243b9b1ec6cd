/// Errors that can occur during buffered frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The maximum payload size leaves no room for the CRC.
    #[error("maximum payload size {max} is too large")]
    InvalidMaxPayload { max: usize },

    /// Empty payloads cannot be framed; the receiver would discard them.
    #[error("payload is empty")]
    EmptyPayload,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before another valid frame was received.
    #[error("connection closed (no complete frame)")]
    ConnectionClosed,
}

/// Why the decoder discarded a frame.
///
/// Drops are never fatal: the decoder resynchronises on the next delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum DropReason {
    /// More bytes arrived than the receive buffer holds.
    #[error("receive buffer overflow")]
    Overflow,

    /// An escape byte was followed by something other than `0x5E`/`0x5D`.
    #[error("invalid escape sequence")]
    BadEscape,

    /// The trailing CRC does not match the payload.
    #[error("CRC mismatch")]
    CrcMismatch,

    /// Fewer than one payload byte plus CRC between delimiters.
    #[error("frame too short")]
    Runt,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::Overflow => "overflow",
            DropReason::BadEscape => "bad-escape",
            DropReason::CrcMismatch => "crc-mismatch",
            DropReason::Runt => "runt",
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
