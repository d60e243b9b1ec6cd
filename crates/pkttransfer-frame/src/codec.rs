use bytes::{BufMut, BytesMut};

use crate::crc::{crc16, crc16_bytes};
use crate::error::{DropReason, FrameError, Result};

/// Frame boundary marker.
pub const DELIMITER: u8 = 0x7E;

/// Prefix of a two-byte escape sequence.
pub const ESCAPE: u8 = 0x7D;

/// Substitute sent after [`ESCAPE`] for a literal [`DELIMITER`].
pub const ESCAPED_DELIMITER: u8 = 0x5E;

/// Substitute sent after [`ESCAPE`] for a literal [`ESCAPE`].
pub const ESCAPED_ESCAPE: u8 = 0x5D;

/// Trailing CRC length in bytes.
pub const CRC_SIZE: usize = 2;

/// Smallest acceptable frame content: one payload byte plus the CRC.
pub const MIN_FRAME_CONTENT: usize = 1 + CRC_SIZE;

/// Default maximum payload size.
pub const DEFAULT_MAX_PAYLOAD: usize = 512;

/// Scratch buffer size needed for payloads up to `max_payload` bytes.
///
/// Saturates at `usize::MAX`; use [`checked_buffer_size`] where the result
/// sizes an allocation.
pub const fn buffer_size(max_payload: usize) -> usize {
    max_payload.saturating_add(CRC_SIZE)
}

/// [`buffer_size`], or `None` when payload plus CRC does not fit in `usize`.
pub const fn checked_buffer_size(max_payload: usize) -> Option<usize> {
    max_payload.checked_add(CRC_SIZE)
}

/// Framing state, tracked independently for each direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CodecState {
    /// Outside a frame.
    #[default]
    AwaitingDelimiter,
    /// Between delimiters.
    InFrame,
    /// An escape byte was sent/received; its substitute is next.
    InEscape,
}

impl CodecState {
    pub fn as_str(self) -> &'static str {
        match self {
            CodecState::AwaitingDelimiter => "awaiting-delimiter",
            CodecState::InFrame => "in-frame",
            CodecState::InEscape => "in-escape",
        }
    }
}

fn is_reserved(byte: u8) -> bool {
    byte == DELIMITER || byte == ESCAPE
}

fn substitute(byte: u8) -> u8 {
    if byte == DELIMITER {
        ESCAPED_DELIMITER
    } else {
        ESCAPED_ESCAPE
    }
}

/// One byte produced by [`FrameEncoder::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeStep {
    /// The byte to put on the wire.
    pub byte: u8,
    /// `true` when `byte` is the closing delimiter.
    pub frame_done: bool,
}

/// Byte-stuffing encoder.
///
/// The encoder does not own the frame content. Each call to
/// [`step`](Self::step) receives `payload || crc` and emits exactly one wire
/// byte, remembering how far it got.
#[derive(Debug, Clone, Default)]
pub struct FrameEncoder {
    state: CodecState,
    offset: usize,
}

impl FrameEncoder {
    pub const fn new() -> Self {
        Self {
            state: CodecState::AwaitingDelimiter,
            offset: 0,
        }
    }

    pub fn state(&self) -> CodecState {
        self.state
    }

    /// Number of content bytes already consumed from the current frame.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Produce the next wire byte for `content` (payload followed by CRC).
    ///
    /// Once every content byte has been emitted the closing delimiter is
    /// returned with `frame_done` set, and the encoder is ready for the
    /// next frame.
    pub fn step(&mut self, content: &[u8]) -> EncodeStep {
        if self.offset >= content.len() {
            self.reset();
            return EncodeStep {
                byte: DELIMITER,
                frame_done: true,
            };
        }

        let byte = match self.state {
            CodecState::AwaitingDelimiter => {
                self.state = CodecState::InFrame;
                DELIMITER
            }
            CodecState::InFrame => {
                let next = content[self.offset];
                if is_reserved(next) {
                    self.state = CodecState::InEscape;
                    ESCAPE
                } else {
                    self.offset += 1;
                    next
                }
            }
            CodecState::InEscape => {
                let next = content[self.offset];
                self.offset += 1;
                self.state = CodecState::InFrame;
                substitute(next)
            }
        };

        EncodeStep {
            byte,
            frame_done: false,
        }
    }
}

/// What happened after feeding one byte to [`FrameDecoder::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeEvent<'a> {
    /// The byte was consumed (or ignored); nothing to report.
    Pending,
    /// A new frame began.
    ///
    /// Reported once per frame: on the delimiter that leaves idle, or on the
    /// first content byte (or escape) when the frame was opened by the
    /// delimiter that closed the previous one.
    FrameStarted,
    /// A complete frame passed the CRC check; carries the payload.
    Frame(&'a [u8]),
    /// The frame in progress was discarded.
    Dropped(DropReason),
}

/// Byte-stuffing decoder.
///
/// Accumulates unescaped frame content into a caller-supplied buffer whose
/// length is the receive capacity (`max_payload + CRC_SIZE`). A delimiter
/// both closes the frame in progress and opens the next one, so back-to-back
/// frames and frames after a dropped one are decoded without losing a
/// boundary.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    state: CodecState,
    len: usize,
    // Whether the open frame has already been reported as started.
    counted: bool,
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            state: CodecState::AwaitingDelimiter,
            len: 0,
            counted: false,
        }
    }

    pub fn state(&self) -> CodecState {
        self.state
    }

    /// Number of unescaped bytes accumulated for the current frame.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed one received byte.
    pub fn push<'a>(&mut self, byte: u8, buf: &'a mut [u8]) -> DecodeEvent<'a> {
        match self.state {
            CodecState::AwaitingDelimiter => {
                if byte == DELIMITER {
                    self.open(true);
                    DecodeEvent::FrameStarted
                } else {
                    DecodeEvent::Pending
                }
            }
            CodecState::InFrame => match byte {
                ESCAPE => {
                    self.state = CodecState::InEscape;
                    self.count_start()
                }
                DELIMITER => {
                    let len = std::mem::take(&mut self.len);
                    if len == 0 {
                        // Repeated delimiter: idle fill between frames.
                        return DecodeEvent::Pending;
                    }
                    // This delimiter also opens the next frame, which is
                    // counted once content arrives.
                    self.counted = false;
                    finalize(&buf[..len])
                }
                _ if self.len >= buf.len() => self.discard(DropReason::Overflow),
                _ => {
                    buf[self.len] = byte;
                    self.len += 1;
                    self.count_start()
                }
            },
            CodecState::InEscape => {
                let literal = match byte {
                    ESCAPED_DELIMITER => DELIMITER,
                    ESCAPED_ESCAPE => ESCAPE,
                    DELIMITER => {
                        // Escape aborted by a delimiter: the frame is lost but
                        // the delimiter still opens the next one.
                        self.open(false);
                        return DecodeEvent::Dropped(DropReason::BadEscape);
                    }
                    _ => return self.discard(DropReason::BadEscape),
                };
                if self.len >= buf.len() {
                    return self.discard(DropReason::Overflow);
                }
                buf[self.len] = literal;
                self.len += 1;
                self.state = CodecState::InFrame;
                DecodeEvent::Pending
            }
        }
    }

    fn count_start(&mut self) -> DecodeEvent<'static> {
        if std::mem::replace(&mut self.counted, true) {
            DecodeEvent::Pending
        } else {
            DecodeEvent::FrameStarted
        }
    }

    fn open(&mut self, counted: bool) {
        self.state = CodecState::InFrame;
        self.len = 0;
        self.counted = counted;
    }

    fn discard(&mut self, reason: DropReason) -> DecodeEvent<'static> {
        self.state = CodecState::AwaitingDelimiter;
        self.len = 0;
        DecodeEvent::Dropped(reason)
    }
}

fn finalize(content: &[u8]) -> DecodeEvent<'_> {
    if content.len() < MIN_FRAME_CONTENT {
        return DecodeEvent::Dropped(DropReason::Runt);
    }
    let (payload, received) = content.split_at(content.len() - CRC_SIZE);
    if crc16_bytes(payload) != received {
        return DecodeEvent::Dropped(DropReason::CrcMismatch);
    }
    DecodeEvent::Frame(payload)
}

/// Configuration for the buffered reader/writer and the async codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 512.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl FrameConfig {
    /// Receive buffer length for this configuration.
    pub fn buffer_len(&self) -> Result<usize> {
        checked_buffer_size(self.max_payload_size).ok_or(FrameError::InvalidMaxPayload {
            max: self.max_payload_size,
        })
    }
}

/// Number of wire bytes needed to frame `payload`.
pub fn encoded_len(payload: &[u8]) -> usize {
    let crc = crc16_bytes(payload);
    let escapes = payload
        .iter()
        .chain(crc.iter())
        .filter(|b| is_reserved(**b))
        .count();
    payload.len() + CRC_SIZE + escapes + 2
}

/// Encode a whole frame into `dst`.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────┬──────────────────┬──────┐
/// │ 0x7E │ payload (stuffed)    │ CRC16 LE (stuffed)│ 0x7E │
/// └──────┴──────────────────────┴──────────────────┴──────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.is_empty() {
        return Err(FrameError::EmptyPayload);
    }

    let crc = crc16(payload).to_le_bytes();
    dst.reserve(encoded_len(payload));
    dst.put_u8(DELIMITER);
    for &byte in payload.iter().chain(crc.iter()) {
        if is_reserved(byte) {
            dst.put_u8(ESCAPE);
            dst.put_u8(substitute(byte));
        } else {
            dst.put_u8(byte);
        }
    }
    dst.put_u8(DELIMITER);
    Ok(())
}
