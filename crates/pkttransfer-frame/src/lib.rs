//! Byte-stuffed, CRC-protected framing for serial and bus links.
//!
//! Every payload travels as:
//! - an opening delimiter `0x7E`
//! - the payload followed by its CRC-16/X-25 (little-endian), byte-stuffed
//! - a closing delimiter `0x7E`
//!
//! Inside a frame, `0x7E` is sent as `0x7D 0x5E` and `0x7D` as `0x7D 0x5D`.
//!
//! [`FrameEncoder`] and [`FrameDecoder`] move exactly one byte per call and
//! never allocate, so they can be driven from a polling loop. The helpers
//! above them do allocate: [`encode_frame`] grows its `BytesMut`, and the
//! reader, writer and (with the `async` feature) codec types own their
//! receive buffers. They serve hosts with `std::io` or tokio streams.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod crc;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::StuffedCodec;
pub use codec::{
    buffer_size, checked_buffer_size, encode_frame, encoded_len, CodecState, DecodeEvent, EncodeStep, FrameConfig,
    FrameDecoder, FrameEncoder, CRC_SIZE, DEFAULT_MAX_PAYLOAD, DELIMITER, ESCAPE,
    ESCAPED_DELIMITER, ESCAPED_ESCAPE, MIN_FRAME_CONTENT,
};
pub use crc::{crc16, crc16_bytes};
pub use error::{DropReason, FrameError, Result};
pub use reader::{decode_stream, FrameReader, ReaderStats};
pub use writer::FrameWriter;
