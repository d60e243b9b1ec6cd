use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::{
    buffer_size, encode_frame, DecodeEvent, FrameConfig, FrameDecoder, DEFAULT_MAX_PAYLOAD,
};
use crate::error::FrameError;

/// `tokio-util` codec for stuffed frames.
///
/// Decodes validated payloads from an async byte stream (for example a
/// serial port wrapped in `FramedRead`) and encodes payloads into frames.
#[derive(Debug, Clone)]
pub struct StuffedCodec {
    decoder: FrameDecoder,
    frame_buf: Vec<u8>,
    max_payload_size: usize,
}

impl StuffedCodec {
    pub fn new() -> Self {
        Self::from_buffer(DEFAULT_MAX_PAYLOAD, vec![0u8; buffer_size(DEFAULT_MAX_PAYLOAD)])
    }

    pub fn with_config(config: FrameConfig) -> Result<Self, FrameError> {
        let frame_buf = vec![0u8; config.buffer_len()?];
        Ok(Self::from_buffer(config.max_payload_size, frame_buf))
    }

    fn from_buffer(max_payload_size: usize, frame_buf: Vec<u8>) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            frame_buf,
            max_payload_size,
        }
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }
}

impl Default for StuffedCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for StuffedCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while src.has_remaining() {
            let byte = src.get_u8();
            match self.decoder.push(byte, &mut self.frame_buf) {
                DecodeEvent::Frame(payload) => return Ok(Some(Bytes::copy_from_slice(payload))),
                DecodeEvent::Dropped(reason) => trace!(%reason, "dropped frame"),
                DecodeEvent::Pending | DecodeEvent::FrameStarted => {}
            }
        }
        Ok(None)
    }
}

impl Encoder<Bytes> for StuffedCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: item.len(),
                max: self.max_payload_size,
            });
        }
        encode_frame(&item, dst)
    }
}
