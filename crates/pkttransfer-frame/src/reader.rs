use std::io::{ErrorKind, Read};

use bytes::Bytes;
use tracing::trace;

use crate::codec::{buffer_size, DecodeEvent, FrameConfig, FrameDecoder};
use crate::error::{DropReason, FrameError, Result};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Counters kept by a [`FrameReader`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub frames_started: u64,
    pub frames_received: u64,
    pub dropped_overflow: u64,
    pub dropped_bad_escape: u64,
    pub dropped_crc: u64,
    pub dropped_runt: u64,
}

impl ReaderStats {
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

    /// Count one decoder event, passing a completed payload through.
    pub fn observe<'a>(&mut self, event: DecodeEvent<'a>) -> Option<&'a [u8]> {
        match event {
            DecodeEvent::Pending => None,
            DecodeEvent::FrameStarted => {
                self.frames_started += 1;
                None
            }
            DecodeEvent::Frame(payload) => {
                self.frames_received += 1;
                Some(payload)
            }
            DecodeEvent::Dropped(reason) => {
                trace!(%reason, "dropped frame");
                self.record_drop(reason);
                None
            }
        }
    }
}

/// Decode every valid payload in `data` in one pass.
///
/// A trailing partial frame is ignored. No frame in `data` can outgrow
/// `data` itself, so the receive buffer is capped at the input length.
pub fn decode_stream(data: &[u8], max_payload_size: usize) -> (Vec<Bytes>, ReaderStats) {
    let mut decoder = FrameDecoder::new();
    let mut buf = vec![0u8; buffer_size(max_payload_size).min(data.len())];
    let mut stats = ReaderStats::default();
    let mut frames = Vec::new();

    for &byte in data {
        if let Some(payload) = stats.observe(decoder.push(byte, &mut buf)) {
            frames.push(Bytes::copy_from_slice(payload));
        }
    }

    (frames, stats)
}

/// Reads validated payloads from any `Read` stream.
///
/// Bytes outside frames, malformed frames and CRC failures are skipped;
/// callers only ever see payloads that passed the CRC check.
pub struct FrameReader<T> {
    inner: T,
    decoder: FrameDecoder,
    frame_buf: Vec<u8>,
    pending: Vec<u8>,
    pos: usize,
    stats: ReaderStats,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        let config = FrameConfig::default();
        let frame_buf = vec![0u8; buffer_size(config.max_payload_size)];
        Self::from_parts(inner, config, frame_buf)
    }

    /// Create a new frame reader with explicit configuration.
    ///
    /// Fails with [`FrameError::InvalidMaxPayload`] when the payload limit
    /// plus CRC overflows `usize`.
    pub fn with_config(inner: T, config: FrameConfig) -> Result<Self> {
        let frame_buf = vec![0u8; config.buffer_len()?];
        Ok(Self::from_parts(inner, config, frame_buf))
    }

    fn from_parts(inner: T, config: FrameConfig, frame_buf: Vec<u8>) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            frame_buf,
            pending: Vec::new(),
            pos: 0,
            stats: ReaderStats::default(),
            config,
        }
    }

    /// Read the next valid payload (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached; a
    /// partial frame at EOF is discarded.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            while self.pos < self.pending.len() {
                let byte = self.pending[self.pos];
                self.pos += 1;
                let event = self.decoder.push(byte, &mut self.frame_buf);
                if let Some(payload) = self.stats.observe(event) {
                    return Ok(Bytes::copy_from_slice(payload));
                }
            }

            self.pending.resize(READ_CHUNK_SIZE, 0);
            self.pos = 0;
            let read = match self.inner.read(&mut self.pending) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {
                    self.pending.clear();
                    continue;
                }
                Err(err) => {
                    self.pending.clear();
                    return Err(FrameError::Io(err));
                }
            };
            self.pending.truncate(read);

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }
        }
    }

    /// Read every remaining payload until EOF.
    pub fn read_to_end(&mut self) -> Result<Vec<Bytes>> {
        let mut frames = Vec::new();
        loop {
            match self.read_frame() {
                Ok(frame) => frames.push(frame),
                Err(FrameError::ConnectionClosed) => return Ok(frames),
                Err(err) => return Err(err),
            }
        }
    }

    /// Counters collected so far.
    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
