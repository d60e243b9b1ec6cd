use pkttransfer_frame::{buffer_size, checked_buffer_size};

use crate::error::{ConfigError, Result};

/// Sizing of a transfer instance, as reported by
/// [`PacketTransfer::config`](crate::PacketTransfer::config).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLimits {
    /// Largest payload `send` accepts and the receiver delivers.
    pub max_payload: usize,
    /// Length of the caller's TX buffer.
    pub tx_capacity: usize,
    /// Length of the caller's RX buffer.
    pub rx_capacity: usize,
}

/// Construction parameters: the payload limit and the two scratch buffers.
///
/// Both buffers belong to the caller and must hold at least
/// `max_payload + 2` bytes (payload plus CRC). Nothing is allocated by the
/// transfer instance itself.
#[derive(Debug)]
pub struct TransferConfig<'buf> {
    max_payload: usize,
    tx_buf: &'buf mut [u8],
    rx_buf: &'buf mut [u8],
}

impl<'buf> TransferConfig<'buf> {
    /// Validate the buffers against `max_payload`.
    pub fn new(max_payload: usize, tx_buf: &'buf mut [u8], rx_buf: &'buf mut [u8]) -> Result<Self> {
        if max_payload == 0 {
            return Err(ConfigError::ZeroPayload.into());
        }
        let needed =
            checked_buffer_size(max_payload).ok_or(ConfigError::PayloadTooLarge { max_payload })?;
        if tx_buf.len() < needed {
            return Err(ConfigError::TxBufferTooSmall {
                len: tx_buf.len(),
                needed,
            }
            .into());
        }
        if rx_buf.len() < needed {
            return Err(ConfigError::RxBufferTooSmall {
                len: rx_buf.len(),
                needed,
            }
            .into());
        }

        Ok(Self {
            max_payload,
            tx_buf,
            rx_buf,
        })
    }

    /// Derive the payload limit from the smaller of the two buffers.
    pub fn from_buffers(tx_buf: &'buf mut [u8], rx_buf: &'buf mut [u8]) -> Result<Self> {
        let usable = tx_buf.len().min(rx_buf.len());
        let max_payload = usable.saturating_sub(buffer_size(0));
        Self::new(max_payload, tx_buf, rx_buf)
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    pub fn limits(&self) -> TransferLimits {
        TransferLimits {
            max_payload: self.max_payload,
            tx_capacity: self.tx_buf.len(),
            rx_capacity: self.rx_buf.len(),
        }
    }

    /// TX content area: exactly payload plus CRC for the largest payload.
    pub(crate) fn tx_window(&mut self) -> &mut [u8] {
        let end = buffer_size(self.max_payload);
        &mut self.tx_buf[..end]
    }

    pub(crate) fn tx_content(&self, len: usize) -> &[u8] {
        &self.tx_buf[..len]
    }

    /// RX accumulation area. Its length is the decoder's overflow limit.
    pub(crate) fn rx_window(&mut self) -> &mut [u8] {
        let end = buffer_size(self.max_payload);
        &mut self.rx_buf[..end]
    }

    pub(crate) fn clear_buffers(&mut self) {
        self.tx_buf.fill(0);
        self.rx_buf.fill(0);
    }
}
