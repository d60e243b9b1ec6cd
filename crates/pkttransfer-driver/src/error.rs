/// Why a payload could not be queued for transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TxOverflow {
    /// The payload exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The previous frame is still being transmitted.
    #[error("previous frame still pending ({remaining} content bytes left)")]
    FramePending { remaining: usize },
}

/// Invalid [`TransferConfig`](crate::TransferConfig) parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The maximum payload size must be at least one byte.
    #[error("maximum payload size must be non-zero")]
    ZeroPayload,

    /// The payload limit plus CRC does not fit in `usize`.
    #[error("maximum payload size {max_payload} leaves no room for the CRC")]
    PayloadTooLarge { max_payload: usize },

    /// The TX buffer cannot hold a maximum-size payload plus CRC.
    #[error("TX buffer too small ({len} bytes, need {needed})")]
    TxBufferTooSmall { len: usize, needed: usize },

    /// The RX buffer cannot hold a maximum-size payload plus CRC.
    #[error("RX buffer too small ({len} bytes, need {needed})")]
    RxBufferTooSmall { len: usize, needed: usize },
}

/// Errors returned by packet transfer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    /// `send` rejected the payload.
    #[error("TX overflow: {0}")]
    TxOverflow(#[from] TxOverflow),

    /// Empty payloads are never sent; the receiver would discard them.
    #[error("payload is empty")]
    EmptyPayload,

    /// The instance was deinitialised.
    #[error("transfer instance is not initialised")]
    NotInitialized,

    /// The configuration was rejected at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, TransferError>;
