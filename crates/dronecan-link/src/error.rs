/// Errors that can occur on the CAN link layer.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A frame carried more data than a classic CAN frame allows.
    #[error("frame data too long ({len} bytes, max {max})")]
    DataTooLong { len: usize, max: usize },

    /// A SocketCAN record declared an impossible data length.
    #[error("invalid record data length {0}")]
    InvalidLength(u8),

    /// An I/O error occurred while reading or writing records.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed before a complete record was received.
    #[error("connection closed (incomplete record)")]
    ConnectionClosed,

    /// No frame arrived on a subscription before the deadline.
    #[error("timed out waiting for a frame")]
    Timeout,

    /// The bus the subscription belonged to has gone away.
    #[error("bus disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, LinkError>;
