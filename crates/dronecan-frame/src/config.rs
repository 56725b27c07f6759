use std::time::Duration;

/// Idle time after which per-stream state is considered abandoned.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_millis(2000);

/// Default bound on concurrently tracked streams.
pub const DEFAULT_MAX_STREAMS: usize = 512;

/// Configuration shared by [`TransferSender`](crate::TransferSender) and
/// [`TransferReceiver`](crate::TransferReceiver).
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Stream state idle for longer than this is discarded. Default: 2 s.
    pub transfer_timeout: Duration,
    /// Maximum tracked streams; the least recently active is evicted when
    /// a new stream would exceed it. Default: 512.
    pub max_streams: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            max_streams: DEFAULT_MAX_STREAMS,
        }
    }
}
