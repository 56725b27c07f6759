use std::time::Duration;

use dronecan_frame::TransferConfig;

/// How long a service request waits for its response by default.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Default bound on outstanding service requests.
pub const DEFAULT_MAX_PENDING_REQUESTS: usize = 64;

/// Node behavior configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Deadline applied to each request. Default: 1 s.
    pub request_timeout: Duration,
    /// Maximum tracked requests, answered or not. Default: 64.
    pub max_pending_requests: usize,
    /// Sender and receiver stream settings.
    pub transfer: TransferConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_pending_requests: DEFAULT_MAX_PENDING_REQUESTS,
            transfer: TransferConfig::default(),
        }
    }
}
