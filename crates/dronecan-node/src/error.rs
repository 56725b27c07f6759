/// Errors that can occur in node operations.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Link-level error.
    #[error("link error: {0}")]
    Link(#[from] dronecan_link::LinkError),

    /// Transfer-level error.
    #[error("frame error: {0}")]
    Frame(#[from] dronecan_frame::FrameError),

    /// Registry lookup or encoding error.
    #[error("schema error: {0}")]
    Schema(#[from] dronecan_schema::SchemaError),

    /// Serialization error.
    #[error("dsdl error: {0}")]
    Dsdl(#[from] dronecan_dsdl::DsdlError),

    /// Node ids are 1..=127; 0 is reserved for anonymous nodes.
    #[error("invalid node id {0} (expected 1..=127)")]
    InvalidNodeId(u8),

    /// No message type with this name is registered.
    #[error("unknown message type `{0}`")]
    UnknownMessage(String),

    /// No service type with this name is registered.
    #[error("unknown service type `{0}`")]
    UnknownService(String),

    /// The message type has no id and cannot be broadcast.
    #[error("message type `{0}` has no id")]
    MissingId(String),

    /// Every request slot holds a live request.
    #[error("too many pending requests (max {0})")]
    TooManyPending(usize),

    /// The handle does not name a tracked request.
    #[error("unknown request {0}")]
    UnknownRequest(u64),
}

pub type Result<T> = std::result::Result<T, NodeError>;
