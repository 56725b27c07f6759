use dronecan_dsdl::DsdlError;

/// Errors that can occur during registration or encoding.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Only message types with an id can be registered.
    #[error("message type `{0}` has no id")]
    MissingId(String),

    /// The message id is already registered.
    #[error("message id {id} already registered to `{existing}`")]
    DuplicateMessageId { id: u16, existing: String },

    /// The service id is already registered.
    #[error("service id {id} already registered to `{existing}`")]
    DuplicateServiceId { id: u8, existing: String },

    /// The type name is already registered.
    #[error("type `{0}` already registered")]
    DuplicateName(String),

    /// No message type with this name.
    #[error("unknown message type `{0}`")]
    UnknownMessage(String),

    /// No service type with this name.
    #[error("unknown service type `{0}`")]
    UnknownService(String),

    /// The value does not fit the type's definition.
    #[error("encode failed: {0}")]
    Dsdl(#[from] DsdlError),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
