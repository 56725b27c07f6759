use dronecan_dsdl::DsdlError;
use dronecan_link::LinkError;

/// Errors raised while building or sending frames.
///
/// Faults in *received* traffic (CRC mismatch, unknown signature, toggle
/// errors) are never surfaced here; the receiver logs and drops them.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A frame identifier field does not fit its bit width.
    #[error("{field} {value} out of range (max {max})")]
    FieldRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// Node id 0 is only valid as an anonymous frame.
    #[error("message source must be a node id (1-127), got 0")]
    ZeroSource,

    /// A multi-frame transfer needs a signature the lookup does not know.
    #[error("no signature registered for frame 0x{id:08X}")]
    UnknownSignature { id: u32 },

    /// Bit stream failure while packing or unpacking an identifier.
    #[error("identifier codec error: {0}")]
    Dsdl(#[from] DsdlError),

    /// The link refused a frame.
    #[error("link error: {0}")]
    Link(#[from] LinkError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
