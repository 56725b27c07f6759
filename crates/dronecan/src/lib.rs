//! DroneCAN data type serialization and CAN transfer protocol.
//!
//! # Crate Structure
//!
//! - [`link`]: CAN frames, the [`Link`](link::Link) trait, virtual bus, SocketCAN records
//! - [`dsdl`]: bit streams, field codecs, type definitions, signatures
//! - [`frame`]: frame identifiers, tail bytes, transfer segmentation and reassembly
//! - [`schema`]: id- and name-keyed type registry
//! - [`node`]: broadcast, request/response and handler dispatch (behind `node` feature)

/// Re-export link types.
pub mod link {
    pub use dronecan_link::*;
}

/// Re-export serialization types.
pub mod dsdl {
    pub use dronecan_dsdl::*;
}

/// Re-export transport types.
pub mod frame {
    pub use dronecan_frame::*;
}

/// Re-export registry types.
pub mod schema {
    pub use dronecan_schema::*;
}

/// Re-export node types (requires `node` feature).
#[cfg(feature = "node")]
pub mod node {
    pub use dronecan_node::*;
}
