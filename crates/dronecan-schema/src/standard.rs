//! Well-known protocol types.

use std::sync::Arc;

use dronecan_dsdl::{Field, MessageType, TypeDefinition};

use crate::error::Result;
use crate::registry::SchemaRegistry;

/// Message id of `uavcan.protocol.NodeStatus`.
pub const NODE_STATUS_ID: u16 = 341;

/// `uavcan.protocol.NodeStatus`: the periodic heartbeat every node
/// broadcasts. `health` and `mode` decode to their symbolic names.
pub fn node_status() -> MessageType {
    MessageType::new(
        "uavcan.protocol.NodeStatus",
        Some(NODE_STATUS_ID),
        TypeDefinition::structure()
            .field("uptimeSec", Field::uint(32))
            .field(
                "health",
                Field::mapped(
                    Field::uint(2),
                    [("OK", 0u8), ("WARNING", 1), ("ERROR", 2), ("CRITICAL", 3)],
                ),
            )
            .field(
                "mode",
                Field::mapped(
                    Field::uint(3),
                    [
                        ("OPERATIONAL", 0u8),
                        ("INITIALIZATION", 1),
                        ("MAINTENANCE", 2),
                        ("SOFTWARE_UPDATE", 3),
                        ("OFFLINE", 7),
                    ],
                ),
            )
            .field("subMode", Field::uint(3))
            .field("vendorSpecificStatusCode", Field::uint(16)),
    )
}

/// Register every well-known type.
pub fn register_all(registry: &mut SchemaRegistry) -> Result<()> {
    registry.register_message(Arc::new(node_status()))
}
