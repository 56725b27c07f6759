//! DroneCAN node.
//!
//! This is the "just works" layer. A [`Node`] owns a link, a transfer sender
//! and receiver, and a shared [`SchemaRegistry`](dronecan_schema::SchemaRegistry).
//! Broadcast messages, issue service requests and register handlers by type
//! name; feed it received frames with [`Node::handle_frame`] or
//! [`Node::process`].

pub mod config;
pub mod error;
pub mod node;

pub use config::{NodeConfig, DEFAULT_MAX_PENDING_REQUESTS, DEFAULT_REQUEST_TIMEOUT};
pub use error::{NodeError, Result};
pub use node::{HandlerId, Node, ReceivedMessage, ReceivedRequest, RequestHandle, RequestStatus};
