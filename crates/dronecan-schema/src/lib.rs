//! Registry of DroneCAN message and service types.
//!
//! Maps numeric type ids and full type names to their definitions and
//! signatures. The registry is the [`SignatureLookup`](dronecan_frame::SignatureLookup)
//! the transfer layer consults, and offers encode/decode helpers that turn a
//! bad payload into a logged `None` instead of an error.

pub mod codec;
pub mod config;
pub mod error;
pub mod registry;
pub mod standard;

pub use config::RegistryConfig;
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;
