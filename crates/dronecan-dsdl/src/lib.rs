//! DroneCAN data type serialization.
//!
//! Turns typed message/request/response definitions into exact bit layouts
//! and back, and computes the signatures that let two nodes detect a layout
//! mismatch:
//! - [`BitReader`] / [`BitWriter`] implement the wire bit order
//! - [`field`] is the codec combinator library
//! - [`TypeDefinition`] evaluates an ordered set of named fields (or a union)
//! - [`MessageType`] / [`ServiceType`] carry canonical schema text and signature
//! - [`signature`] and [`crc`] hold the two CRC constructions

pub mod bits;
pub mod crc;
pub mod definition;
pub mod error;
pub mod field;
pub mod signature;
pub mod types;
pub mod value;

pub use bits::{BitReader, BitWriter, MAX_BIT_COUNT};
pub use crc::transfer_crc;
pub use definition::{FieldNaming, TypeDefinition};
pub use error::{DsdlError, Result};
pub use field::{Cast, Field};
pub use signature::{compose, crc64_we};
pub use types::{MessageType, ServiceType};
pub use value::{Composite, UnionValue, Value};
