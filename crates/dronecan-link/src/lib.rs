//! CAN link-layer abstraction for DroneCAN.
//!
//! This is the lowest layer of the stack. It knows nothing about transfers or
//! data types; it moves [`CanFrame`]s (an identifier plus at most eight data
//! bytes) between nodes:
//! - [`Link`] is the outbound half every transport writes through
//! - [`VirtualBus`] is an in-memory broadcast medium with per-port subscriptions
//! - [`LinkReader`] / [`LinkWriter`] carry frames over any byte stream as
//!   16-byte SocketCAN `can_frame` records

pub mod bus;
pub mod error;
pub mod frame;
pub mod stream;
pub mod traits;

pub use bus::{BusPort, Subscription, VirtualBus};
pub use error::{LinkError, Result};
pub use frame::{CanFrame, MAX_DATA_LEN};
pub use stream::{decode_record, encode_record, LinkReader, LinkWriter, RECORD_SIZE};
pub use traits::Link;
