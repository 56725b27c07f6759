//! DroneCAN transport: frame identifiers, tail bytes, and transfers.
//!
//! A transfer is one serialized payload moved across the bus in one or more
//! link frames. Every frame carries:
//! - a 29-bit identifier ([`Frame`]) naming the type, source and destination
//! - a trailing tail byte ([`Tail`]) with start/end/toggle flags and the
//!   5-bit transfer id
//!
//! Payloads of up to seven bytes travel in a single frame. Longer ones are
//! prefixed with a 16-bit [`transfer_crc`](dronecan_dsdl::transfer_crc)
//! seeded by the type signature and split into seven-byte chunks.
//! [`TransferSender`] and [`TransferReceiver`] keep the per-stream state in
//! bounded [`StreamTable`]s.

pub mod config;
pub mod error;
pub mod id;
pub mod lookup;
pub mod priority;
pub mod receiver;
pub mod sender;
pub mod streams;
pub mod tail;

pub use config::{TransferConfig, DEFAULT_MAX_STREAMS, DEFAULT_TRANSFER_TIMEOUT};
pub use error::{FrameError, Result};
pub use id::{Frame, FrameKind, DEFAULT_PRIORITY, DEFAULT_RESERVED, MAX_NODE_ID};
pub use lookup::{SignatureLookup, SignatureTable};
pub use receiver::{Transfer, TransferReceiver};
pub use sender::{TransferSender, MAX_SINGLE_FRAME_PAYLOAD};
pub use streams::StreamTable;
pub use tail::{Tail, TRANSFER_ID_MODULO};
