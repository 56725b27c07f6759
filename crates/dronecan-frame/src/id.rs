//! Frame identifier codec.
//!
//! Identifier layout, read MSB-first through the DSDL bit order over the
//! little-endian bytes of the 32-bit value:
//!
//! ```text
//! bit  0      service flag
//! bits 1-7    source node id (0 = anonymous)
//! service:    bit 8 request flag, bits 9-15 destination, bits 16-23 service id
//! anonymous:  bits 8-21 discriminator, bits 22-23 message id (low two bits)
//! message:    bits 8-23 message id
//! bits 24-26  reserved (default 0b100)
//! bits 27-31  priority (default 16)
//! ```
//!
//! The reserved field lands in the top three bits of the value, above the
//! 29-bit arbitration field; its default sets the SocketCAN extended-frame
//! flag.

use std::fmt;

use dronecan_dsdl::{BitReader, BitWriter};
use serde::Serialize;

use crate::error::{FrameError, Result};
use crate::priority::MEDIUM;

/// Largest node id.
pub const MAX_NODE_ID: u8 = 127;

/// Priority used when a frame does not specify one.
pub const DEFAULT_PRIORITY: u8 = MEDIUM;

/// Reserved bits used when a frame does not specify them.
pub const DEFAULT_RESERVED: u8 = 0b100;

const MAX_DISCRIMINATOR: u16 = (1 << 14) - 1;
const MAX_ANONYMOUS_ID: u8 = 0b11;
const MAX_RESERVED: u8 = 0b111;
const MAX_PRIORITY: u8 = 31;

/// Which of the three identifier layouts a frame uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Message,
    Anonymous,
    Service,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Message => f.write_str("message"),
            FrameKind::Anonymous => f.write_str("anonymous"),
            FrameKind::Service => f.write_str("service"),
        }
    }
}

/// A decoded frame identifier.
///
/// `priority` and `reserved` are optional on construction; encoding fills in
/// [`DEFAULT_PRIORITY`] and [`DEFAULT_RESERVED`]. Decoding always yields
/// `Some`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    Message {
        source: u8,
        id: u16,
        priority: Option<u8>,
        reserved: Option<u8>,
    },
    /// Sent before a node has an id; the source is always 0.
    Anonymous {
        discriminator: u16,
        id: u8,
        priority: Option<u8>,
        reserved: Option<u8>,
    },
    Service {
        source: u8,
        destination: u8,
        request: bool,
        id: u8,
        priority: Option<u8>,
        reserved: Option<u8>,
    },
}

impl Frame {
    /// Broadcast message from `source` with default priority.
    pub fn message(source: u8, id: u16) -> Self {
        Frame::Message {
            source,
            id,
            priority: None,
            reserved: None,
        }
    }

    pub fn anonymous(discriminator: u16, id: u8) -> Self {
        Frame::Anonymous {
            discriminator,
            id,
            priority: None,
            reserved: None,
        }
    }

    pub fn request(source: u8, destination: u8, id: u8) -> Self {
        Self::service(source, destination, true, id)
    }

    pub fn response(source: u8, destination: u8, id: u8) -> Self {
        Self::service(source, destination, false, id)
    }

    fn service(source: u8, destination: u8, request: bool, id: u8) -> Self {
        Frame::Service {
            source,
            destination,
            request,
            id,
            priority: None,
            reserved: None,
        }
    }

    /// Same frame with an explicit priority.
    pub fn with_priority(mut self, value: u8) -> Self {
        match &mut self {
            Frame::Message { priority, .. }
            | Frame::Anonymous { priority, .. }
            | Frame::Service { priority, .. } => *priority = Some(value),
        }
        self
    }

    /// Same frame with explicit reserved bits.
    pub fn with_reserved(mut self, value: u8) -> Self {
        match &mut self {
            Frame::Message { reserved, .. }
            | Frame::Anonymous { reserved, .. }
            | Frame::Service { reserved, .. } => *reserved = Some(value),
        }
        self
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Message { .. } => FrameKind::Message,
            Frame::Anonymous { .. } => FrameKind::Anonymous,
            Frame::Service { .. } => FrameKind::Service,
        }
    }

    /// Message or service type id.
    pub fn type_id(&self) -> u16 {
        match self {
            Frame::Message { id, .. } => *id,
            Frame::Anonymous { id, .. } | Frame::Service { id, .. } => u16::from(*id),
        }
    }

    /// Source node id; 0 for anonymous frames.
    pub fn source(&self) -> u8 {
        match self {
            Frame::Message { source, .. } | Frame::Service { source, .. } => *source,
            Frame::Anonymous { .. } => 0,
        }
    }

    /// Destination node id of a service frame.
    pub fn destination(&self) -> Option<u8> {
        match self {
            Frame::Service { destination, .. } => Some(*destination),
            _ => None,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Frame::Service { request: true, .. })
    }

    pub fn priority(&self) -> u8 {
        match self {
            Frame::Message { priority, .. }
            | Frame::Anonymous { priority, .. }
            | Frame::Service { priority, .. } => priority.unwrap_or(DEFAULT_PRIORITY),
        }
    }

    pub fn reserved(&self) -> u8 {
        match self {
            Frame::Message { reserved, .. }
            | Frame::Anonymous { reserved, .. }
            | Frame::Service { reserved, .. } => reserved.unwrap_or(DEFAULT_RESERVED),
        }
    }

    /// Pack into a 32-bit identifier.
    pub fn encode(&self) -> Result<u32> {
        let mut bits = BitWriter::new();
        match *self {
            Frame::Service {
                source,
                destination,
                request,
                id,
                ..
            } => {
                check("source", source, MAX_NODE_ID)?;
                check("destination", destination, MAX_NODE_ID)?;
                bits.write(1, 1)?;
                bits.write(7, u64::from(source))?;
                bits.write(1, u64::from(request))?;
                bits.write(7, u64::from(destination))?;
                bits.write(8, u64::from(id))?;
            }
            Frame::Anonymous {
                discriminator, id, ..
            } => {
                check("discriminator", discriminator, MAX_DISCRIMINATOR)?;
                check("anonymous id", id, MAX_ANONYMOUS_ID)?;
                bits.write(1, 0)?;
                bits.write(7, 0)?;
                bits.write(14, u64::from(discriminator))?;
                bits.write(2, u64::from(id))?;
            }
            Frame::Message { source, id, .. } => {
                if source == 0 {
                    return Err(FrameError::ZeroSource);
                }
                check("source", source, MAX_NODE_ID)?;
                bits.write(1, 0)?;
                bits.write(7, u64::from(source))?;
                bits.write(16, u64::from(id))?;
            }
        }

        let reserved = self.reserved();
        let priority = self.priority();
        check("reserved", reserved, MAX_RESERVED)?;
        check("priority", priority, MAX_PRIORITY)?;
        bits.write(3, u64::from(reserved))?;
        bits.write(5, u64::from(priority))?;

        let mut raw = [0u8; 4];
        raw.copy_from_slice(bits.as_bytes());
        Ok(u32::from_le_bytes(raw))
    }

    /// Unpack a 32-bit identifier.
    pub fn decode(value: u32) -> Result<Self> {
        let raw = value.to_le_bytes();
        let mut bits = BitReader::new(&raw);

        let service = bits.read(1)? != 0;
        let source = bits.read(7)? as u8;

        let frame = if service {
            let request = bits.read(1)? != 0;
            let destination = bits.read(7)? as u8;
            let id = bits.read(8)? as u8;
            let reserved = Some(bits.read(3)? as u8);
            let priority = Some(bits.read(5)? as u8);
            Frame::Service {
                source,
                destination,
                request,
                id,
                priority,
                reserved,
            }
        } else if source == 0 {
            let discriminator = bits.read(14)? as u16;
            let id = bits.read(2)? as u8;
            let reserved = Some(bits.read(3)? as u8);
            let priority = Some(bits.read(5)? as u8);
            Frame::Anonymous {
                discriminator,
                id,
                priority,
                reserved,
            }
        } else {
            let id = bits.read(16)? as u16;
            let reserved = Some(bits.read(3)? as u8);
            let priority = Some(bits.read(5)? as u8);
            Frame::Message {
                source,
                id,
                priority,
                reserved,
            }
        };
        Ok(frame)
    }
}

fn check<T: Into<u64>>(field: &'static str, value: T, max: T) -> Result<()> {
    let value = value.into();
    let max = max.into();
    if value > max {
        return Err(FrameError::FieldRange { field, value, max });
    }
    Ok(())
}
