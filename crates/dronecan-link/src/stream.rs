//! SocketCAN `can_frame` records over arbitrary byte streams.
//!
//! Record layout (16 bytes, little-endian):
//! ```text
//! ┌──────────────┬─────────┬───────────┬──────────────────────┐
//! │ can_id (4B)  │ len (1) │ pad (3B)  │ data (8B, zero-fill) │
//! └──────────────┴─────────┴───────────┴──────────────────────┘
//! ```
//! This is the in-memory layout of Linux `struct can_frame`, so captures taken
//! with a raw CAN socket can be replayed directly.

use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{LinkError, Result};
use crate::frame::{CanFrame, MAX_DATA_LEN};
use crate::traits::Link;

/// Size of one SocketCAN record.
pub const RECORD_SIZE: usize = 16;

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Append one frame to `dst` as a SocketCAN record.
pub fn encode_record(frame: &CanFrame, dst: &mut BytesMut) {
    let data = frame.data();
    dst.reserve(RECORD_SIZE);
    dst.put_u32_le(frame.id());
    // CanFrame guarantees at most eight data bytes.
    dst.put_u8(data.len() as u8);
    dst.put_bytes(0, 3);
    dst.put_slice(data);
    dst.put_bytes(0, MAX_DATA_LEN - data.len());
}

/// Decode one record from the front of `src`.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete record yet.
/// On success, consumes the record bytes from the buffer.
pub fn decode_record(src: &mut BytesMut) -> Result<Option<CanFrame>> {
    if src.len() < RECORD_SIZE {
        return Ok(None);
    }

    let mut record = src.split_to(RECORD_SIZE);
    let id = record.get_u32_le();
    let len = record.get_u8();
    if usize::from(len) > MAX_DATA_LEN {
        return Err(LinkError::InvalidLength(len));
    }
    record.advance(3);
    let data: Bytes = record.split_to(usize::from(len)).freeze();

    CanFrame::new(id, data).map(Some)
}

/// Reads whole frames from any `Read` stream of SocketCAN records.
///
/// Handles partial reads internally; callers always get complete frames.
pub struct LinkReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> LinkReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Read the next frame (blocking).
    ///
    /// Returns `Ok(None)` on a clean end of stream and
    /// `Err(LinkError::ConnectionClosed)` if the stream ends mid-record.
    pub fn read_frame(&mut self) -> Result<Option<CanFrame>> {
        loop {
            if let Some(frame) = decode_record(&mut self.buf)? {
                return Ok(Some(frame));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(LinkError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(LinkError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for LinkReader<T> {
    type Item = Result<CanFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

/// Writes frames to any `Write` stream as SocketCAN records.
pub struct LinkWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> LinkWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(RECORD_SIZE),
        }
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(LinkError::Io(err)),
            }
        }
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Write> Link for LinkWriter<T> {
    fn write(&mut self, frame: CanFrame) -> Result<()> {
        self.buf.clear();
        encode_record(&frame, &mut self.buf);
        trace!(id = frame.id(), len = frame.data().len(), "writing record");

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(LinkError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(LinkError::Io(err)),
            }
        }

        self.flush()
    }
}
