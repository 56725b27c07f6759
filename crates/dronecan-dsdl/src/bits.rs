//! Bit-addressable cursors over byte buffers.
//!
//! Bits are packed most-significant-bit first within each byte and run
//! contiguously across field boundaries. A scalar is split into 8-bit groups
//! counting from its least-significant bit (the last group may be shorter);
//! groups go out lowest first and each group is written MSB first. Whole-byte
//! integers therefore land in standard little-endian order while sub-byte
//! fields still pack from the top of each byte.

use bytes::{Bytes, BytesMut};

use crate::error::{DsdlError, Result};

/// Largest bit count a single read or write may move.
pub const MAX_BIT_COUNT: u32 = 64;

fn check_count(count: u32) -> Result<()> {
    if count > MAX_BIT_COUNT {
        return Err(DsdlError::BitCount(count));
    }
    Ok(())
}

fn low_mask(count: u32) -> u64 {
    if count >= 64 {
        u64::MAX
    } else {
        (1u64 << count) - 1
    }
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: u32) -> i64 {
    if bits == 0 {
        return 0;
    }
    let shift = 64 - bits.min(64);
    ((value << shift) as i64) >> shift
}

/// Number of bits needed to hold any value in `0..=max`, i.e. `ceil(log2(max + 1))`.
pub fn bit_length(max: usize) -> u32 {
    usize::BITS - max.leading_zeros()
}

/// Read cursor over a borrowed byte slice.
///
/// Reads past the end yield zero bits rather than failing; use
/// [`is_empty`](Self::is_empty) or [`drain`](Self::drain) to detect the end of
/// the data.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn bit_at(&self, pos: usize) -> u8 {
        match self.data.get(pos / 8) {
            Some(byte) => (byte >> (7 - pos % 8)) & 1,
            None => 0,
        }
    }

    /// Read `count` bits (0..=64) as an unsigned value.
    pub fn read(&mut self, count: u32) -> Result<u64> {
        check_count(count)?;

        let mut value = 0u64;
        let mut consumed = 0u32;
        while consumed < count {
            let width = (count - consumed).min(8);
            let mut group = 0u64;
            for _ in 0..width {
                group = (group << 1) | u64::from(self.bit_at(self.offset));
                self.offset += 1;
            }
            value |= group << consumed;
            consumed += width;
        }

        Ok(value)
    }

    /// Return the unread byte-aligned remainder and mark the stream consumed.
    pub fn drain(&mut self) -> &'a [u8] {
        let start = (self.offset / 8).min(self.data.len());
        self.offset = self.data.len() * 8;
        &self.data[start..]
    }

    /// True once the cursor has reached or passed the end of the data.
    pub fn is_empty(&self) -> bool {
        self.offset >= self.data.len() * 8
    }

    /// Bits left before the end of the data.
    pub fn remaining_bits(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.offset)
    }

    /// Current cursor position in bits.
    pub fn position(&self) -> usize {
        self.offset
    }
}

/// Write cursor over a growable buffer.
///
/// The buffer grows lazily and is always at least `ceil(position / 8)` bytes
/// long; unwritten bits of the final byte are zero.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    buf: BytesMut,
    offset: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_bit(&mut self, pos: usize, bit: bool) {
        let mask = 1u8 << (7 - pos % 8);
        let byte = &mut self.buf[pos / 8];
        if bit {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// Write the low `count` bits (0..=64) of `value`.
    pub fn write(&mut self, count: u32, value: u64) -> Result<()> {
        check_count(count)?;

        let needed = (self.offset + count as usize).div_ceil(8);
        if self.buf.len() < needed {
            self.buf.resize(needed, 0);
        }

        let value = value & low_mask(count);
        let mut written = 0u32;
        while written < count {
            let width = (count - written).min(8);
            let group = (value >> written) & low_mask(width);
            for i in (0..width).rev() {
                self.set_bit(self.offset, (group >> i) & 1 == 1);
                self.offset += 1;
            }
            written += width;
        }

        Ok(())
    }

    /// Current cursor position in bits.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// The written bytes, final byte zero-padded on the low end.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.offset.div_ceil(8)]
    }

    /// Consume the writer, returning the written bytes.
    pub fn into_bytes(mut self) -> Bytes {
        self.buf.truncate(self.offset.div_ceil(8));
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_bytes_are_little_endian() {
        let mut w = BitWriter::new();
        w.write(32, 0x1234_5678).unwrap();
        assert_eq!(w.as_bytes(), &[0x78, 0x56, 0x34, 0x12]);

        let mut r = BitReader::new(w.as_bytes());
        assert_eq!(r.read(32).unwrap(), 0x1234_5678);
        assert!(r.is_empty());
    }

    #[test]
    fn sub_byte_fields_pack_from_the_top() {
        let mut w = BitWriter::new();
        w.write(1, 1).unwrap();
        w.write(3, 0b010).unwrap();
        assert_eq!(w.as_bytes(), &[0b1010_0000]);
    }

    #[test]
    fn unaligned_byte_straddles_boundary() {
        let mut w = BitWriter::new();
        w.write(1, 1).unwrap();
        w.write(8, 0x43).unwrap();
        assert_eq!(w.as_bytes(), &[0xA1, 0x80]);

        let mut r = BitReader::new(w.as_bytes());
        assert_eq!(r.read(1).unwrap(), 1);
        assert_eq!(r.read(8).unwrap(), 0x43);
    }

    #[test]
    fn short_last_group_is_msb_first() {
        let mut w = BitWriter::new();
        w.write(12, 0xABC).unwrap();
        // 0xBC first, then the 4-bit group 0xA in the top nibble.
        assert_eq!(w.as_bytes(), &[0xBC, 0xA0]);

        let mut r = BitReader::new(w.as_bytes());
        assert_eq!(r.read(12).unwrap(), 0xABC);
    }

    #[test]
    fn full_width_values() {
        let mut w = BitWriter::new();
        w.write(3, 0b101).unwrap();
        w.write(64, u64::MAX - 1).unwrap();

        let mut r = BitReader::new(w.as_bytes());
        assert_eq!(r.read(3).unwrap(), 0b101);
        assert_eq!(r.read(64).unwrap(), u64::MAX - 1);
    }

    #[test]
    fn write_truncates_to_width() {
        let mut w = BitWriter::new();
        w.write(4, 0xFF).unwrap();
        assert_eq!(w.as_bytes(), &[0xF0]);
    }

    #[test]
    fn zero_bit_operations() {
        let mut w = BitWriter::new();
        w.write(0, 123).unwrap();
        assert!(w.as_bytes().is_empty());

        let mut r = BitReader::new(&[0xFF]);
        assert_eq!(r.read(0).unwrap(), 0);
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn rejects_more_than_64_bits() {
        let mut w = BitWriter::new();
        assert!(matches!(w.write(65, 0), Err(DsdlError::BitCount(65))));
        let mut r = BitReader::new(&[]);
        assert!(matches!(r.read(65), Err(DsdlError::BitCount(65))));
    }

    #[test]
    fn reads_past_end_are_zero_filled() {
        let mut r = BitReader::new(&[0xFF]);
        assert_eq!(r.read(4).unwrap(), 0xF);
        assert_eq!(r.read(8).unwrap(), 0xF0);
        assert!(r.is_empty());
        assert_eq!(r.read(8).unwrap(), 0);
    }

    #[test]
    fn drain_returns_byte_aligned_remainder() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut r = BitReader::new(&data);
        r.read(16).unwrap();
        assert_eq!(r.drain(), &[0x03, 0x04]);
        assert!(r.is_empty());
        assert!(r.drain().is_empty());
    }

    #[test]
    fn overwriting_never_happens_and_buffer_tracks_cursor() {
        let mut w = BitWriter::new();
        w.write(9, 0).unwrap();
        assert_eq!(w.as_bytes().len(), 2);
        assert_eq!(w.position(), 9);
        assert_eq!(w.into_bytes().as_ref(), &[0, 0]);
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0b111, 3), -1);
        assert_eq!(sign_extend(0b011, 3), 3);
        assert_eq!(sign_extend(u64::MAX, 64), -1);
        assert_eq!(sign_extend(0, 0), 0);
    }

    #[test]
    fn bit_length_matches_ceil_log2() {
        assert_eq!(bit_length(0), 0);
        assert_eq!(bit_length(1), 1);
        assert_eq!(bit_length(7), 3);
        assert_eq!(bit_length(8), 4);
        assert_eq!(bit_length(255), 8);
    }
}
