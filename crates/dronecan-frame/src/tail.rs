//! Tail byte codec.
//!
//! ```text
//! bit 7    start of transfer
//! bit 6    end of transfer
//! bit 5    toggle
//! bits 4-0 transfer id
//! ```

use serde::Serialize;

/// Transfer ids wrap at this value.
pub const TRANSFER_ID_MODULO: u8 = 32;

const START: u8 = 0x80;
const END: u8 = 0x40;
const TOGGLE: u8 = 0x20;
const TRANSFER_ID_MASK: u8 = 0x1F;

/// Per-frame segmentation metadata, carried as the last data byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Tail {
    pub transfer_id: u8,
    pub toggle: bool,
    pub start: bool,
    pub end: bool,
}

impl Tail {
    /// Tail of a transfer that fits in one frame.
    pub fn single(transfer_id: u8) -> Self {
        Self {
            transfer_id,
            toggle: false,
            start: true,
            end: true,
        }
    }

    /// Pack into one byte. The transfer id is taken modulo 32.
    pub fn encode(&self) -> u8 {
        let mut byte = self.transfer_id % TRANSFER_ID_MODULO;
        if self.start {
            byte |= START;
        }
        if self.end {
            byte |= END;
        }
        if self.toggle {
            byte |= TOGGLE;
        }
        byte
    }

    pub fn decode(byte: u8) -> Self {
        Self {
            transfer_id: byte & TRANSFER_ID_MASK,
            toggle: byte & TOGGLE != 0,
            start: byte & START != 0,
            end: byte & END != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_tail() {
        assert_eq!(Tail::single(3).encode(), 0xC3);
    }

    #[test]
    fn flag_bits() {
        let tail = Tail::decode(0b1010_0111);
        assert!(tail.start);
        assert!(!tail.end);
        assert!(tail.toggle);
        assert_eq!(tail.transfer_id, 7);
    }

    #[test]
    fn transfer_id_wraps() {
        let tail = Tail {
            transfer_id: 33,
            ..Tail::default()
        };
        assert_eq!(tail.encode(), 1);
    }

    #[test]
    fn every_combination_round_trips() {
        for transfer_id in 0..TRANSFER_ID_MODULO {
            for flags in 0..8u8 {
                let tail = Tail {
                    transfer_id,
                    start: flags & 1 != 0,
                    end: flags & 2 != 0,
                    toggle: flags & 4 != 0,
                };
                assert_eq!(Tail::decode(tail.encode()), tail);
            }
        }
    }

    #[test]
    fn every_byte_round_trips() {
        for byte in 0..=u8::MAX {
            assert_eq!(Tail::decode(byte).encode(), byte);
        }
    }
}
