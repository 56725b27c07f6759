//! 16-bit transfer CRC.

use crc::{Crc, CRC_16_IBM_3740};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// CRC-16/IBM-3740 over `signature` (little-endian) followed by `payload`.
///
/// Only the result goes on the wire; the signature is known to both ends
/// from the schema.
pub fn transfer_crc(signature: u64, payload: &[u8]) -> u16 {
    let mut digest = CRC16.digest();
    digest.update(&signature.to_le_bytes());
    digest.update(payload);
    digest.finalize()
}
