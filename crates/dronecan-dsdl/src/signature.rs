//! 64-bit schema signatures.
//!
//! A signature is CRC-64/WE over a type's canonical schema text, extended by
//! folding in the signature of every nested composite field so that a layout
//! change anywhere in the dependency tree changes the root signature.

use crc::{Crc, CRC_64_WE};

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_WE);

/// CRC-64/WE of `data`.
pub fn crc64_we(data: &[u8]) -> u64 {
    CRC64.checksum(data)
}

/// Signature of `text` composed with `nested` signatures, in order.
///
/// Each step runs the same CRC over `nested ++ running` (both little-endian),
/// continuing from the running signature.
pub fn compose(text: &str, nested: &[u64]) -> u64 {
    nested.iter().fold(crc64_we(text.as_bytes()), |running, sig| {
        let mut digest = CRC64.digest_with_initial(running ^ u64::MAX);
        digest.update(&sig.to_le_bytes());
        digest.update(&running.to_le_bytes());
        digest.finalize()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE_STATUS: &str = "uavcan.protocol.NodeStatus\n\
        saturated uint32 uptime_sec\n\
        saturated uint2 health\n\
        saturated uint3 mode\n\
        saturated uint3 sub_mode\n\
        saturated uint16 vendor_specific_status_code";

    #[test]
    fn check_value() {
        assert_eq!(crc64_we(b"123456789"), 0x62EC_59E3_F1A4_F00A);
    }

    #[test]
    fn node_status_signature() {
        assert_eq!(compose(NODE_STATUS, &[]), 0x0F08_68D0_C1A7_C6F1);
    }

    #[test]
    fn composed_with_nested_signature() {
        let text = "test.Wrapper\nuavcan.protocol.NodeStatus status\nsaturated uint8 extra";
        assert_eq!(compose(text, &[0x0F08_68D0_C1A7_C6F1]), 0xF4D0_1E09_19FC_C421);
    }

    #[test]
    fn nested_order_matters() {
        let ab = compose("root", &[1, 2]);
        let ba = compose("root", &[2, 1]);
        assert_ne!(ab, ba);
        assert_ne!(compose("root", &[1]), compose("root", &[]));
    }
}
