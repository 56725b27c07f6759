use bytes::Bytes;

use crate::error::{LinkError, Result};

/// Maximum data bytes in one classic CAN frame.
pub const MAX_DATA_LEN: usize = 8;

/// One link-layer frame: an identifier and up to eight data bytes.
///
/// The identifier is the full 32-bit value produced by the DroneCAN frame
/// codec. Its low 29 bits are the CAN arbitration field; the three bits above
/// it are the frame's reserved field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    id: u32,
    data: Bytes,
}

impl CanFrame {
    /// Create a frame, rejecting more than [`MAX_DATA_LEN`] data bytes.
    pub fn new(id: u32, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() > MAX_DATA_LEN {
            return Err(LinkError::DataTooLong {
                len: data.len(),
                max: MAX_DATA_LEN,
            });
        }
        Ok(Self { id, data })
    }

    /// The frame identifier.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The frame data bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Split the frame into identifier and data.
    pub fn into_parts(self) -> (u32, Bytes) {
        (self.id, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_up_to_eight_bytes() {
        let frame = CanFrame::new(0x9001_550A, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(frame.id(), 0x9001_550A);
        assert_eq!(frame.data(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn accepts_empty_data() {
        let frame = CanFrame::new(1, Bytes::new()).unwrap();
        assert!(frame.data().is_empty());
    }

    #[test]
    fn rejects_nine_bytes() {
        let err = CanFrame::new(1, vec![0u8; 9]).unwrap_err();
        assert!(matches!(err, LinkError::DataTooLong { len: 9, max: 8 }));
    }
}
