use std::collections::HashMap;
use std::sync::Arc;

use crate::id::Frame;

/// Resolves the schema signature seeding a frame's transfer CRC.
pub trait SignatureLookup {
    /// Signature of the type carried by `frame`, if known.
    fn signature_for(&self, frame: &Frame) -> Option<u64>;
}

impl<T: SignatureLookup + ?Sized> SignatureLookup for &T {
    fn signature_for(&self, frame: &Frame) -> Option<u64> {
        (**self).signature_for(frame)
    }
}

impl<T: SignatureLookup + ?Sized> SignatureLookup for Arc<T> {
    fn signature_for(&self, frame: &Frame) -> Option<u64> {
        (**self).signature_for(frame)
    }
}

/// Plain id-to-signature table.
///
/// Message and service ids live in separate spaces. Anonymous frames resolve
/// through the message table using their (truncated) id.
#[derive(Debug, Clone, Default)]
pub struct SignatureTable {
    messages: HashMap<u16, u64>,
    services: HashMap<u8, u64>,
}

impl SignatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, id: u16, signature: u64) -> Self {
        self.insert_message(id, signature);
        self
    }

    pub fn with_service(mut self, id: u8, signature: u64) -> Self {
        self.insert_service(id, signature);
        self
    }

    pub fn insert_message(&mut self, id: u16, signature: u64) -> Option<u64> {
        self.messages.insert(id, signature)
    }

    pub fn insert_service(&mut self, id: u8, signature: u64) -> Option<u64> {
        self.services.insert(id, signature)
    }

    pub fn len(&self) -> usize {
        self.messages.len() + self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SignatureLookup for SignatureTable {
    fn signature_for(&self, frame: &Frame) -> Option<u64> {
        match frame {
            Frame::Message { id, .. } => self.messages.get(id).copied(),
            Frame::Anonymous { id, .. } => self.messages.get(&u16::from(*id)).copied(),
            Frame::Service { id, .. } => self.services.get(id).copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_and_service_spaces_are_separate() {
        let table = SignatureTable::new().with_message(1, 0xAA).with_service(1, 0xBB);
        assert_eq!(table.signature_for(&Frame::message(5, 1)), Some(0xAA));
        assert_eq!(table.signature_for(&Frame::request(5, 6, 1)), Some(0xBB));
        assert_eq!(table.signature_for(&Frame::message(5, 2)), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn shared_lookup() {
        let table = Arc::new(SignatureTable::new().with_message(3, 7));
        assert_eq!(table.signature_for(&Frame::anonymous(0, 3)), Some(7));
    }
}
