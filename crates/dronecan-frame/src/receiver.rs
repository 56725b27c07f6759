use std::time::Instant;

use bytes::{Bytes, BytesMut};
use dronecan_dsdl::transfer_crc;
use dronecan_link::CanFrame;
use tracing::{debug, trace, warn};

use crate::config::TransferConfig;
use crate::id::{Frame, FrameKind};
use crate::lookup::SignatureLookup;
use crate::streams::StreamTable;
use crate::tail::Tail;

/// One completed, validated transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Identifier of the transfer's frames.
    pub frame: Frame,
    /// Reassembled payload, transfer CRC removed.
    pub payload: Bytes,
    pub transfer_id: u8,
}

/// Identity of one in-flight transfer.
///
/// Concurrent transfers that share a link identifier are told apart by
/// source (or discriminator), destination, direction and transfer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct StreamKey {
    kind: FrameKind,
    type_id: u16,
    source: u16,
    destination: u8,
    request: bool,
    transfer_id: u8,
}

impl StreamKey {
    fn new(frame: &Frame, transfer_id: u8) -> Self {
        let source = match frame {
            Frame::Anonymous { discriminator, .. } => *discriminator,
            other => u16::from(other.source()),
        };
        Self {
            kind: frame.kind(),
            type_id: frame.type_id(),
            source,
            destination: frame.destination().unwrap_or(0),
            request: frame.is_request(),
            transfer_id,
        }
    }
}

#[derive(Debug)]
struct Partial {
    payload: BytesMut,
    toggle: bool,
}

/// Reassembles link frames into transfers.
///
/// Faults in received traffic are never errors: the affected transfer is
/// dropped, logged, and the next frame is processed normally.
pub struct TransferReceiver<S> {
    lookup: S,
    config: TransferConfig,
    streams: StreamTable<StreamKey, Partial>,
}

impl<S: SignatureLookup> TransferReceiver<S> {
    pub fn new(lookup: S) -> Self {
        Self::with_config(lookup, TransferConfig::default())
    }

    pub fn with_config(lookup: S, config: TransferConfig) -> Self {
        let streams = StreamTable::new(config.max_streams);
        Self {
            lookup,
            config,
            streams,
        }
    }

    /// Feed one frame received now. See [`read_at`](Self::read_at).
    pub fn read(&mut self, frame: &CanFrame) -> Option<Transfer> {
        self.read_at(Instant::now(), frame)
    }

    /// Feed one frame received at `now`; returns a transfer when this frame
    /// completes one.
    pub fn read_at(&mut self, now: Instant, frame: &CanFrame) -> Option<Transfer> {
        let Some((&tail_byte, body)) = frame.data().split_last() else {
            debug!(id = frame.id(), "empty frame dropped");
            return None;
        };
        let header = match Frame::decode(frame.id()) {
            Ok(header) => header,
            Err(err) => {
                debug!(id = frame.id(), error = %err, "undecodable identifier dropped");
                return None;
            }
        };
        let tail = Tail::decode(tail_byte);
        let key = StreamKey::new(&header, tail.transfer_id);

        let reset = match (self.streams.get(&key), self.streams.idle_for(&key, now)) {
            (Some(_), Some(idle)) if idle > self.config.transfer_timeout => {
                debug!(id = frame.id(), transfer_id = tail.transfer_id, ?idle, "stale transfer discarded");
                true
            }
            (Some(partial), _) if partial.toggle != tail.toggle => {
                debug!(id = frame.id(), transfer_id = tail.transfer_id, "toggle mismatch; transfer discarded");
                true
            }
            (Some(_), _) if tail.start => {
                debug!(id = frame.id(), transfer_id = tail.transfer_id, "transfer restarted");
                true
            }
            (Some(_), _) => false,
            (None, _) => true,
        };

        if reset {
            self.streams.remove(&key);
            if !tail.start {
                trace!(id = frame.id(), transfer_id = tail.transfer_id, "frame outside a transfer dropped");
                return None;
            }
            let partial = Partial {
                payload: BytesMut::new(),
                toggle: tail.toggle,
            };
            self.streams.insert(key, partial, now);
        }

        let partial = self.streams.get_mut(&key)?;
        partial.payload.extend_from_slice(body);
        partial.toggle = !partial.toggle;
        self.streams.touch(&key, now);

        if !tail.end {
            return None;
        }

        let payload = self.streams.remove(&key)?.payload.freeze();
        if tail.start {
            trace!(id = frame.id(), transfer_id = tail.transfer_id, len = payload.len(), "single-frame transfer");
            return Some(Transfer {
                frame: header,
                payload,
                transfer_id: tail.transfer_id,
            });
        }

        self.verify(header, payload, tail.transfer_id)
    }

    fn verify(&self, header: Frame, mut payload: Bytes, transfer_id: u8) -> Option<Transfer> {
        if payload.len() < 2 {
            warn!(?header, transfer_id, "multi-frame transfer too short for its CRC");
            return None;
        }
        let body = payload.split_off(2);
        let expected = u16::from_le_bytes([payload[0], payload[1]]);

        let Some(signature) = self.lookup.signature_for(&header) else {
            warn!(?header, transfer_id, "no signature for multi-frame transfer; dropped");
            return None;
        };
        let actual = transfer_crc(signature, &body);
        if actual != expected {
            warn!(?header, transfer_id, expected, actual, "transfer CRC mismatch; dropped");
            return None;
        }

        trace!(?header, transfer_id, len = body.len(), "multi-frame transfer");
        Some(Transfer {
            frame: header,
            payload: body,
            transfer_id,
        })
    }

    /// Drop partial transfers idle past the transfer timeout.
    pub fn sweep(&mut self, now: Instant) -> usize {
        self.streams.sweep(now, self.config.transfer_timeout)
    }

    /// Number of partial transfers in progress.
    pub fn pending(&self) -> usize {
        self.streams.len()
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub fn lookup(&self) -> &S {
        &self.lookup
    }
}

impl<S> std::fmt::Debug for TransferReceiver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferReceiver")
            .field("config", &self.config)
            .field("pending", &self.streams.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::lookup::SignatureTable;
    use crate::sender::TransferSender;

    const SIG: u64 = 0x0F08_68D0_C1A7_C6F1;

    fn table() -> SignatureTable {
        SignatureTable::new().with_message(341, SIG).with_service(1, SIG)
    }

    fn segment(frame: &Frame, payload: &[u8], transfer_id: Option<u8>) -> Vec<CanFrame> {
        let mut tx = TransferSender::new(Vec::new(), table());
        tx.send(frame, payload, transfer_id).unwrap();
        tx.into_inner()
    }

    fn feed(rx: &mut TransferReceiver<SignatureTable>, at: Instant, frames: &[CanFrame]) -> Vec<Transfer> {
        frames.iter().filter_map(|f| rx.read_at(at, f)).collect()
    }

    #[test]
    fn single_frame_delivered_without_crc() {
        let frame = Frame::message(10, 999);
        let frames = segment(&frame, &[9, 8, 7], Some(4));
        let mut rx = TransferReceiver::new(SignatureTable::new());
        let got = feed(&mut rx, Instant::now(), &frames);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].payload.as_ref(), &[9, 8, 7]);
        assert_eq!(got[0].transfer_id, 4);
        assert_eq!(got[0].frame, frame.with_priority(16).with_reserved(4));
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn multi_frame_reassembles() {
        let payload: Vec<u8> = (0..50).collect();
        let frames = segment(&Frame::message(10, 341), &payload, None);
        let mut rx = TransferReceiver::new(table());
        let got = feed(&mut rx, Instant::now(), &frames);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].payload.as_ref(), payload.as_slice());
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn corrupted_byte_is_dropped() {
        let payload: Vec<u8> = (0..30).collect();
        let frames = segment(&Frame::message(10, 341), &payload, None);
        for index in 0..frames.len() {
            let body_len = frames[index].data().len() - 1;
            for byte in 0..body_len {
                let mut corrupted = frames.clone();
                let (id, data) = corrupted[index].clone().into_parts();
                let mut data = data.to_vec();
                data[byte] ^= 0x01;
                corrupted[index] = CanFrame::new(id, data).unwrap();

                let mut rx = TransferReceiver::new(table());
                assert!(feed(&mut rx, Instant::now(), &corrupted).is_empty());
            }
        }
    }

    #[test]
    fn unknown_signature_is_dropped() {
        let frames = segment(&Frame::message(10, 341), &[0; 20], None);
        let mut rx = TransferReceiver::new(SignatureTable::new());
        assert!(feed(&mut rx, Instant::now(), &frames).is_empty());
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn wrong_signature_is_dropped() {
        let frames = segment(&Frame::message(10, 341), &[0; 20], None);
        let mut rx = TransferReceiver::new(SignatureTable::new().with_message(341, SIG ^ 1));
        assert!(feed(&mut rx, Instant::now(), &frames).is_empty());
    }

    #[test]
    fn lost_frame_breaks_toggle_sequence() {
        let frames = segment(&Frame::message(10, 341), &[1; 30], None);
        let mut rx = TransferReceiver::new(table());
        let mut lossy = frames.clone();
        lossy.remove(1);
        assert!(feed(&mut rx, Instant::now(), &lossy).is_empty());
    }

    #[test]
    fn idle_gap_does_not_bleed_into_next_transfer() {
        let frame = Frame::message(10, 341);
        let first = segment(&frame, &[0xAA; 30], Some(3));
        let second = segment(&frame, &[0xBB; 30], Some(3));
        let mut rx = TransferReceiver::new(table());
        let t0 = Instant::now();

        // Abandon the first transfer halfway through.
        assert!(feed(&mut rx, t0, &first[..2]).is_empty());
        assert_eq!(rx.pending(), 1);

        let later = t0 + Duration::from_millis(2500);
        let got = feed(&mut rx, later, &second);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].payload.as_ref(), &[0xBB; 30]);
    }

    #[test]
    fn stale_continuation_is_discarded() {
        let frame = Frame::message(10, 341);
        let frames = segment(&frame, &[0xCC; 30], None);
        let mut rx = TransferReceiver::new(table());
        let t0 = Instant::now();

        assert!(feed(&mut rx, t0, &frames[..1]).is_empty());
        let later = t0 + Duration::from_millis(2001);
        assert!(feed(&mut rx, later, &frames[1..]).is_empty());
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn interleaved_sources_are_separate_streams() {
        let a = segment(&Frame::message(10, 341), &[0xA0; 20], None);
        let b = segment(&Frame::message(11, 341), &[0xB0; 20], None);
        let mut interleaved = Vec::new();
        for (fa, fb) in a.iter().zip(&b) {
            interleaved.push(fa.clone());
            interleaved.push(fb.clone());
        }

        let mut rx = TransferReceiver::new(table());
        let got = feed(&mut rx, Instant::now(), &interleaved);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].frame.source(), 10);
        assert_eq!(got[1].frame.source(), 11);
    }

    #[test]
    fn service_directions_are_separate_streams() {
        let request = segment(&Frame::request(10, 20, 1), &[1; 20], Some(5));
        let response = segment(&Frame::response(10, 20, 1), &[2; 20], Some(5));
        let mut interleaved = Vec::new();
        for (a, b) in request.iter().zip(&response) {
            interleaved.push(a.clone());
            interleaved.push(b.clone());
        }

        let mut rx = TransferReceiver::new(table());
        let got = feed(&mut rx, Instant::now(), &interleaved);
        assert_eq!(got.len(), 2);
        assert!(got[0].frame.is_request());
        assert!(!got[1].frame.is_request());
    }

    #[test]
    fn empty_frame_is_ignored() {
        let mut rx = TransferReceiver::new(table());
        let frame = CanFrame::new(0x9001_550A, Vec::new()).unwrap();
        assert!(rx.read(&frame).is_none());
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn capacity_bounds_abandoned_transfers() {
        let config = TransferConfig {
            max_streams: 4,
            ..TransferConfig::default()
        };
        let mut rx = TransferReceiver::with_config(table(), config);
        let now = Instant::now();
        for source in 1..=5u8 {
            let frames = segment(&Frame::message(source, 341), &[0; 20], None);
            assert!(rx.read_at(now, &frames[0]).is_none());
        }
        assert_eq!(rx.pending(), 4);
    }

    #[test]
    fn sweep_reclaims_abandoned_transfers() {
        let frames = segment(&Frame::message(10, 341), &[0; 20], None);
        let mut rx = TransferReceiver::new(table());
        let t0 = Instant::now();
        rx.read_at(t0, &frames[0]);
        assert_eq!(rx.sweep(t0 + Duration::from_millis(1000)), 0);
        assert_eq!(rx.sweep(t0 + Duration::from_millis(2001)), 1);
        assert_eq!(rx.pending(), 0);
    }
}
