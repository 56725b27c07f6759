use std::time::Instant;

use bytes::{BufMut, BytesMut};
use dronecan_dsdl::transfer_crc;
use dronecan_link::{CanFrame, Link};
use tracing::{debug, trace};

use crate::config::TransferConfig;
use crate::error::{FrameError, Result};
use crate::id::Frame;
use crate::lookup::SignatureLookup;
use crate::streams::StreamTable;
use crate::tail::{Tail, TRANSFER_ID_MODULO};

/// Largest payload sent as a single frame (eight bytes minus the tail).
pub const MAX_SINGLE_FRAME_PAYLOAD: usize = 7;

/// Splits payloads into link frames and assigns transfer ids.
///
/// One stream per encoded frame identifier; each remembers the next transfer
/// id and when it was last used. A stream idle past the transfer timeout
/// restarts at transfer id 0.
pub struct TransferSender<L, S> {
    link: L,
    lookup: S,
    config: TransferConfig,
    streams: StreamTable<u32, u8>,
}

impl<L: Link, S: SignatureLookup> TransferSender<L, S> {
    pub fn new(link: L, lookup: S) -> Self {
        Self::with_config(link, lookup, TransferConfig::default())
    }

    pub fn with_config(link: L, lookup: S, config: TransferConfig) -> Self {
        let streams = StreamTable::new(config.max_streams);
        Self {
            link,
            lookup,
            config,
            streams,
        }
    }

    /// Send one transfer now. See [`send_at`](Self::send_at).
    pub fn send(&mut self, frame: &Frame, payload: &[u8], transfer_id: Option<u8>) -> Result<u8> {
        self.send_at(Instant::now(), frame, payload, transfer_id)
    }

    /// Send one transfer as of `now`, returning the transfer id used.
    ///
    /// `transfer_id` overrides the stream's next id; responses use it to echo
    /// the request's id. Multi-frame payloads need the frame's signature from
    /// the lookup for the transfer CRC.
    pub fn send_at(
        &mut self,
        now: Instant,
        frame: &Frame,
        payload: &[u8],
        transfer_id: Option<u8>,
    ) -> Result<u8> {
        let id = frame.encode()?;

        let next = match self.streams.idle_for(&id, now) {
            Some(idle) if idle > self.config.transfer_timeout => {
                debug!(id, ?idle, "stream idle; transfer id reset");
                0
            }
            Some(_) => self.streams.get(&id).copied().unwrap_or(0),
            None => 0,
        };
        let transfer_id = transfer_id.unwrap_or(next) % TRANSFER_ID_MODULO;

        if payload.len() <= MAX_SINGLE_FRAME_PAYLOAD {
            let mut data = BytesMut::with_capacity(payload.len() + 1);
            data.put_slice(payload);
            data.put_u8(Tail::single(transfer_id).encode());
            self.link.write(CanFrame::new(id, data.freeze())?)?;
            trace!(id, transfer_id, len = payload.len(), "sent single-frame transfer");
        } else {
            let signature = self
                .lookup
                .signature_for(frame)
                .ok_or(FrameError::UnknownSignature { id })?;
            self.send_segmented(id, signature, payload, transfer_id)?;
        }

        self.streams
            .insert(id, (transfer_id + 1) % TRANSFER_ID_MODULO, now);
        Ok(transfer_id)
    }

    fn send_segmented(&mut self, id: u32, signature: u64, payload: &[u8], transfer_id: u8) -> Result<()> {
        let mut stream = BytesMut::with_capacity(payload.len() + 2);
        stream.put_u16_le(transfer_crc(signature, payload));
        stream.put_slice(payload);

        let chunks = stream.len().div_ceil(MAX_SINGLE_FRAME_PAYLOAD);
        let mut toggle = false;
        for (i, chunk) in stream.chunks(MAX_SINGLE_FRAME_PAYLOAD).enumerate() {
            let tail = Tail {
                transfer_id,
                toggle,
                start: i == 0,
                end: i + 1 == chunks,
            };
            let mut data = BytesMut::with_capacity(chunk.len() + 1);
            data.put_slice(chunk);
            data.put_u8(tail.encode());
            self.link.write(CanFrame::new(id, data.freeze())?)?;
            toggle = !toggle;
        }

        trace!(id, transfer_id, len = payload.len(), frames = chunks, "sent multi-frame transfer");
        Ok(())
    }

    /// Forget streams idle past the transfer timeout.
    pub fn sweep(&mut self, now: Instant) -> usize {
        self.streams.sweep(now, self.config.transfer_timeout)
    }

    /// Number of streams with remembered transfer ids.
    pub fn streams(&self) -> usize {
        self.streams.len()
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub fn lookup(&self) -> &S {
        &self.lookup
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }
}

impl<L, S> std::fmt::Debug for TransferSender<L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSender")
            .field("config", &self.config)
            .field("streams", &self.streams.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::lookup::SignatureTable;

    const SIG: u64 = 0x0F08_68D0_C1A7_C6F1;

    fn sender() -> TransferSender<Vec<CanFrame>, SignatureTable> {
        TransferSender::new(Vec::new(), SignatureTable::new().with_message(341, SIG))
    }

    fn tails(frames: &[CanFrame]) -> Vec<Tail> {
        frames
            .iter()
            .map(|f| Tail::decode(*f.data().last().unwrap()))
            .collect()
    }

    #[test]
    fn single_frame_layout() {
        let mut tx = sender();
        let tid = tx.send(&Frame::message(10, 341), &[1, 2, 3], None).unwrap();
        assert_eq!(tid, 0);

        let frames = tx.into_inner();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id(), 0x9001_550A);
        assert_eq!(frames[0].data(), &[1, 2, 3, 0xC0]);
    }

    #[test]
    fn seven_bytes_still_fit_one_frame() {
        let mut tx = TransferSender::new(Vec::new(), SignatureTable::new());
        tx.send(&Frame::message(10, 999), &[0; 7], None).unwrap();
        let frames = tx.into_inner();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data().len(), 8);
    }

    #[test]
    fn multi_frame_layout() {
        let payload: Vec<u8> = (1..=20).collect();
        let mut tx = sender();
        tx.send(&Frame::message(10, 341), &payload, None).unwrap();
        let frames = tx.into_inner();

        // 2 CRC bytes + 20 payload bytes = 22 bytes -> 7 + 7 + 7 + 1.
        assert_eq!(frames.len(), 4);
        assert_eq!(&frames[0].data()[..2], &0x66C6u16.to_le_bytes());
        assert_eq!(&frames[0].data()[2..7], &[1, 2, 3, 4, 5]);
        assert_eq!(frames[3].data(), &[20, 0x60]);

        let tails = tails(&frames);
        assert!(tails[0].start && !tails[0].end);
        assert!(!tails[1].start && !tails[1].end);
        assert!(tails[3].end && !tails[3].start);
        let toggles: Vec<bool> = tails.iter().map(|t| t.toggle).collect();
        assert_eq!(toggles, vec![false, true, false, true]);
    }

    #[test]
    fn transfer_ids_advance_and_wrap() {
        let mut tx = sender();
        let frame = Frame::message(10, 341);
        let t0 = Instant::now();
        for expected in 0..40u32 {
            let at = t0 + Duration::from_millis(u64::from(expected));
            let tid = tx.send_at(at, &frame, &[0], None).unwrap();
            assert_eq!(u32::from(tid), expected % 32);
        }
    }

    #[test]
    fn streams_are_independent() {
        let mut tx = sender();
        let now = Instant::now();
        tx.send_at(now, &Frame::message(10, 341), &[0], None).unwrap();
        tx.send_at(now, &Frame::message(10, 341), &[0], None).unwrap();
        let tid = tx.send_at(now, &Frame::message(11, 341), &[0], None).unwrap();
        assert_eq!(tid, 0);
        assert_eq!(tx.streams(), 2);
    }

    #[test]
    fn idle_stream_resets_transfer_id() {
        let mut tx = sender();
        let frame = Frame::message(10, 341);
        let t0 = Instant::now();
        tx.send_at(t0, &frame, &[0], None).unwrap();
        assert_eq!(tx.send_at(t0 + Duration::from_millis(2000), &frame, &[0], None).unwrap(), 1);
        assert_eq!(tx.send_at(t0 + Duration::from_millis(4001), &frame, &[0], None).unwrap(), 0);
    }

    #[test]
    fn explicit_transfer_id_overrides_and_persists() {
        let mut tx = sender();
        let frame = Frame::response(10, 20, 1);
        let now = Instant::now();
        assert_eq!(tx.send_at(now, &frame, &[0], Some(17)).unwrap(), 17);
        assert_eq!(tx.send_at(now, &frame, &[0], None).unwrap(), 18);
    }

    #[test]
    fn unknown_signature_rejects_multi_frame() {
        let mut tx = TransferSender::new(Vec::new(), SignatureTable::new());
        let err = tx.send(&Frame::message(10, 5), &[0; 8], None).unwrap_err();
        assert!(matches!(err, FrameError::UnknownSignature { .. }));
        assert!(tx.link().is_empty());
    }

    #[test]
    fn invalid_frame_is_rejected_before_sending() {
        let mut tx = sender();
        let err = tx.send(&Frame::message(200, 341), &[0], None).unwrap_err();
        assert!(matches!(err, FrameError::FieldRange { .. }));
        assert!(tx.link().is_empty());
    }

    #[test]
    fn sweep_forgets_idle_streams() {
        let mut tx = sender();
        let t0 = Instant::now();
        tx.send_at(t0, &Frame::message(10, 341), &[0], None).unwrap();
        assert_eq!(tx.sweep(t0 + Duration::from_millis(2001)), 1);
        assert_eq!(tx.streams(), 0);
    }
}
