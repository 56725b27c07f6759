use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{LinkError, Result};
use crate::frame::CanFrame;
use crate::traits::Link;

/// In-memory broadcast medium shared by any number of ports.
///
/// Every frame written through one port is queued for every subscription held
/// by the *other* ports, mirroring a CAN controller that does not receive its
/// own transmissions. Delivery is queued rather than immediate, so a handler
/// that answers a frame by writing to the bus never re-enters itself.
#[derive(Clone, Default)]
pub struct VirtualBus {
    inner: Arc<Mutex<BusInner>>,
}

#[derive(Default)]
struct BusInner {
    next_port: u64,
    next_subscription: u64,
    subscribers: Vec<Subscriber>,
}

struct Subscriber {
    id: u64,
    port: u64,
    tx: Sender<CanFrame>,
}

impl VirtualBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new port to the bus.
    pub fn port(&self) -> BusPort {
        let mut inner = lock(&self.inner);
        let id = inner.next_port;
        inner.next_port += 1;
        debug!(port = id, "attached bus port");
        BusPort {
            id,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of live subscriptions across all ports.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }
}

impl std::fmt::Debug for VirtualBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// One node's attachment point on a [`VirtualBus`].
#[derive(Clone)]
pub struct BusPort {
    id: u64,
    inner: Arc<Mutex<BusInner>>,
}

impl BusPort {
    /// Port identifier, unique per bus.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Subscribe to frames written by other ports.
    ///
    /// The subscription detaches when dropped or when
    /// [`Subscription::unsubscribe`] is called.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();
        let mut inner = lock(&self.inner);
        let id = inner.next_subscription;
        inner.next_subscription += 1;
        inner.subscribers.push(Subscriber {
            id,
            port: self.id,
            tx,
        });
        debug!(port = self.id, subscription = id, "subscribed");
        Subscription {
            id,
            rx,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Link for BusPort {
    fn write(&mut self, frame: CanFrame) -> Result<()> {
        let mut inner = lock(&self.inner);
        trace!(port = self.id, id = frame.id(), len = frame.data().len(), "bus write");
        // A send only fails when the receiving half is gone; drop such entries.
        inner
            .subscribers
            .retain(|sub| sub.port == self.id || sub.tx.send(frame.clone()).is_ok());
        Ok(())
    }
}

impl std::fmt::Debug for BusPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusPort").field("id", &self.id).finish()
    }
}

/// Inbound frame queue for one subscriber; unsubscribes on drop.
pub struct Subscription {
    id: u64,
    rx: Receiver<CanFrame>,
    inner: Arc<Mutex<BusInner>>,
}

impl Subscription {
    /// Take the next queued frame, if any.
    pub fn try_recv(&self) -> Option<CanFrame> {
        match self.rx.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until a frame arrives or `timeout` elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<CanFrame> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => LinkError::Timeout,
            RecvTimeoutError::Disconnected => LinkError::Disconnected,
        })
    }

    /// Take every queued frame.
    pub fn drain(&self) -> Vec<CanFrame> {
        self.rx.try_iter().collect()
    }

    /// Detach from the bus.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut inner = lock(&self.inner);
        inner.subscribers.retain(|sub| sub.id != self.id);
        debug!(subscription = self.id, "unsubscribed");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

fn lock(inner: &Mutex<BusInner>) -> MutexGuard<'_, BusInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: u32, byte: u8) -> CanFrame {
        CanFrame::new(id, vec![byte]).unwrap()
    }

    #[test]
    fn frames_reach_other_ports_only() {
        let bus = VirtualBus::new();
        let mut a = bus.port();
        let b = bus.port();
        let a_sub = a.subscribe();
        let b_sub = b.subscribe();

        a.write(frame(7, 0x11)).unwrap();

        assert!(a_sub.try_recv().is_none());
        let got = b_sub.try_recv().unwrap();
        assert_eq!(got.id(), 7);
        assert_eq!(got.data(), &[0x11]);
    }

    #[test]
    fn preserves_write_order() {
        let bus = VirtualBus::new();
        let mut a = bus.port();
        let sub = bus.port().subscribe();

        for i in 0..5u8 {
            a.write(frame(u32::from(i), i)).unwrap();
        }

        let ids: Vec<u32> = sub.drain().iter().map(CanFrame::id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn dropping_subscription_detaches() {
        let bus = VirtualBus::new();
        let mut a = bus.port();
        let sub = bus.port().subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);
        a.write(frame(1, 0)).unwrap();
    }

    #[test]
    fn recv_timeout_expires() {
        let bus = VirtualBus::new();
        let sub = bus.port().subscribe();
        let err = sub.recv_timeout(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, LinkError::Timeout));
    }

    #[test]
    fn delivery_across_threads() {
        let bus = VirtualBus::new();
        let sub = bus.port().subscribe();
        let mut writer = bus.port();

        let handle = std::thread::spawn(move || {
            for i in 0..16u32 {
                writer.write(frame(i, 0)).unwrap();
            }
        });

        for expected in 0..16u32 {
            let got = sub.recv_timeout(Duration::from_secs(1)).unwrap();
            assert_eq!(got.id(), expected);
        }
        handle.join().unwrap();
    }
}
