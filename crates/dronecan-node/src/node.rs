use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use dronecan_dsdl::Value;
use dronecan_frame::{Frame, Transfer, TransferReceiver, TransferSender, MAX_NODE_ID};
use dronecan_link::{CanFrame, Link, Subscription};
use dronecan_schema::SchemaRegistry;
use tracing::{debug, trace, warn};

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};

/// Identifies a registered handler for [`Node::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// A decoded broadcast message.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    pub type_name: String,
    pub source: u8,
    pub transfer_id: u8,
    pub message: Value,
}

/// A decoded service request addressed to this node.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedRequest {
    pub type_name: String,
    pub source: u8,
    pub transfer_id: u8,
    pub request: Value,
}

/// Ticket for one outstanding service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHandle {
    id: u64,
    service_id: u8,
    destination: u8,
    transfer_id: u8,
}

impl RequestHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn service_id(&self) -> u8 {
        self.service_id
    }

    /// Node the request was sent to; only its response completes the request.
    pub fn destination(&self) -> u8 {
        self.destination
    }

    pub fn transfer_id(&self) -> u8 {
        self.transfer_id
    }
}

/// Outcome of [`Node::poll_response`].
#[derive(Debug, Clone, PartialEq)]
pub enum RequestStatus {
    /// No response yet and the deadline has not passed.
    Pending,
    /// A response arrived. `None` when its payload did not decode.
    Responded(Option<Value>),
    TimedOut,
    Cancelled,
}

#[derive(Debug)]
enum State {
    Waiting,
    Responded(Option<Value>),
    TimedOut,
    Cancelled,
}

impl State {
    fn into_status(self) -> RequestStatus {
        match self {
            State::Waiting => RequestStatus::Pending,
            State::Responded(value) => RequestStatus::Responded(value),
            State::TimedOut => RequestStatus::TimedOut,
            State::Cancelled => RequestStatus::Cancelled,
        }
    }
}

#[derive(Debug)]
struct PendingRequest {
    service_id: u8,
    destination: u8,
    transfer_id: u8,
    deadline: Instant,
    state: State,
}

impl PendingRequest {
    /// Mark an overdue request timed out; true if this call did so.
    fn expire(&mut self, now: Instant) -> bool {
        if matches!(self.state, State::Waiting) && now > self.deadline {
            self.state = State::TimedOut;
            return true;
        }
        false
    }

    fn is_live(&self, now: Instant) -> bool {
        matches!(self.state, State::Waiting) && now <= self.deadline
    }
}

type MessageHandler = Box<dyn FnMut(&ReceivedMessage) + Send>;
type RequestHandler = Box<dyn FnMut(&ReceivedRequest) -> Option<Value> + Send>;

/// A DroneCAN node bound to one link.
///
/// Received frames are fed in explicitly; the node never reads the link on
/// its own. Handlers run synchronously inside [`handle_frame`](Self::handle_frame).
pub struct Node<L> {
    node_id: u8,
    registry: Arc<SchemaRegistry>,
    config: NodeConfig,
    sender: TransferSender<L, Arc<SchemaRegistry>>,
    receiver: TransferReceiver<Arc<SchemaRegistry>>,
    message_handlers: Vec<(HandlerId, u16, MessageHandler)>,
    request_handlers: Vec<(HandlerId, u8, RequestHandler)>,
    pending: HashMap<u64, PendingRequest>,
    next_handler: u64,
    next_request: u64,
}

impl<L: Link> Node<L> {
    /// Create a node with default config.
    pub fn new(node_id: u8, registry: Arc<SchemaRegistry>, link: L) -> Result<Self> {
        Self::with_config(node_id, registry, link, NodeConfig::default())
    }

    /// Create a node with explicit config.
    pub fn with_config(
        node_id: u8,
        registry: Arc<SchemaRegistry>,
        link: L,
        config: NodeConfig,
    ) -> Result<Self> {
        if node_id == 0 || node_id > MAX_NODE_ID {
            return Err(NodeError::InvalidNodeId(node_id));
        }
        let sender =
            TransferSender::with_config(link, Arc::clone(&registry), config.transfer.clone());
        let receiver = TransferReceiver::with_config(Arc::clone(&registry), config.transfer.clone());
        Ok(Self {
            node_id,
            registry,
            config,
            sender,
            receiver,
            message_handlers: Vec::new(),
            request_handlers: Vec::new(),
            pending: HashMap::new(),
            next_handler: 1,
            next_request: 1,
        })
    }

    pub fn node_id(&self) -> u8 {
        self.node_id
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn link(&self) -> &L {
        self.sender.link()
    }

    pub fn link_mut(&mut self) -> &mut L {
        self.sender.link_mut()
    }

    /// Broadcast a message of type `type_name`, returning its transfer id.
    pub fn broadcast(&mut self, type_name: &str, message: &Value) -> Result<u8> {
        self.broadcast_at(Instant::now(), type_name, message)
    }

    pub fn broadcast_at(&mut self, now: Instant, type_name: &str, message: &Value) -> Result<u8> {
        let ty = self
            .registry
            .message_by_name(type_name)
            .ok_or_else(|| NodeError::UnknownMessage(type_name.to_string()))?;
        let id = ty
            .id()
            .ok_or_else(|| NodeError::MissingId(type_name.to_string()))?;
        let payload = self.registry.encode_message(type_name, message)?;
        let transfer_id =
            self.sender
                .send_at(now, &Frame::message(self.node_id, id), &payload, None)?;
        trace!(node = self.node_id, type_name, transfer_id, "broadcast");
        Ok(transfer_id)
    }

    /// Send a service request to `destination`.
    ///
    /// The request is tracked until polled; it times out after
    /// `request_timeout`.
    pub fn request(&mut self, type_name: &str, destination: u8, request: &Value) -> Result<RequestHandle> {
        self.request_at(Instant::now(), type_name, destination, request)
    }

    pub fn request_at(
        &mut self,
        now: Instant,
        type_name: &str,
        destination: u8,
        request: &Value,
    ) -> Result<RequestHandle> {
        let service_id = self
            .registry
            .service_by_name(type_name)
            .map(|ty| ty.id())
            .ok_or_else(|| NodeError::UnknownService(type_name.to_string()))?;
        self.make_room(now)?;

        let payload = self.registry.encode_request(type_name, request)?;
        let frame = Frame::request(self.node_id, destination, service_id);
        let transfer_id = self.sender.send_at(now, &frame, &payload, None)?;

        let id = self.next_request;
        self.next_request += 1;
        self.pending.insert(
            id,
            PendingRequest {
                service_id,
                destination,
                transfer_id,
                deadline: now + self.config.request_timeout,
                state: State::Waiting,
            },
        );
        debug!(node = self.node_id, type_name, destination, transfer_id, request = id, "request sent");
        Ok(RequestHandle {
            id,
            service_id,
            destination,
            transfer_id,
        })
    }

    fn make_room(&mut self, now: Instant) -> Result<()> {
        let max = self.config.max_pending_requests;
        if self.pending.len() < max {
            return Ok(());
        }
        let before = self.pending.len();
        self.pending.retain(|_, pending| pending.is_live(now));
        let evicted = before - self.pending.len();
        if evicted > 0 {
            warn!(node = self.node_id, evicted, "request table full; dropped finished requests");
        }
        if self.pending.len() >= max {
            return Err(NodeError::TooManyPending(max));
        }
        Ok(())
    }

    /// Check on a request. Any status other than `Pending` is final and
    /// releases the request.
    pub fn poll_response(&mut self, handle: &RequestHandle) -> Result<RequestStatus> {
        self.poll_response_at(Instant::now(), handle)
    }

    pub fn poll_response_at(&mut self, now: Instant, handle: &RequestHandle) -> Result<RequestStatus> {
        let Entry::Occupied(mut entry) = self.pending.entry(handle.id) else {
            return Err(NodeError::UnknownRequest(handle.id));
        };
        entry.get_mut().expire(now);
        if matches!(entry.get().state, State::Waiting) {
            return Ok(RequestStatus::Pending);
        }
        Ok(entry.remove().state.into_status())
    }

    /// Stop waiting for a response. Returns false if the request already
    /// finished or is unknown.
    pub fn cancel(&mut self, handle: &RequestHandle) -> bool {
        match self.pending.get_mut(&handle.id) {
            Some(pending) if matches!(pending.state, State::Waiting) => {
                pending.state = State::Cancelled;
                debug!(node = self.node_id, request = handle.id, "request cancelled");
                true
            }
            _ => false,
        }
    }

    /// Number of tracked requests, finished or not.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Call `handler` for every received message of type `type_name`.
    pub fn on_message<F>(&mut self, type_name: &str, handler: F) -> Result<HandlerId>
    where
        F: FnMut(&ReceivedMessage) + Send + 'static,
    {
        let id = self
            .registry
            .message_by_name(type_name)
            .and_then(|ty| ty.id())
            .ok_or_else(|| NodeError::UnknownMessage(type_name.to_string()))?;
        let handler_id = self.next_handler_id();
        self.message_handlers.push((handler_id, id, Box::new(handler)));
        Ok(handler_id)
    }

    /// Answer requests of service `type_name` addressed to this node.
    ///
    /// Handlers run in registration order; the first to return a response
    /// answers, the rest are skipped.
    pub fn on_request<F>(&mut self, type_name: &str, handler: F) -> Result<HandlerId>
    where
        F: FnMut(&ReceivedRequest) -> Option<Value> + Send + 'static,
    {
        let id = self
            .registry
            .service_by_name(type_name)
            .map(|ty| ty.id())
            .ok_or_else(|| NodeError::UnknownService(type_name.to_string()))?;
        let handler_id = self.next_handler_id();
        self.request_handlers.push((handler_id, id, Box::new(handler)));
        Ok(handler_id)
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, handler: HandlerId) -> bool {
        let before = self.message_handlers.len() + self.request_handlers.len();
        self.message_handlers.retain(|(id, _, _)| *id != handler);
        self.request_handlers.retain(|(id, _, _)| *id != handler);
        before != self.message_handlers.len() + self.request_handlers.len()
    }

    fn next_handler_id(&mut self) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        id
    }

    /// Feed one received frame. See [`handle_frame_at`](Self::handle_frame_at).
    pub fn handle_frame(&mut self, frame: &CanFrame) -> Result<bool> {
        self.handle_frame_at(Instant::now(), frame)
    }

    /// Feed one frame received at `now`, dispatching the transfer it
    /// completes. Returns whether a transfer completed.
    ///
    /// Faults in received traffic are logged and dropped; errors come only
    /// from sending a response.
    pub fn handle_frame_at(&mut self, now: Instant, frame: &CanFrame) -> Result<bool> {
        let Some(transfer) = self.receiver.read_at(now, frame) else {
            return Ok(false);
        };
        self.dispatch(now, transfer)?;
        Ok(true)
    }

    fn dispatch(&mut self, now: Instant, transfer: Transfer) -> Result<()> {
        match transfer.frame {
            Frame::Message { source, id, .. } => {
                self.dispatch_message(source, id, &transfer);
                Ok(())
            }
            Frame::Anonymous { .. } => {
                trace!(node = self.node_id, "anonymous transfer ignored");
                Ok(())
            }
            Frame::Service {
                destination, ..
            } if destination != self.node_id => {
                trace!(node = self.node_id, destination, "service transfer for another node");
                Ok(())
            }
            Frame::Service {
                source,
                request: true,
                id,
                ..
            } => self.answer(now, source, id, &transfer),
            Frame::Service { source, id, .. } => {
                self.complete(now, source, id, &transfer);
                Ok(())
            }
        }
    }

    fn dispatch_message(&mut self, source: u8, id: u16, transfer: &Transfer) {
        let Some(ty) = self.registry.message_by_id(id) else {
            trace!(node = self.node_id, id, "unregistered message ignored");
            return;
        };
        let Some(message) = self.registry.decode_message(ty.name(), &transfer.payload) else {
            return;
        };
        let received = ReceivedMessage {
            type_name: ty.name().to_string(),
            source,
            transfer_id: transfer.transfer_id,
            message,
        };
        for (_, _, handler) in self
            .message_handlers
            .iter_mut()
            .filter(|(_, handler_type, _)| *handler_type == id)
        {
            handler(&received);
        }
    }

    fn answer(&mut self, now: Instant, source: u8, id: u8, transfer: &Transfer) -> Result<()> {
        let Some(ty) = self.registry.service_by_id(id) else {
            trace!(node = self.node_id, id, "unregistered service ignored");
            return Ok(());
        };
        let type_name = ty.name().to_string();
        let Some(request) = self.registry.decode_request(&type_name, &transfer.payload) else {
            return Ok(());
        };
        let received = ReceivedRequest {
            type_name,
            source,
            transfer_id: transfer.transfer_id,
            request,
        };
        let response = self
            .request_handlers
            .iter_mut()
            .filter(|(_, handler_type, _)| *handler_type == id)
            .find_map(|(_, _, handler)| handler(&received));
        let Some(response) = response else {
            debug!(node = self.node_id, service = %received.type_name, source, "no handler answered request");
            return Ok(());
        };

        let payload = self.registry.encode_response(&received.type_name, &response)?;
        let frame = Frame::response(self.node_id, source, id).with_priority(transfer.frame.priority());
        self.sender
            .send_at(now, &frame, &payload, Some(transfer.transfer_id))?;
        trace!(node = self.node_id, service = %received.type_name, source, transfer_id = transfer.transfer_id, "response sent");
        Ok(())
    }

    fn complete(&mut self, now: Instant, source: u8, id: u8, transfer: &Transfer) {
        let Some(pending) = self.pending.values_mut().find(|pending| {
            pending.service_id == id
                && pending.destination == source
                && pending.transfer_id == transfer.transfer_id
                && pending.is_live(now)
        }) else {
            debug!(node = self.node_id, id, source, transfer_id = transfer.transfer_id, "unsolicited response dropped");
            return;
        };
        let response = self
            .registry
            .service_by_id(id)
            .and_then(|ty| self.registry.decode_response(ty.name(), &transfer.payload));
        pending.state = State::Responded(response);
    }

    /// Drain and handle every frame queued on `subscription`, returning the
    /// number of completed transfers.
    pub fn process(&mut self, subscription: &Subscription) -> usize {
        let mut completed = 0;
        for frame in subscription.drain() {
            match self.handle_frame(&frame) {
                Ok(true) => completed += 1,
                Ok(false) => {}
                Err(err) => warn!(node = self.node_id, error = %err, "failed to answer request"),
            }
        }
        completed
    }

    /// Time out overdue requests and reclaim idle transfer state. Returns the
    /// number of requests that timed out.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let expired = self
            .pending
            .values_mut()
            .map(|pending| pending.expire(now))
            .filter(|expired| *expired)
            .count();
        let streams = self.sender.sweep(now) + self.receiver.sweep(now);
        if expired > 0 || streams > 0 {
            debug!(node = self.node_id, expired, streams, "swept node state");
        }
        expired
    }
}

impl<L> std::fmt::Debug for Node<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("node_id", &self.node_id)
            .field("message_handlers", &self.message_handlers.len())
            .field("request_handlers", &self.request_handlers.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
