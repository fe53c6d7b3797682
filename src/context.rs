//! Per-node runtime identity and state.
//!
//! A [`Context`] couples a [`NodeHandle`] (identity, messaging, halt flag)
//! with the node's private places and its transition registry. Contexts are
//! created and mutated only on the worker thread that owns them, so none of
//! this state is synchronised.

use crate::{
    error::PacketError,
    packet::{MessageId, PacketBuf},
    program::NodeProgram,
    topology::{NodeId, WorkerId},
    transition::{Firing, TransitionId, TransitionRegistry},
    transport::Router,
};

/// Identity and messaging capability of one logical node.
///
/// Transition firing functions and receive callbacks get a mutable handle
/// alongside the places, so they can send packets or halt the node.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    node: NodeId,
    worker: WorkerId,
    instance: u32,
    instances: u32,
    router: Router,
    halted: bool,
}

impl NodeHandle {
    /// Create the handle for `node`, owned by the worker the router's
    /// topology assigns it to.
    #[must_use]
    pub fn new(node: NodeId, router: Router) -> Self {
        Self {
            node,
            worker: router.topology().worker_of(node),
            instance: 0,
            instances: 1,
            router,
            halted: false,
        }
    }

    /// This node.
    #[must_use]
    pub const fn node(&self) -> NodeId { self.node }

    /// Worker that owns this node.
    #[must_use]
    pub const fn worker(&self) -> WorkerId { self.worker }

    /// Total number of nodes in the runtime.
    #[must_use]
    pub const fn node_count(&self) -> u32 { self.router.topology().node_count() }

    /// Instance index of the net hosted by this node.
    #[must_use]
    pub const fn instance(&self) -> u32 { self.instance }

    /// Number of instances of the net hosted by this node's program.
    #[must_use]
    pub const fn instances(&self) -> u32 { self.instances }

    /// Record which instance of a replicated net this node runs.
    pub const fn set_instance(&mut self, instance: u32, instances: u32) {
        self.instance = instance;
        self.instances = instances;
    }

    /// Set the halt flag. The scheduler honours it at its next quiescent
    /// point.
    pub const fn halt(&mut self) { self.halted = true; }

    /// Whether the halt flag is set.
    #[must_use]
    pub const fn halted(&self) -> bool { self.halted }

    /// Send `buf` as user message `message` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::ReservedMessageId`] when `message` does not fit
    /// the user range, [`PacketError::UnknownNode`] for targets outside the
    /// topology, or the transport's delivery error.
    pub fn send(&self, target: NodeId, message: u32, buf: PacketBuf) -> Result<(), PacketError> {
        self.router.send(target, MessageId::data(message)?, buf)
    }

    /// Send a copy of `payload` to `target`.
    ///
    /// # Errors
    ///
    /// See [`NodeHandle::send`].
    pub fn send_bytes(&self, target: NodeId, message: u32, payload: &[u8]) -> Result<(), PacketError> {
        self.send(target, message, PacketBuf::from_payload(payload))
    }

    /// Send a copy of `payload` to every node except this one.
    ///
    /// # Errors
    ///
    /// See [`NodeHandle::send`].
    pub fn broadcast(&self, message: u32, payload: &[u8]) -> Result<(), PacketError> {
        self.router
            .broadcast(Some(self.node), MessageId::data(message)?, payload)
    }

    /// Halt this node and ask every other node to halt.
    ///
    /// Shutdown is deferred: each node stops at its scheduler's next
    /// quiescent point.
    ///
    /// # Errors
    ///
    /// Returns the first delivery failure; this node is halted regardless.
    pub fn quit(&mut self) -> Result<(), PacketError> {
        self.halted = true;
        self.router.broadcast(Some(self.node), MessageId::HALT, &[])
    }

    /// Ask every worker to open the trace log at `path`.
    ///
    /// # Errors
    ///
    /// Returns the first delivery failure.
    pub fn start_logging(&self, path: &str) -> Result<(), PacketError> {
        self.router.send_to_workers(MessageId::START_LOG, path.as_bytes())
    }

    /// Ask every worker to close the trace log.
    ///
    /// # Errors
    ///
    /// Returns the first delivery failure.
    pub fn stop_logging(&self) -> Result<(), PacketError> {
        self.router.send_to_workers(MessageId::STOP_LOG, &[])
    }
}

/// A node's handle, places and transitions.
#[derive(Debug)]
pub struct Context<P> {
    handle: NodeHandle,
    places: P,
    transitions: TransitionRegistry<NodeHandle, P>,
}

impl<P> Context<P> {
    /// Assemble a context from its parts.
    #[must_use]
    pub const fn new(handle: NodeHandle, places: P, transitions: TransitionRegistry<NodeHandle, P>) -> Self {
        Self {
            handle,
            places,
            transitions,
        }
    }

    /// Run `program`'s initialiser for `handle` and wrap the result.
    #[must_use]
    pub fn init<N>(program: &N, mut handle: NodeHandle) -> Self
    where
        N: NodeProgram<Places = P> + ?Sized,
    {
        let mut transitions = TransitionRegistry::new();
        let places = program.init(&mut handle, &mut transitions);
        Self::new(handle, places, transitions)
    }

    /// Node this context runs.
    #[must_use]
    pub const fn node(&self) -> NodeId { self.handle.node }

    /// Node handle.
    #[must_use]
    pub const fn handle(&self) -> &NodeHandle { &self.handle }

    /// Place storage.
    #[must_use]
    pub const fn places(&self) -> &P { &self.places }

    /// Borrow the handle and places together, as callbacks need them.
    pub const fn split(&mut self) -> (&mut NodeHandle, &mut P) { (&mut self.handle, &mut self.places) }

    /// Registered transitions.
    #[must_use]
    pub const fn transitions(&self) -> &TransitionRegistry<NodeHandle, P> { &self.transitions }

    /// Fire the transition at scheduling position `index`.
    ///
    /// An out-of-range index does not fire.
    pub fn fire(&mut self, index: usize) -> Firing {
        self.transitions
            .get(index)
            .map_or(Firing::NotFired, |t| t.fire(&mut self.handle, &mut self.places))
    }

    /// Fire the first transition registered under `id`, if any.
    pub fn fire_by_id(&mut self, id: TransitionId) -> Option<Firing> {
        let transition = self.transitions.find(id)?;
        Some(transition.fire(&mut self.handle, &mut self.places))
    }

    /// Set the halt flag.
    pub const fn halt(&mut self) { self.handle.halt(); }

    /// Whether the halt flag is set.
    #[must_use]
    pub const fn halted(&self) -> bool { self.handle.halted }
}
