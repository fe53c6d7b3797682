//! Packet delivery between nodes.
//!
//! [`Router`] resolves a target node to its owning worker and hands the
//! sealed packet to a [`Transport`]. The in-process transport is
//! [`Mailboxes`], one [`WorkerQueue`] per worker; [`wire::WireTransport`]
//! instead frames packets onto a byte stream for another process, where
//! [`wire::forward_incoming`] feeds them back into that process's router.

pub mod wire;

use std::{fmt, ops::Range, sync::Arc};

use crate::{
    error::PacketError,
    packet::{
        MessageId,
        Packet,
        PacketBuf,
        queue::{Batch, WorkerQueue},
    },
    topology::{NodeId, Topology, WorkerId},
};

/// Destination for sealed packets, keyed by owning worker.
pub trait Transport: Send + Sync {
    /// Deliver `packet` to the queue of `worker`.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::UnknownWorker`] when no such worker exists, or
    /// an I/O error from stream transports.
    fn push(&self, worker: WorkerId, packet: Packet) -> Result<(), PacketError>;
}

/// In-process delivery queues, one per worker.
#[derive(Debug)]
pub struct Mailboxes {
    queues: Box<[WorkerQueue]>,
}

impl Mailboxes {
    /// Create empty queues for `workers` workers.
    #[must_use]
    pub fn new(workers: u32) -> Self {
        Self {
            queues: (0..workers).map(|_| WorkerQueue::new()).collect(),
        }
    }

    /// Detach every packet pending for `worker`.
    #[must_use]
    pub fn take_all(&self, worker: WorkerId) -> Batch {
        self.queues
            .get(worker.index())
            .map(WorkerQueue::take_all)
            .unwrap_or_default()
    }

    /// Returns `true` when no queue holds a pending packet.
    #[must_use]
    pub fn is_idle(&self) -> bool { self.queues.iter().all(WorkerQueue::is_empty) }
}

impl Transport for Mailboxes {
    fn push(&self, worker: WorkerId, packet: Packet) -> Result<(), PacketError> {
        let queue = self
            .queues
            .get(worker.index())
            .ok_or(PacketError::UnknownWorker(worker))?;
        queue.push(packet);
        Ok(())
    }
}

/// Delivers to in-process queues for hosted workers and hands everything
/// else to a remote transport.
pub struct Partitioned {
    hosted: Range<u32>,
    local: Arc<Mailboxes>,
    remote: Arc<dyn Transport>,
}

impl Partitioned {
    /// Route workers in `hosted` to `local` and the rest to `remote`.
    #[must_use]
    pub fn new(hosted: Range<u32>, local: Arc<Mailboxes>, remote: Arc<dyn Transport>) -> Self {
        Self {
            hosted,
            local,
            remote,
        }
    }

    /// Whether `worker` runs in this process.
    #[must_use]
    pub fn hosts(&self, worker: WorkerId) -> bool { self.hosted.contains(&worker.as_u32()) }
}

impl Transport for Partitioned {
    fn push(&self, worker: WorkerId, packet: Packet) -> Result<(), PacketError> {
        if self.hosts(worker) {
            self.local.push(worker, packet)
        } else {
            self.remote.push(worker, packet)
        }
    }
}

impl fmt::Debug for Partitioned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partitioned")
            .field("hosted", &self.hosted)
            .finish_non_exhaustive()
    }
}

/// Resolves nodes to workers and seals packets for delivery.
#[derive(Clone)]
pub struct Router {
    topology: Topology,
    transport: Arc<dyn Transport>,
}

impl Router {
    /// Create a router over `transport`.
    #[must_use]
    pub fn new(topology: Topology, transport: Arc<dyn Transport>) -> Self {
        Self {
            topology,
            transport,
        }
    }

    /// Topology used for node resolution.
    #[must_use]
    pub const fn topology(&self) -> &Topology { &self.topology }

    fn check(&self, node: NodeId) -> Result<(), PacketError> {
        if self.topology.contains(node) {
            Ok(())
        } else {
            Err(PacketError::UnknownNode {
                node,
                node_count: self.topology.node_count(),
            })
        }
    }

    /// Seal `buf` for `target` and push it to the owning worker.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::UnknownNode`] for a target outside the
    /// topology, or any error raised while sealing or delivering.
    pub fn send(&self, target: NodeId, message: MessageId, buf: PacketBuf) -> Result<(), PacketError> {
        self.check(target)?;
        let packet = buf.seal(target, message)?;
        self.transport.push(self.topology.worker_of(target), packet)
    }

    /// Send a copy of `payload` to every node except `source`.
    ///
    /// Each destination receives its own buffer.
    ///
    /// # Errors
    ///
    /// Stops at the first delivery failure and returns it.
    pub fn broadcast(
        &self,
        source: Option<NodeId>,
        message: MessageId,
        payload: &[u8],
    ) -> Result<(), PacketError> {
        for node in self.topology.nodes().filter(|node| Some(*node) != source) {
            self.send(node, message, PacketBuf::from_payload(payload))?;
        }
        Ok(())
    }

    /// Send a copy of `payload` to the first node of every worker.
    ///
    /// # Errors
    ///
    /// Stops at the first delivery failure and returns it.
    pub fn send_to_workers(&self, message: MessageId, payload: &[u8]) -> Result<(), PacketError> {
        for worker in self.topology.workers() {
            let first = self.topology.first_node_of(worker);
            self.send(first, message, PacketBuf::from_payload(payload))?;
        }
        Ok(())
    }

    /// Deliver an already sealed packet, typically one read off a stream.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::UnknownNode`] when the packet's target lies
    /// outside the topology.
    pub fn forward(&self, packet: Packet) -> Result<(), PacketError> {
        let target = packet.target();
        self.check(target)?;
        self.transport.push(self.topology.worker_of(target), packet)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("topology", &self.topology)
            .finish_non_exhaustive()
    }
}
