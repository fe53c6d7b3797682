//! Logical node and worker identities, and the node-to-worker mapping.
//!
//! A [`Topology`] is the explicit configuration value threaded through
//! runtime construction: it fixes how many logical nodes exist, how many
//! workers host them, and which worker owns each node.

use std::fmt;

use crate::error::ConfigError;

/// Identifier of a logical node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a node identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokenflow::topology::NodeId;
    ///
    /// assert_eq!(NodeId::new(3).as_u32(), 3);
    /// ```
    #[must_use]
    pub const fn new(value: u32) -> Self { Self(value) }

    /// Return the raw identifier.
    #[must_use]
    pub const fn as_u32(self) -> u32 { self.0 }

    /// Return the identifier as a slice index.
    #[must_use]
    pub const fn index(self) -> usize { self.0 as usize }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self { Self(value) }
}

/// Identifier of a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u32);

impl WorkerId {
    /// Create a worker identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self { Self(value) }

    /// Return the raw identifier.
    #[must_use]
    pub const fn as_u32(self) -> u32 { self.0 }

    /// Return the identifier as a slice index.
    #[must_use]
    pub const fn index(self) -> usize { self.0 as usize }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Node and worker counts plus the total `node -> worker` mapping.
///
/// Nodes are dealt to workers round-robin, so worker `w` owns nodes
/// `w, w + workers, w + 2 * workers, ...` and node `w` is always the first
/// node of worker `w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    nodes: u32,
    workers: u32,
}

impl Topology {
    /// Build a topology for `nodes` logical nodes.
    ///
    /// A `requested_workers` of zero, or one larger than `nodes`, falls back
    /// to one worker per node.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoNodes`] when `nodes` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokenflow::topology::Topology;
    ///
    /// let topology = Topology::new(4, 0).expect("valid topology");
    /// assert_eq!(topology.worker_count(), 4);
    /// ```
    pub const fn new(nodes: u32, requested_workers: u32) -> Result<Self, ConfigError> {
        if nodes == 0 {
            return Err(ConfigError::NoNodes);
        }
        let workers = if requested_workers == 0 || requested_workers > nodes {
            nodes
        } else {
            requested_workers
        };
        Ok(Self { nodes, workers })
    }

    /// Build a topology hosting every node on a single worker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoNodes`] when `nodes` is zero.
    pub const fn single_worker(nodes: u32) -> Result<Self, ConfigError> { Self::new(nodes, 1) }

    /// Number of logical nodes.
    #[must_use]
    pub const fn node_count(&self) -> u32 { self.nodes }

    /// Number of workers.
    #[must_use]
    pub const fn worker_count(&self) -> u32 { self.workers }

    /// Returns `true` when `node` lies in `[0, node_count)`.
    #[must_use]
    pub const fn contains(&self, node: NodeId) -> bool { node.0 < self.nodes }

    /// Worker that owns `node`.
    #[must_use]
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "round-robin placement of nodes onto workers"
    )]
    pub const fn worker_of(&self, node: NodeId) -> WorkerId { WorkerId(node.0 % self.workers) }

    /// First node owned by `worker`.
    #[must_use]
    pub const fn first_node_of(&self, worker: WorkerId) -> NodeId { NodeId(worker.0) }

    /// Iterate over every node in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + use<> { (0..self.nodes).map(NodeId) }

    /// Iterate over every worker in ascending order.
    pub fn workers(&self) -> impl Iterator<Item = WorkerId> + use<> {
        (0..self.workers).map(WorkerId)
    }

    /// Iterate over the nodes owned by `worker`, in ascending order.
    pub fn nodes_of(&self, worker: WorkerId) -> impl Iterator<Item = NodeId> + use<> {
        let step = self.workers as usize;
        (worker.0..self.nodes).step_by(step).map(NodeId)
    }
}
