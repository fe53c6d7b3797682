//! Shared fixtures for unit tests.

pub(crate) mod tracing;

use std::sync::Arc;

use crate::{
    context::NodeHandle,
    topology::{NodeId, Topology},
    transport::{Mailboxes, Router, Transport},
};

/// Build a handle for `node` in a topology of `nodes` nodes, one worker per
/// node, delivering into fresh in-process mailboxes.
pub(crate) fn detached_handle(node: u32, nodes: u32) -> (Arc<Mailboxes>, NodeHandle) {
    let topology = Topology::new(nodes, 0).expect("topology");
    let mailboxes = Arc::new(Mailboxes::new(topology.worker_count()));
    let router = Router::new(topology, Arc::clone(&mailboxes) as Arc<dyn Transport>);
    (mailboxes, NodeHandle::new(NodeId::new(node), router))
}
