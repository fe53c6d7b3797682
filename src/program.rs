//! The capability a live program supplies to the runtime.

use crate::{
    context::NodeHandle,
    output::Output,
    transition::TransitionRegistry,
};

/// Behaviour of every node in a live run.
///
/// One program value is shared by all workers; per-node state lives in
/// [`NodeProgram::Places`], which is created on and never leaves the
/// owning worker's thread.
pub trait NodeProgram: Sync {
    /// Opaque per-node place storage.
    type Places;

    /// Register the node's transitions and seed its places.
    ///
    /// Called once per node, on the owning worker, before scheduling starts.
    fn init(
        &self,
        node: &mut NodeHandle,
        transitions: &mut TransitionRegistry<NodeHandle, Self::Places>,
    ) -> Self::Places;

    /// Handle a user message addressed to `node`.
    fn receive(&self, node: &mut NodeHandle, places: &mut Self::Places, message: u32, payload: &[u8]);

    /// Describe the node's state for a report.
    fn report(&self, _node: &NodeHandle, _places: &Self::Places, _out: &mut Output) {}
}
