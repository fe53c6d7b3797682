//! Token ring: a single token travels `0 -> 1 -> ... -> n-1 -> 0`.
//!
//! Node 0 starts with the token. Each completed circuit increments the lap
//! counter carried in the token's payload; once node 0 holds the token
//! after `laps` circuits it quits, which halts the whole ring.

#![expect(clippy::big_endian_bytes, reason = "token payload is big-endian")]

use tracing::warn;

use crate::{
    context::NodeHandle,
    output::Output,
    program::NodeProgram,
    topology::NodeId,
    transition::{Firing, TransitionRegistry},
};

/// Message id of the token.
pub const TOKEN: u32 = 1;
/// Transition id of the forwarding transition.
pub const FORWARD: u32 = 0;

/// Token-ring program.
#[derive(Debug, Clone, Default)]
pub struct TokenRing {
    laps: u32,
    trace: Option<String>,
}

/// Places of one ring node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingPlaces {
    laps: u32,
    trace: Option<String>,
    token: Option<u32>,
    passes: u32,
}

impl RingPlaces {
    /// Lap count of the token, if this node holds it.
    #[must_use]
    pub const fn token(&self) -> Option<u32> { self.token }

    /// How many times this node has passed the token on.
    #[must_use]
    pub const fn passes(&self) -> u32 { self.passes }
}

impl TokenRing {
    /// Ring that stops after `laps` full circuits.
    #[must_use]
    pub const fn new(laps: u32) -> Self { Self { laps, trace: None } }

    /// Record a trace log at `path` for the duration of the run.
    #[must_use]
    pub fn with_trace(mut self, path: impl Into<String>) -> Self {
        self.trace = Some(path.into());
        self
    }
}

fn forward(node: &mut NodeHandle, places: &mut RingPlaces) -> Firing {
    let Some(lap) = places.token else {
        return Firing::NotFired;
    };
    if node.node().as_u32() == 0 && lap >= places.laps {
        places.token = None;
        if places.trace.is_some() {
            if let Err(error) = node.stop_logging() {
                warn!(%error, "failed to stop trace logging");
            }
        }
        if let Err(error) = node.quit() {
            warn!(%error, "failed to broadcast halt");
        }
        return Firing::Fired;
    }
    let next = node.node().as_u32() + 1;
    let (target, lap) = if next == node.node_count() {
        (NodeId::new(0), lap + 1)
    } else {
        (NodeId::new(next), lap)
    };
    if let Err(error) = node.send_bytes(target, TOKEN, &lap.to_be_bytes()) {
        warn!(node = %node.node(), %error, "failed to forward token");
        return Firing::NotFired;
    }
    places.token = None;
    places.passes += 1;
    Firing::Fired
}

impl NodeProgram for TokenRing {
    type Places = RingPlaces;

    fn init(
        &self,
        node: &mut NodeHandle,
        transitions: &mut TransitionRegistry<NodeHandle, RingPlaces>,
    ) -> RingPlaces {
        transitions.register(FORWARD, forward);
        let first = node.node().as_u32() == 0;
        if first {
            if let Some(path) = &self.trace {
                if let Err(error) = node.start_logging(path) {
                    warn!(%error, path, "failed to start trace logging");
                }
            }
        }
        RingPlaces {
            laps: self.laps,
            trace: self.trace.clone(),
            token: first.then_some(0),
            passes: 0,
        }
    }

    fn receive(&self, node: &mut NodeHandle, places: &mut RingPlaces, message: u32, payload: &[u8]) {
        match (message, <[u8; 4]>::try_from(payload)) {
            (TOKEN, Ok(bytes)) => places.token = Some(u32::from_be_bytes(bytes)),
            _ => warn!(node = %node.node(), message_id = message, len = payload.len(), "unexpected ring message"),
        }
    }

    fn report(&self, _node: &NodeHandle, places: &RingPlaces, out: &mut Output) {
        out.child("ring");
        out.set("holding", places.token.is_some());
        out.set("passes", places.passes);
        // Closes a nested block; the root stays open.
        let _closed = out.back();
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        runtime::{Runtime, SimRuntime},
        transition::TransitionId,
    };

    #[rstest]
    #[case(1, 0)]
    #[case(1, 3)]
    #[case(4, 2)]
    fn sim_ring_runs_to_completion(#[case] nodes: u32, #[case] laps: u32) {
        let ring = TokenRing::new(laps);
        let mut sim = SimRuntime::new(nodes, &ring).expect("sim");
        let summary = sim.run().expect("run");
        assert_eq!(summary.delivered, u64::from(nodes * laps));
        // Every pass plus node 0's final quit.
        assert_eq!(summary.fired, u64::from(nodes * laps) + 1);
    }

    #[test]
    fn manual_firing_moves_the_token() {
        let ring = TokenRing::new(5);
        let mut sim = SimRuntime::new(3, &ring).expect("sim");
        let forward_id = TransitionId::new(FORWARD);
        assert_eq!(sim.fire(NodeId::new(1), forward_id).expect("fire"), Firing::NotFired);
        assert_eq!(sim.fire(NodeId::new(0), forward_id).expect("fire"), Firing::Fired);
        assert_eq!(sim.fire(NodeId::new(1), forward_id).expect("fire"), Firing::Fired);

        let report = sim.report();
        let holding: Vec<&str> = report
            .children()
            .iter()
            .filter_map(|node| node.children().first()?.attribute("holding"))
            .collect();
        assert_eq!(holding, vec!["false", "false", "true"]);
    }

    #[test]
    fn malformed_tokens_are_ignored() {
        let ring = TokenRing::new(1);
        let (_mailboxes, mut node) = crate::test_helpers::detached_handle(1, 2);
        let mut places = RingPlaces::default();
        ring.receive(&mut node, &mut places, TOKEN, b"xy");
        assert_eq!(places.token(), None);
        ring.receive(&mut node, &mut places, TOKEN, &3u32.to_be_bytes());
        assert_eq!(places.token(), Some(3));
    }
}
