//! Driving the single-threaded runtime by hand.

#![expect(clippy::expect_used, reason = "test assertions")]

use tokenflow::{
    context::NodeHandle,
    error::RuntimeError,
    nets::ring::{FORWARD, TokenRing},
    program::NodeProgram,
    runtime::{Runtime, SimRuntime},
    topology::NodeId,
    transition::{Firing, TransitionId, TransitionRegistry},
};

/// Waits for a message nobody sends.
struct Waiter;

impl NodeProgram for Waiter {
    type Places = Option<u32>;

    fn init(
        &self,
        _node: &mut NodeHandle,
        transitions: &mut TransitionRegistry<NodeHandle, Option<u32>>,
    ) -> Option<u32> {
        transitions.register(0, |_: &mut NodeHandle, inbox: &mut Option<u32>| {
            Firing::from(inbox.take().is_some())
        });
        None
    }

    fn receive(&self, _node: &mut NodeHandle, inbox: &mut Option<u32>, message: u32, _payload: &[u8]) {
        *inbox = Some(message);
    }
}

#[test]
fn waiting_forever_is_reported_as_a_stall() {
    let mut sim = SimRuntime::new(2, &Waiter).expect("sim");
    let err = sim.run().expect_err("stall");
    assert!(matches!(err, RuntimeError::Stalled { steps: 2 }));
    assert!(!sim.is_finished());
}

#[test]
fn zero_nodes_are_rejected() {
    assert!(SimRuntime::new(0, &Waiter).is_err());
}

#[test]
fn stepping_a_ring_by_rounds_and_hand() {
    let ring = TokenRing::new(1);
    let mut sim = SimRuntime::new(2, &ring).expect("sim");
    let forward = TransitionId::new(FORWARD);

    assert_eq!(sim.fire(NodeId::new(0), forward).expect("fire"), Firing::Fired);
    assert_eq!(
        sim.report().to_string(),
        "<report nodes='2'>\
         <node id='0' halted='false'><ring holding='false' passes='1' /></node>\
         <node id='1' halted='false'><ring holding='true' passes='0' /></node>\
         </report>"
    );
    assert!(matches!(
        sim.fire(NodeId::new(1), TransitionId::new(9)),
        Err(RuntimeError::UnknownTransition { transition: 9, .. })
    ));

    while !sim.is_finished() {
        sim.round().expect("round");
    }
    assert!(sim.steps() > 0);
    let report = sim.report();
    assert!(
        report
            .children()
            .iter()
            .all(|node| node.attribute("halted") == Some("true"))
    );
}
