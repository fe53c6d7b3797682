//! Reachability graphs of small nets, checked end to end.

#![expect(clippy::expect_used, reason = "test assertions")]

use rstest::rstest;
use tokenflow::{
    nets::counter::CounterNet,
    statespace::{Explorer, GlobalState, NetDef, ProcessView},
    transition::{Firing, TransitionRegistry},
};

/// One transition per process that can fire exactly once.
#[derive(Debug)]
struct OneShot {
    transitions: TransitionRegistry<ProcessView, bool>,
}

fn fire_once(_view: &mut ProcessView, done: &mut bool) -> Firing {
    if *done {
        return Firing::NotFired;
    }
    *done = true;
    Firing::Fired
}

impl OneShot {
    fn new() -> Self {
        let mut transitions = TransitionRegistry::new();
        transitions.register(0, fire_once);
        Self { transitions }
    }
}

impl NetDef for OneShot {
    type Net = bool;

    fn spawn(&self, _view: &ProcessView) -> bool { false }

    fn transitions(&self) -> &TransitionRegistry<ProcessView, bool> { &self.transitions }
}

/// Two one-shot transitions, the second enabled only after the first.
#[derive(Debug)]
struct Chain {
    transitions: TransitionRegistry<ProcessView, u8>,
}

fn advance_from(stage: &mut u8, from: u8) -> Firing {
    if *stage != from {
        return Firing::NotFired;
    }
    *stage += 1;
    Firing::Fired
}

impl Chain {
    fn new() -> Self {
        let mut transitions = TransitionRegistry::new();
        transitions.register(0, |_: &mut ProcessView, stage: &mut u8| advance_from(stage, 0));
        transitions.register(1, |_: &mut ProcessView, stage: &mut u8| advance_from(stage, 1));
        Self { transitions }
    }
}

impl NetDef for Chain {
    type Net = u8;

    fn spawn(&self, _view: &ProcessView) -> u8 { 0 }

    fn transitions(&self) -> &TransitionRegistry<ProcessView, u8> { &self.transitions }
}

#[test]
fn independent_one_shots_form_a_diamond() {
    let net = OneShot::new();
    let mut explorer = Explorer::new(&net, 2);
    let mut dot = Vec::new();
    explorer.verify(&mut dot).expect("write dot");

    assert_eq!(explorer.state_count(), 4);
    assert_eq!(explorer.edge_count(), 4);
    assert_eq!(
        String::from_utf8(dot).expect("utf8"),
        "digraph statespace {\n\t\"s0\" -> \"s1\";\n\t\"s0\" -> \"s2\";\n\t\"s1\" -> \"s3\";\n\t\"s2\" -> \"s3\";\n}\n"
    );
    let both = GlobalState::from(vec![true, true]);
    let sink = explorer.find(&both).expect("joined state");
    assert!(explorer.node(sink).expect("sink node").successors().is_empty());
}

#[test]
fn gated_transitions_form_a_chain() {
    let net = Chain::new();
    let mut explorer = Explorer::new(&net, 1);
    explorer.generate();

    assert_eq!(explorer.state_count(), 3);
    assert_eq!(explorer.edge_count(), 2);
    let edges: Vec<_> = explorer
        .graph()
        .edges()
        .map(|(from, to)| (from.index(), to.index()))
        .collect();
    assert_eq!(edges, vec![(0, 1), (1, 2)]);
}

#[rstest]
#[case(1, 3, 4, 3)]
#[case(3, 1, 8, 12)]
#[case(2, 2, 9, 12)]
fn counter_space_has_closed_form_size(
    #[case] processes: u32,
    #[case] limit: u32,
    #[case] states: usize,
    #[case] edges: usize,
) {
    let net = CounterNet::new(limit);
    let mut explorer = Explorer::new(&net, processes);
    explorer.generate();
    assert!(explorer.is_complete());
    assert_eq!(explorer.state_count(), states);
    assert_eq!(explorer.edge_count(), edges);
    assert_eq!(explorer.graph().edges().count(), edges);
}

#[test]
fn a_net_that_never_fires_has_only_its_root() {
    let net = OneShot::new();
    let mut explorer = Explorer::new(&net, 0);
    explorer.generate();
    assert_eq!(explorer.state_count(), 1);
    assert_eq!(explorer.edge_count(), 0);
    assert_eq!(explorer.graph().to_dot("empty"), "digraph empty {\n}\n");
}
