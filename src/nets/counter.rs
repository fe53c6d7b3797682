//! A net of independent bounded counters.
//!
//! Every process owns one counter that an `increment` transition raises
//! until it reaches the limit, so `p` processes reach exactly
//! `(limit + 1)^p` global states.

use crate::{
    statespace::{NetDef, ProcessView},
    transition::{Firing, TransitionRegistry},
};

/// Transition id of the increment transition.
pub const INCREMENT: u32 = 0;

/// Per-process snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Counter {
    value: u32,
    limit: u32,
}

impl Counter {
    /// Current value.
    #[must_use]
    pub const fn value(&self) -> u32 { self.value }
}

fn increment(_view: &mut ProcessView, counter: &mut Counter) -> Firing {
    if counter.value >= counter.limit {
        return Firing::NotFired;
    }
    counter.value += 1;
    Firing::Fired
}

/// Counter net definition.
#[derive(Debug)]
pub struct CounterNet {
    limit: u32,
    transitions: TransitionRegistry<ProcessView, Counter>,
}

impl CounterNet {
    /// Counters that stop at `limit`.
    #[must_use]
    pub fn new(limit: u32) -> Self {
        let mut transitions = TransitionRegistry::new();
        transitions.register(INCREMENT, increment);
        Self { limit, transitions }
    }
}

impl NetDef for CounterNet {
    type Net = Counter;

    fn spawn(&self, _view: &ProcessView) -> Counter {
        Counter {
            value: 0,
            limit: self.limit,
        }
    }

    fn transitions(&self) -> &TransitionRegistry<ProcessView, Counter> { &self.transitions }
}
