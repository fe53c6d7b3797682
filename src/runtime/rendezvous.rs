//! Two-phase rendezvous: everyone arrives, one elected leader acts while the
//! rest wait, then everyone leaves together.

use std::sync::Barrier;

/// Reusable whole-runtime rendezvous point.
#[derive(Debug)]
pub struct Rendezvous {
    arrive: Barrier,
    depart: Barrier,
}

impl Rendezvous {
    /// Create a rendezvous for `parties` participants.
    #[must_use]
    pub fn new(parties: usize) -> Self {
        Self {
            arrive: Barrier::new(parties),
            depart: Barrier::new(parties),
        }
    }

    /// Block until all parties arrive, run `leader` on exactly one of them,
    /// then block until all parties are past the action.
    ///
    /// Returns the leader's result on the elected party and `None` on the
    /// others.
    pub fn run<T>(&self, leader: impl FnOnce() -> T) -> Option<T> {
        let elected = self.arrive.wait().is_leader();
        let outcome = elected.then(leader);
        self.depart.wait();
        outcome
    }
}
