//! Round-robin transition scheduling with a progress marker.
//!
//! The scheduler walks a context's transitions circularly. It remembers the
//! last transition that fired; coming back around to it means a full circuit
//! found nothing else to fire, so the context is at a quiescent point. Only
//! there does the caller block for messages or honour the halt flag.
//!
//! Any transition that stays enabled is tried within one circuit of the
//! last success, which gives weak fairness.

use crate::{
    context::Context,
    transition::{Firing, TransitionId},
};

/// Outcome of one scheduler step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A transition fired during the normal circuit and became the new
    /// progress marker.
    Fired(TransitionId),
    /// The candidate was not enabled; keep scanning.
    Skipped,
    /// The circuit came back to the marker and it fired again.
    Settled(TransitionId),
    /// The circuit came back to the marker and nothing fired, or the context
    /// has no transitions. The caller should wait for messages.
    Starved,
}

impl Step {
    /// Whether a transition fired in this step.
    #[must_use]
    pub const fn fired(self) -> bool { matches!(self, Self::Fired(_) | Self::Settled(_)) }

    /// Whether this step reached the quiescent check point.
    #[must_use]
    pub const fn is_quiescent(self) -> bool { matches!(self, Self::Settled(_) | Self::Starved) }
}

/// Per-context scheduling cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FairScheduler {
    next: usize,
    last_executed: usize,
}

impl FairScheduler {
    /// Start a scheduler whose first candidate differs from the progress
    /// marker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: 1,
            last_executed: 0,
        }
    }

    /// Try the next candidate transition of `ctx`.
    pub fn step<P>(&mut self, ctx: &mut Context<P>) -> Step {
        let count = ctx.transitions().len();
        if count == 0 {
            return Step::Starved;
        }
        if self.next >= count {
            self.next = 0;
        }
        let candidate = self.next;
        self.next += 1;
        let Some(id) = ctx.transitions().get(candidate).map(|t| t.id()) else {
            return Step::Starved;
        };
        match (candidate == self.last_executed, ctx.fire(candidate)) {
            (true, Firing::Fired) => Step::Settled(id),
            (true, Firing::NotFired) => Step::Starved,
            (false, Firing::Fired) => {
                self.last_executed = candidate;
                Step::Fired(id)
            }
            (false, Firing::NotFired) => Step::Skipped,
        }
    }
}

impl Default for FairScheduler {
    fn default() -> Self { Self::new() }
}
