//! Guarded transitions and the ordered registry that holds them.
//!
//! A [`Transition`] pairs a numeric identifier with a firing function. The
//! function receives a handle type `H` (the live runtime's
//! [`NodeHandle`](crate::context::NodeHandle) or the explorer's
//! [`ProcessView`](crate::statespace::ProcessView)) and the opaque place
//! storage `P`, and reports whether it fired. A transition that does not
//! fire must leave the places untouched.

use std::fmt;

/// Identifier of a transition within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionId(u32);

impl TransitionId {
    /// Create a transition identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self { Self(value) }

    /// Return the raw identifier.
    #[must_use]
    pub const fn as_u32(self) -> u32 { self.0 }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl From<u32> for TransitionId {
    fn from(value: u32) -> Self { Self(value) }
}

/// Outcome of a firing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Firing {
    /// The guard held and the transition changed the places.
    Fired,
    /// The guard did not hold; nothing changed.
    NotFired,
}

impl Firing {
    /// Returns `true` for [`Firing::Fired`].
    #[must_use]
    pub const fn fired(self) -> bool { matches!(self, Self::Fired) }
}

impl From<bool> for Firing {
    fn from(fired: bool) -> Self { if fired { Self::Fired } else { Self::NotFired } }
}

/// Firing function of a transition.
pub type FireFn<H, P> = fn(&mut H, &mut P) -> Firing;

/// Immutable pair of identifier and firing function.
pub struct Transition<H, P> {
    id: TransitionId,
    fire: FireFn<H, P>,
}

impl<H, P> Transition<H, P> {
    /// Create a transition.
    #[must_use]
    pub const fn new(id: TransitionId, fire: FireFn<H, P>) -> Self { Self { id, fire } }

    /// Identifier of this transition.
    #[must_use]
    pub const fn id(&self) -> TransitionId { self.id }

    /// Attempt to fire against `places`.
    pub fn fire(&self, handle: &mut H, places: &mut P) -> Firing { (self.fire)(handle, places) }
}

impl<H, P> Clone for Transition<H, P> {
    fn clone(&self) -> Self { *self }
}

impl<H, P> Copy for Transition<H, P> {}

impl<H, P> fmt::Debug for Transition<H, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Ordered list of transitions; registration order is scheduling order.
///
/// Identifiers are not checked for uniqueness. When an identifier is
/// registered twice, [`TransitionRegistry::find`] returns the first one.
pub struct TransitionRegistry<H, P> {
    transitions: Vec<Transition<H, P>>,
}

impl<H, P> TransitionRegistry<H, P> {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self { Self { transitions: Vec::new() } }

    /// Append a transition.
    pub fn register(&mut self, id: u32, fire: FireFn<H, P>) {
        self.transitions.push(Transition::new(TransitionId(id), fire));
    }

    /// First transition registered under `id`.
    #[must_use]
    pub fn find(&self, id: TransitionId) -> Option<Transition<H, P>> {
        self.transitions.iter().find(|t| t.id == id).copied()
    }

    /// Transition at scheduling position `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Transition<H, P>> {
        self.transitions.get(index).copied()
    }

    /// Number of registered transitions.
    #[must_use]
    pub fn len(&self) -> usize { self.transitions.len() }

    /// Returns `true` when nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.transitions.is_empty() }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Transition<H, P>> { self.transitions.iter() }
}

impl<H, P> Default for TransitionRegistry<H, P> {
    fn default() -> Self { Self::new() }
}

impl<H, P> fmt::Debug for TransitionRegistry<H, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.transitions.iter()).finish()
    }
}
