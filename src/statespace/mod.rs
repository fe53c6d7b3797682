//! Explicit-state exploration of a net's reachable global states.
//!
//! A global state holds one net snapshot per process. From the initial
//! state, the [`Explorer`] fires every transition of every process against
//! its own copy of the state, keeping one canonical node per distinct
//! result, until no unexpanded node remains. The outcome is a deduplicated
//! reachability graph; see [`graph`].

pub mod graph;

use std::{
    collections::HashMap,
    fmt,
    hash::{DefaultHasher, Hash, Hasher},
    io,
};

use tracing::debug;

pub use self::graph::ReachabilityGraph;
use crate::transition::TransitionRegistry;

/// Identity of the process a transition fires for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessView {
    process: u32,
    process_count: u32,
}

impl ProcessView {
    /// View of `process` among `process_count` processes.
    #[must_use]
    pub const fn new(process: u32, process_count: u32) -> Self {
        Self {
            process,
            process_count,
        }
    }

    /// Index of this process.
    #[must_use]
    pub const fn process(&self) -> u32 { self.process }

    /// Number of processes in the exploration.
    #[must_use]
    pub const fn process_count(&self) -> u32 { self.process_count }
}

/// Net definition consumed by the explorer.
///
/// Copying a snapshot is [`Clone`], equality is [`Eq`] and fingerprinting is
/// [`Hash`]; equal snapshots must hash equally.
pub trait NetDef {
    /// Per-process net snapshot.
    type Net: Clone + Eq + Hash;

    /// Initial snapshot for a process.
    fn spawn(&self, view: &ProcessView) -> Self::Net;

    /// Transitions tried, in order, for every process.
    fn transitions(&self) -> &TransitionRegistry<ProcessView, Self::Net>;
}

/// One snapshot per process, indexed by process id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalState<N>(Box<[N]>);

impl<N> GlobalState<N> {
    /// Per-process snapshots.
    #[must_use]
    pub fn processes(&self) -> &[N] { &self.0 }

    /// Snapshot of `process`.
    #[must_use]
    pub fn process(&self, process: usize) -> Option<&N> { self.0.get(process) }
}

impl<N> From<Vec<N>> for GlobalState<N> {
    fn from(processes: Vec<N>) -> Self { Self(processes.into_boxed_slice()) }
}

/// Handle of a canonical state owned by an [`Explorer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    /// Position of the state in discovery order.
    #[must_use]
    pub const fn index(self) -> usize { self.0 }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "s{}", self.0) }
}

/// A canonical global state and the edges discovered out of it.
#[derive(Debug)]
pub struct StateNode<N> {
    state: GlobalState<N>,
    successors: Vec<StateId>,
}

impl<N> StateNode<N> {
    /// The global state.
    #[must_use]
    pub const fn state(&self) -> &GlobalState<N> { &self.state }

    /// One entry per successful firing, in firing order. A successor may
    /// appear more than once.
    #[must_use]
    pub fn successors(&self) -> &[StateId] { &self.successors }
}

fn fingerprint<N: Hash>(state: &GlobalState<N>) -> u64 {
    let mut hasher = DefaultHasher::new();
    state.hash(&mut hasher);
    hasher.finish()
}

/// Builds the reachability graph of a [`NetDef`].
///
/// Canonical nodes live in an arena owned by the explorer and are released
/// together when it drops. Fingerprint collisions fall back to full state
/// equality within the bucket.
pub struct Explorer<'d, D: NetDef> {
    def: &'d D,
    views: Box<[ProcessView]>,
    nodes: Vec<StateNode<D::Net>>,
    canonical: HashMap<u64, Vec<StateId>>,
    pending: Vec<StateId>,
    edges: usize,
}

impl<'d, D: NetDef> Explorer<'d, D> {
    /// Spawn the initial state for `processes` processes and register it as
    /// the root.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokenflow::{nets::counter::CounterNet, statespace::Explorer};
    ///
    /// let net = CounterNet::new(2);
    /// let mut explorer = Explorer::new(&net, 2);
    /// explorer.generate();
    /// assert_eq!(explorer.state_count(), 9);
    /// ```
    #[must_use]
    pub fn new(def: &'d D, processes: u32) -> Self {
        let views: Box<[ProcessView]> = (0..processes)
            .map(|process| ProcessView::new(process, processes))
            .collect();
        let initial: Vec<D::Net> = views.iter().map(|view| def.spawn(view)).collect();
        let mut explorer = Self {
            def,
            views,
            nodes: Vec::new(),
            canonical: HashMap::new(),
            pending: Vec::new(),
            edges: 0,
        };
        explorer.canonicalize(GlobalState::from(initial));
        explorer
    }

    /// Expand states until every reachable state has been expanded once.
    ///
    /// Terminates only if the net's reachable state space is finite.
    pub fn generate(&mut self) {
        while let Some(id) = self.pending.pop() {
            self.expand(id);
        }
        debug!(
            states = self.nodes.len(),
            edges = self.edges,
            "state space generated"
        );
    }

    fn expand(&mut self, id: StateId) {
        let def = self.def;
        let mut successors = Vec::new();
        for process in 0..self.views.len() {
            let Some(base_view) = self.views.get(process).copied() else {
                break;
            };
            let mut candidate: Option<GlobalState<D::Net>> = None;
            for transition in def.transitions().iter() {
                if candidate.is_none() {
                    candidate = self.nodes.get(id.0).map(|node| node.state.clone());
                }
                let Some(state) = candidate.as_mut() else {
                    return;
                };
                let Some(net) = state.0.get_mut(process) else {
                    break;
                };
                let mut view = base_view;
                if transition.fire(&mut view, net).fired() {
                    if let Some(next) = candidate.take() {
                        successors.push(self.canonicalize(next));
                    }
                }
            }
        }
        self.edges += successors.len();
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.successors = successors;
        }
    }

    fn canonicalize(&mut self, state: GlobalState<D::Net>) -> StateId {
        let bucket = self.canonical.entry(fingerprint(&state)).or_default();
        let nodes = &self.nodes;
        if let Some(existing) = bucket
            .iter()
            .find(|id| nodes.get(id.0).is_some_and(|node| node.state == state))
        {
            return *existing;
        }
        let id = StateId(self.nodes.len());
        self.nodes.push(StateNode {
            state,
            successors: Vec::new(),
        });
        bucket.push(id);
        self.pending.push(id);
        id
    }

    /// The initial state.
    #[must_use]
    pub const fn root(&self) -> StateId { StateId(0) }

    /// Number of canonical states discovered so far.
    #[must_use]
    pub fn state_count(&self) -> usize { self.nodes.len() }

    /// Number of edges discovered so far.
    #[must_use]
    pub const fn edge_count(&self) -> usize { self.edges }

    /// Whether states remain to be expanded.
    #[must_use]
    pub fn is_complete(&self) -> bool { self.pending.is_empty() }

    /// Canonical node `id`.
    #[must_use]
    pub fn node(&self, id: StateId) -> Option<&StateNode<D::Net>> { self.nodes.get(id.0) }

    /// Canonical handle of a state equal to `state`, if discovered.
    #[must_use]
    pub fn find(&self, state: &GlobalState<D::Net>) -> Option<StateId> {
        self.canonical
            .get(&fingerprint(state))?
            .iter()
            .copied()
            .find(|id| self.nodes.get(id.0).is_some_and(|node| &node.state == state))
    }

    /// Borrow the graph discovered so far.
    #[must_use]
    pub fn graph(&self) -> ReachabilityGraph<'_, D::Net> { ReachabilityGraph::new(&self.nodes) }

    /// Generate the full graph if needed and write it to `out` in DOT
    /// format.
    ///
    /// # Errors
    ///
    /// Propagates errors from `out`.
    pub fn verify<W: io::Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.generate();
        self.graph().write_dot("statespace", out)
    }
}

impl<D: NetDef> fmt::Debug for Explorer<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Explorer")
            .field("processes", &self.views.len())
            .field("states", &self.nodes.len())
            .field("edges", &self.edges)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
