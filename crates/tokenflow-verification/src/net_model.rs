//! Stateright rendition of a [`NetDef`] for cross-checking the explorer.
//!
//! Each action fires one transition of one process. A firing that reports
//! [`Firing::NotFired`](tokenflow::transition::Firing) yields no successor,
//! matching how [`Explorer`](tokenflow::statespace::Explorer) discards the
//! attempted copy. Stateright deduplicates states by hash, so its unique state
//! count must agree with the explorer's.

use std::fmt::Debug;

use stateright::Model;
use tokenflow::statespace::{GlobalState, NetDef, ProcessView};

/// A transition firing: process index and transition position.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Fire {
    /// Process whose snapshot is modified.
    pub process: u32,
    /// Position of the transition in the net's registry.
    pub transition: usize,
}

/// A net definition explored by Stateright.
#[derive(Debug)]
pub struct NetModel<D> {
    def: D,
    processes: u32,
}

impl<D: NetDef> NetModel<D> {
    /// Explore `def` with `processes` processes.
    #[must_use]
    pub const fn new(def: D, processes: u32) -> Self { Self { def, processes } }

    /// Number of processes.
    #[must_use]
    pub const fn processes(&self) -> u32 { self.processes }
}

impl<D> Model for NetModel<D>
where
    D: NetDef,
    D::Net: Debug,
{
    type State = GlobalState<D::Net>;
    type Action = Fire;

    fn init_states(&self) -> Vec<Self::State> {
        let nets: Vec<D::Net> = (0..self.processes)
            .map(|process| self.def.spawn(&ProcessView::new(process, self.processes)))
            .collect();
        vec![GlobalState::from(nets)]
    }

    fn actions(&self, _state: &Self::State, actions: &mut Vec<Self::Action>) {
        let transitions = self.def.transitions().len();
        for process in 0..self.processes {
            actions.extend((0..transitions).map(|transition| Fire {
                process,
                transition,
            }));
        }
    }

    fn next_state(&self, state: &Self::State, action: Self::Action) -> Option<Self::State> {
        let transition = self.def.transitions().get(action.transition)?;
        let mut nets = state.processes().to_vec();
        let net = nets.get_mut(usize::try_from(action.process).ok()?)?;
        let mut view = ProcessView::new(action.process, self.processes);
        transition
            .fire(&mut view, net)
            .fired()
            .then(|| GlobalState::from(nets))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use stateright::Checker;
    use tokenflow::{
        nets::counter::CounterNet,
        statespace::Explorer,
    };

    use super::*;

    #[rstest]
    #[case(1, 3)]
    #[case(2, 1)]
    #[case(2, 2)]
    #[case(3, 1)]
    fn stateright_agrees_with_explorer(#[case] processes: u32, #[case] limit: u32) {
        let net = CounterNet::new(limit);
        let mut explorer = Explorer::new(&net, processes);
        explorer.generate();
        let checker = NetModel::new(CounterNet::new(limit), processes)
            .checker()
            .spawn_bfs()
            .join();
        assert!(checker.is_done());
        assert_eq!(checker.unique_state_count(), explorer.state_count());
    }

    #[test]
    fn exhausted_transition_has_no_successor() {
        let model = NetModel::new(CounterNet::new(0), 1);
        let init = model.init_states();
        let state = init.first().expect("initial state");
        let action = Fire {
            process: 0,
            transition: 0,
        };
        assert!(model.next_state(state, action).is_none());
    }
}
