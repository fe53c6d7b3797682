//! Stateright model of the threaded runtime's halt protocol.
//!
//! Each worker owns a LIFO mailbox. One node quits: it sets its own halt flag
//! and pushes a halt packet to every other worker. Workers take their whole
//! mailbox at once and dispatch it newest first, so a data packet queued
//! before the halt is handled after it. A halted worker may leave its loop at
//! any quiescent point, even with packets still queued; those are never
//! dispatched. The model checks that no worker retires early and that
//! shutdown always completes.
//!
//! # Example
//!
//! ```
//! use stateright::{Checker, Model};
//! use tokenflow_verification::halt_model::HaltModel;
//!
//! let checker = HaltModel::default().checker().spawn_bfs().join();
//! assert!(checker.is_done());
//! ```

pub mod properties;
pub mod state;

use stateright::{Model, Property};

use self::{
    properties::{
        can_batch_data_with_halt,
        can_deliver_after_halt,
        can_retire_with_mail,
        every_worker_retires,
        halt_is_pending_everywhere,
        retired_workers_are_halted,
    },
    state::{Action, SystemState, apply_action},
};

/// Configuration of the halt model.
#[derive(Clone, Debug)]
pub struct HaltModel {
    /// Number of workers.
    pub workers: usize,
    /// Data packets each worker may send before halting.
    pub sends_per_worker: u8,
    /// Worker hosting the node that quits.
    pub quitter: usize,
}

impl Default for HaltModel {
    fn default() -> Self {
        Self {
            workers: 3,
            sends_per_worker: 1,
            quitter: 0,
        }
    }
}

impl HaltModel {
    /// Model with `workers` workers; zero is raised to one.
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            ..Self::default()
        }
    }

    fn push_send_actions(&self, state: &SystemState, actions: &mut Vec<Action>, from: usize) {
        let Some(sender) = state.worker(from) else {
            return;
        };
        if sender.halted || sender.sends_left == 0 {
            return;
        }
        actions.extend(
            (0..self.workers)
                .filter(|to| *to != from)
                .map(|to| Action::Send { from, to }),
        );
    }
}

impl Model for HaltModel {
    type State = SystemState;
    type Action = Action;

    fn init_states(&self) -> Vec<Self::State> {
        vec![SystemState::new(self.workers, self.sends_per_worker)]
    }

    fn actions(&self, state: &Self::State, actions: &mut Vec<Self::Action>) {
        for worker in 0..self.workers {
            let Some(current) = state.worker(worker) else {
                continue;
            };
            if current.retired {
                continue;
            }
            self.push_send_actions(state, actions, worker);
            if worker == self.quitter && !current.halted {
                actions.push(Action::Quit { worker });
            }
            if !current.mailbox.is_empty() {
                actions.push(Action::Drain { worker });
            }
            if current.halted {
                actions.push(Action::Retire { worker });
            }
        }
    }

    fn next_state(&self, state: &Self::State, action: Self::Action) -> Option<Self::State> {
        Some(apply_action(state, action))
    }

    fn properties(&self) -> Vec<Property<Self>> {
        vec![
            retired_workers_are_halted(),
            halt_is_pending_everywhere(),
            every_worker_retires(),
            can_deliver_after_halt(),
            can_batch_data_with_halt(),
            can_retire_with_mail(),
        ]
    }
}
