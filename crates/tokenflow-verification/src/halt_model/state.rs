//! State and action types for the halt model.

/// Packet kinds carried by a worker mailbox.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Message {
    /// Application data addressed to a node on the worker.
    Data,
    /// The halt control packet.
    Halt,
}

/// One worker thread, abstracted to its mailbox and lifecycle flags.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct WorkerState {
    /// Pending packets, oldest first. Draining visits them newest first.
    pub mailbox: Vec<Message>,
    /// Whether the worker's nodes have observed a halt.
    pub halted: bool,
    /// Whether the worker has left its loop.
    pub retired: bool,
    /// Remaining data packets this worker may still send.
    pub sends_left: u8,
    /// Whether a data packet was delivered after the halt flag was set.
    pub delivered_after_halt: bool,
    /// Whether packets were still queued when the worker retired.
    pub abandoned_mail: bool,
}

impl WorkerState {
    /// Whether a halt packet is waiting in the mailbox.
    #[must_use]
    pub fn halt_pending(&self) -> bool { self.mailbox.contains(&Message::Halt) }
}

/// Global state: every worker of the runtime.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SystemState {
    /// Workers indexed by worker id.
    pub workers: Vec<WorkerState>,
}

impl SystemState {
    /// Fresh state with `workers` idle workers.
    #[must_use]
    pub fn new(workers: usize, sends_per_worker: u8) -> Self {
        Self {
            workers: (0..workers)
                .map(|_| WorkerState {
                    sends_left: sends_per_worker,
                    ..WorkerState::default()
                })
                .collect(),
        }
    }

    /// Worker `index`, if present.
    #[must_use]
    pub fn worker(&self, index: usize) -> Option<&WorkerState> { self.workers.get(index) }
}

/// Steps the model checker may take.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Action {
    /// A running worker pushes a data packet into another worker's mailbox.
    Send {
        /// Sending worker.
        from: usize,
        /// Receiving worker.
        to: usize,
    },
    /// The quitting node halts itself and broadcasts halt to every other worker.
    Quit {
        /// Worker hosting the quitting node.
        worker: usize,
    },
    /// A worker takes its whole mailbox and dispatches it newest first.
    Drain {
        /// Draining worker.
        worker: usize,
    },
    /// A halted worker leaves its loop; packets still queued are abandoned.
    Retire {
        /// Retiring worker.
        worker: usize,
    },
}

/// Apply `action` to a copy of `state`.
#[must_use]
pub fn apply_action(state: &SystemState, action: Action) -> SystemState {
    let mut next = state.clone();
    match action {
        Action::Send { from, to } => {
            if let Some(sender) = next.workers.get_mut(from) {
                sender.sends_left = sender.sends_left.saturating_sub(1);
            }
            if let Some(receiver) = next.workers.get_mut(to).filter(|w| !w.retired) {
                receiver.mailbox.push(Message::Data);
            }
        }
        Action::Quit { worker } => {
            for (index, target) in next.workers.iter_mut().enumerate() {
                if index == worker {
                    target.halted = true;
                } else {
                    target.mailbox.push(Message::Halt);
                }
            }
        }
        Action::Drain { worker } => {
            if let Some(target) = next.workers.get_mut(worker) {
                let batch = std::mem::take(&mut target.mailbox);
                for message in batch.into_iter().rev() {
                    match message {
                        Message::Halt => target.halted = true,
                        Message::Data if target.halted => target.delivered_after_halt = true,
                        Message::Data => {}
                    }
                }
            }
        }
        Action::Retire { worker } => {
            if let Some(target) = next.workers.get_mut(worker) {
                target.retired = true;
                target.abandoned_mail = !target.mailbox.is_empty();
                target.mailbox.clear();
            }
        }
    }
    next
}
