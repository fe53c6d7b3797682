//! One worker's scheduling and dispatch loop.
//!
//! A worker owns the contexts of its nodes. Each call to
//! [`Worker::advance`] runs one scheduler step for one node; fires are
//! followed by a single non-blocking drain of the worker's queue. When every
//! live node is starved and the drain finds nothing, the worker reports
//! [`Progress::Stalled`] and the driving runtime decides how to wait.

use std::{path::Path, sync::Arc};

use tracing::{debug, warn};

use super::Shared;
use crate::{
    context::{Context, NodeHandle},
    error::RuntimeError,
    output::Output,
    packet::{ControlCommand, MessageKind, Packet},
    program::NodeProgram,
    scheduler::{FairScheduler, Step},
    topology::{NodeId, WorkerId},
    tracelog::LogSegment,
    transition::{Firing, TransitionId},
};

/// Result of one [`Worker::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    /// Keep scheduling.
    Running,
    /// Every live node is starved and no packet is pending for this worker.
    Stalled,
}

/// Counters reported when a run finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WorkerStats {
    pub(crate) fired: u64,
    pub(crate) delivered: u64,
}

struct Slot<P> {
    ctx: Context<P>,
    scheduler: FairScheduler,
    // A packet reached this node since it last starved.
    dirty: bool,
    waiting: bool,
    done: bool,
}

fn find_slot<P>(slots: &mut [Slot<P>], node: NodeId) -> Option<&mut Slot<P>> {
    let index = slots.binary_search_by_key(&node, |slot| slot.ctx.node()).ok()?;
    slots.get_mut(index)
}

pub(crate) struct Worker<'p, N: NodeProgram + ?Sized> {
    id: WorkerId,
    program: &'p N,
    shared: Arc<Shared>,
    slots: Vec<Slot<N::Places>>,
    live: usize,
    segment: Option<LogSegment>,
    stats: WorkerStats,
}

impl<'p, N: NodeProgram + ?Sized> Worker<'p, N> {
    /// Initialise a context for every node `id` owns, in ascending node
    /// order.
    pub(crate) fn new(id: WorkerId, program: &'p N, shared: Arc<Shared>) -> Self {
        let slots: Vec<_> = shared
            .router
            .topology()
            .nodes_of(id)
            .map(|node| Slot {
                ctx: Context::init(program, NodeHandle::new(node, shared.router.clone())),
                scheduler: FairScheduler::new(),
                dirty: false,
                waiting: false,
                done: false,
            })
            .collect();
        debug!(worker = %id, nodes = slots.len(), "worker initialised");
        Self {
            id,
            program,
            shared,
            live: slots.len(),
            slots,
            segment: None,
            stats: WorkerStats::default(),
        }
    }

    pub(crate) const fn live(&self) -> usize { self.live }

    pub(crate) const fn slot_count(&self) -> usize { self.slots.len() }

    pub(crate) const fn stats(&self) -> WorkerStats { self.stats }

    /// Run one scheduler step for the node in slot `index`.
    pub(crate) fn advance(&mut self, index: usize) -> Progress {
        let Some(slot) = self.slots.get_mut(index) else {
            return Progress::Running;
        };
        if slot.done {
            return Progress::Running;
        }
        let node = slot.ctx.node();
        let step = slot.scheduler.step(&mut slot.ctx);
        match step {
            Step::Fired(transition) => {
                self.record_fire(node, transition);
                self.receive();
                Progress::Running
            }
            Step::Settled(transition) => {
                self.record_fire(node, transition);
                self.receive();
                self.retire_if_halted(index);
                Progress::Running
            }
            Step::Skipped => Progress::Running,
            Step::Starved => self.starve(index),
        }
    }

    fn starve(&mut self, index: usize) -> Progress {
        if self.retire_if_halted(index) {
            return Progress::Running;
        }
        if let Some(slot) = self.slots.get_mut(index) {
            // A packet that arrived mid-circuit may have enabled a transition
            // the scheduler already passed over; give it one more circuit.
            slot.waiting = !slot.dirty;
            slot.dirty = false;
        }
        if !self.all_waiting() {
            return Progress::Running;
        }
        if self.receive() > 0 {
            self.retire_if_halted(index);
            return Progress::Running;
        }
        Progress::Stalled
    }

    fn all_waiting(&self) -> bool { self.slots.iter().all(|slot| slot.done || slot.waiting) }

    fn retire_if_halted(&mut self, index: usize) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if slot.done {
            return true;
        }
        if !slot.ctx.halted() {
            return false;
        }
        slot.done = true;
        self.live -= 1;
        debug!(worker = %self.id, node = %slot.ctx.node(), "node halted");
        true
    }

    fn record_fire(&mut self, node: NodeId, transition: TransitionId) {
        self.stats.fired += 1;
        if let Some(segment) = self.segment.as_mut() {
            segment.fire(node, transition);
        }
    }

    /// Drain the worker's queue once without blocking and dispatch every
    /// packet. Returns the number of packets processed.
    pub(crate) fn receive(&mut self) -> usize {
        let batch = self.shared.mailboxes.take_all(self.id);
        let mut processed = 0;
        for packet in batch {
            processed += 1;
            self.dispatch(&packet);
        }
        if processed > 0 {
            if let Some(segment) = self.segment.as_mut() {
                segment.receive(processed);
                if let Err(error) = segment.flush(&self.shared.trace) {
                    warn!(worker = %self.id, %error, "failed to write trace log");
                }
            }
        }
        processed
    }

    fn dispatch(&mut self, packet: &Packet) {
        let target = packet.target();
        match packet.message().kind() {
            MessageKind::Data(message) => {
                let program = self.program;
                let Some(slot) = find_slot(&mut self.slots, target) else {
                    warn!(worker = %self.id, node = %target, "packet for a node this worker does not own");
                    return;
                };
                slot.dirty = true;
                slot.waiting = false;
                if slot.done {
                    debug!(node = %target, message_id = message, "dropping packet for halted node");
                    return;
                }
                let (handle, places) = slot.ctx.split();
                program.receive(handle, places, message, packet.payload());
                self.stats.delivered += 1;
            }
            MessageKind::Control(ControlCommand::Halt) => {
                if let Some(slot) = find_slot(&mut self.slots, target) {
                    slot.ctx.halt();
                    slot.dirty = true;
                    slot.waiting = false;
                }
            }
            MessageKind::Control(ControlCommand::StartLog) => {
                self.start_log(&String::from_utf8_lossy(packet.payload()));
            }
            MessageKind::Control(ControlCommand::StopLog) => self.stop_log(),
            MessageKind::Unknown(message) => {
                warn!(worker = %self.id, node = %target, opcode = message, "ignoring unknown control message");
            }
        }
    }

    fn start_log(&mut self, path: &str) {
        let trace = &self.shared.trace;
        if let Some(Err(error)) = self.shared.rendezvous.run(|| trace.open(Path::new(path))) {
            warn!(%error, path, "failed to open trace log");
        }
        self.segment = Some(LogSegment::new(self.id));
        debug!(worker = %self.id, path, "trace logging started");
    }

    fn stop_log(&mut self) {
        let trace = &self.shared.trace;
        if let Some(mut segment) = self.segment.take() {
            if let Err(error) = segment.flush(trace) {
                warn!(worker = %self.id, %error, "failed to write trace log");
            }
        }
        if let Some(Err(error)) = self.shared.rendezvous.run(|| trace.close()) {
            warn!(%error, "failed to close trace log");
        }
        debug!(worker = %self.id, "trace logging stopped");
    }

    /// Fire transition `transition` of `node` on request, outside the
    /// scheduler's circuit. A successful fire drains the queue once.
    pub(crate) fn fire_manual(&mut self, node: NodeId, transition: TransitionId) -> Result<Firing, RuntimeError> {
        let slot = find_slot(&mut self.slots, node).ok_or(RuntimeError::UnknownNode(node))?;
        let firing = slot
            .ctx
            .fire_by_id(transition)
            .ok_or(RuntimeError::UnknownTransition {
                node,
                transition: transition.as_u32(),
            })?;
        if firing.fired() {
            slot.dirty = true;
            slot.waiting = false;
            self.record_fire(node, transition);
            self.receive();
        }
        Ok(firing)
    }

    /// Append one `node` block per context to `out`.
    pub(crate) fn report(&self, out: &mut Output) {
        for slot in &self.slots {
            out.child("node");
            out.set("id", slot.ctx.node());
            out.set("halted", slot.ctx.halted());
            self.program.report(slot.ctx.handle(), slot.ctx.places(), out);
            // Nested under the caller's root, so this never yields a tree.
            let _closed = out.back();
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tracing::Level;

    use super::*;
    use crate::{
        packet::{MessageId, PacketBuf, PacketHeader},
        test_helpers::tracing::capture_events_at,
        topology::Topology,
        transition::TransitionRegistry,
    };

    /// Records every data packet; never fires anything.
    struct Inbox;

    impl NodeProgram for Inbox {
        type Places = Vec<(u32, Vec<u8>)>;

        fn init(
            &self,
            _node: &mut NodeHandle,
            _transitions: &mut TransitionRegistry<NodeHandle, Self::Places>,
        ) -> Self::Places {
            Vec::new()
        }

        fn receive(&self, _node: &mut NodeHandle, places: &mut Self::Places, message: u32, payload: &[u8]) {
            places.push((message, payload.to_vec()));
        }
    }

    fn worker(program: &Inbox) -> (Arc<Shared>, Worker<'_, Inbox>) {
        let shared = Shared::new(Topology::new(2, 1).expect("topology"));
        let worker = Worker::new(WorkerId::new(0), program, Arc::clone(&shared));
        (shared, worker)
    }

    fn send(shared: &Shared, node: u32, message: MessageId) {
        shared
            .router
            .send(NodeId::new(node), message, PacketBuf::from_payload(b"p"))
            .expect("send");
    }

    #[test]
    fn stalls_once_every_node_starves_without_mail() {
        let (_shared, mut worker) = worker(&Inbox);
        assert_eq!(worker.advance(0), Progress::Running);
        assert_eq!(worker.advance(1), Progress::Stalled);
    }

    #[test]
    fn mail_for_a_waiting_node_grants_another_circuit() {
        let (shared, mut worker) = worker(&Inbox);
        assert_eq!(worker.advance(0), Progress::Running);
        send(&shared, 0, MessageId::data(3).expect("id"));
        assert_eq!(worker.advance(1), Progress::Running);
        assert_eq!(worker.stats().delivered, 1);
        assert_eq!(worker.advance(0), Progress::Running);
        assert_eq!(worker.advance(1), Progress::Running);
        assert_eq!(worker.advance(0), Progress::Stalled);
    }

    #[test]
    fn halted_node_retires_and_drops_later_mail() {
        let (shared, mut worker) = worker(&Inbox);
        send(&shared, 0, MessageId::HALT);
        assert_eq!(worker.receive(), 1);
        assert_eq!(worker.advance(0), Progress::Running);
        assert_eq!(worker.live(), 1);

        send(&shared, 0, MessageId::data(1).expect("id"));
        send(&shared, 1, MessageId::data(2).expect("id"));
        assert_eq!(worker.receive(), 2);
        assert_eq!(worker.stats().delivered, 1);
    }

    #[test]
    fn unknown_control_message_is_logged_and_ignored() {
        let (shared, mut worker) = worker(&Inbox);
        let header = PacketHeader {
            target: NodeId::new(1),
            message: MessageId::from_raw(-9),
            size: 0,
        };
        let packet = Packet::from_frame(Bytes::copy_from_slice(&header.to_bytes())).expect("frame");
        shared.router.forward(packet).expect("forward");

        let events = capture_events_at(Level::WARN, || {
            assert_eq!(worker.receive(), 1);
        });
        let event = events.first().expect("warning");
        assert_eq!(event.level(), Level::WARN);
        assert_eq!(event.message(), Some("ignoring unknown control message"));
        assert_eq!(event.field("opcode"), Some("-9"));
        assert_eq!(event.field("node"), Some("1"));
        assert_eq!(worker.stats().delivered, 0);
    }

    #[test]
    fn manual_fire_rejects_unknown_targets() {
        let (_shared, mut worker) = worker(&Inbox);
        assert!(matches!(
            worker.fire_manual(NodeId::new(0), TransitionId::new(0)),
            Err(RuntimeError::UnknownTransition { transition: 0, .. })
        ));
        assert!(matches!(
            worker.fire_manual(NodeId::new(5), TransitionId::new(0)),
            Err(RuntimeError::UnknownNode(_))
        ));
    }
}
