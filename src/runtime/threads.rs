//! Multi-threaded runtime: one OS thread per worker.

use std::{
    fmt,
    ops::Range,
    sync::Arc,
    thread::{self, ScopedJoinHandle},
};

use tracing::{debug, error, warn};

use super::{
    RunSummary,
    Runtime,
    Shared,
    worker::{Progress, Worker, WorkerStats},
};
use crate::{
    error::{ConfigError, RuntimeError},
    packet::MessageId,
    program::NodeProgram,
    topology::{Topology, WorkerId},
    transport::{Mailboxes, Partitioned, Router, Transport},
};

/// Runs each hosted worker's nodes on a dedicated thread and joins them all.
///
/// By default every worker of the topology is hosted. A linked runtime
/// hosts a contiguous range of workers and sends packets for the others
/// through a remote [`Transport`]; packets arriving from elsewhere enter
/// through [`ThreadedRuntime::inbound`].
pub struct ThreadedRuntime<'p, N> {
    topology: Topology,
    program: &'p N,
    hosted: Range<u32>,
    mailboxes: Arc<Mailboxes>,
    transport: Arc<dyn Transport>,
}

impl<'p, N: NodeProgram> ThreadedRuntime<'p, N> {
    /// Prepare a runtime for `program` hosting every worker of `topology`.
    #[must_use]
    pub fn new(topology: Topology, program: &'p N) -> Self {
        let mailboxes = Arc::new(Mailboxes::new(topology.worker_count()));
        let transport = Arc::clone(&mailboxes) as Arc<dyn Transport>;
        Self {
            topology,
            program,
            hosted: 0..topology.worker_count(),
            mailboxes,
            transport,
        }
    }

    /// Prepare a runtime hosting only the workers in `hosted`; packets for
    /// any other worker are pushed to `remote`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HostedWorkers`] when `hosted` is empty or
    /// reaches past the topology's workers.
    pub fn with_link(
        topology: Topology,
        program: &'p N,
        hosted: Range<u32>,
        remote: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        if hosted.is_empty() || hosted.end > topology.worker_count() {
            return Err(ConfigError::HostedWorkers {
                start: hosted.start,
                end: hosted.end,
                workers: topology.worker_count(),
            });
        }
        let mailboxes = Arc::new(Mailboxes::new(topology.worker_count()));
        let split = Partitioned::new(hosted.clone(), Arc::clone(&mailboxes), remote);
        Ok(Self {
            topology,
            program,
            hosted,
            mailboxes,
            transport: Arc::new(split),
        })
    }

    /// Router delivering straight into this runtime's queues, for packets
    /// read off a remote stream with
    /// [`forward_incoming`](crate::transport::wire::forward_incoming).
    #[must_use]
    pub fn inbound(&self) -> Router {
        Router::new(self.topology, Arc::clone(&self.mailboxes) as Arc<dyn Transport>)
    }

    fn discard_leftovers(&self) {
        let leftover: usize = self
            .hosted
            .clone()
            .map(|worker| self.mailboxes.take_all(WorkerId::new(worker)).count())
            .sum();
        if leftover > 0 {
            debug!(leftover, "discarding packets for halted nodes");
        }
    }
}

impl<N: NodeProgram> Runtime for ThreadedRuntime<'_, N> {
    fn run(&mut self) -> Result<RunSummary, RuntimeError> {
        let shared = Shared::linked(
            self.topology,
            Arc::clone(&self.mailboxes),
            Arc::clone(&self.transport),
            self.hosted.len(),
        );
        let program = self.program;
        let hosted = self.hosted.clone();
        let outcome = thread::scope(|scope| {
            let mut handles = Vec::new();
            let mut spawn_error = None;
            for id in hosted.map(WorkerId::new) {
                let worker_shared = Arc::clone(&shared);
                let spawned = thread::Builder::new()
                    .name(format!("tokenflow-worker-{id}"))
                    .spawn_scoped(scope, move || run_worker(id, program, worker_shared));
                match spawned {
                    Ok(handle) => handles.push((id, handle)),
                    Err(err) => {
                        halt_everyone(&shared.router);
                        spawn_error = Some(RuntimeError::WorkerSpawn(err));
                        break;
                    }
                }
            }
            let joined = join_all(handles);
            match spawn_error {
                Some(err) => Err(err),
                None => joined,
            }
        });
        self.discard_leftovers();
        let stats = outcome?;
        Ok(RunSummary {
            nodes: self.topology.node_count(),
            workers: self.hosted.end - self.hosted.start,
            fired: stats.iter().map(|s| s.fired).sum(),
            delivered: stats.iter().map(|s| s.delivered).sum(),
        })
    }
}

impl<N> fmt::Debug for ThreadedRuntime<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedRuntime")
            .field("topology", &self.topology)
            .field("hosted", &self.hosted)
            .finish_non_exhaustive()
    }
}

fn join_all(
    handles: Vec<(WorkerId, ScopedJoinHandle<'_, WorkerStats>)>,
) -> Result<Vec<WorkerStats>, RuntimeError> {
    let mut stats = Vec::with_capacity(handles.len());
    let mut first_error = None;
    for (id, handle) in handles {
        match handle.join() {
            Ok(worker) => stats.push(worker),
            Err(_) => {
                error!(worker = %id, "worker thread panicked");
                first_error.get_or_insert(RuntimeError::WorkerPanicked(id));
            }
        }
    }
    first_error.map_or(Ok(stats), Err)
}

fn run_worker<N: NodeProgram>(id: WorkerId, program: &N, shared: Arc<Shared>) -> WorkerStats {
    let router = shared.router.clone();
    let _guard = HaltOnPanic(&router);
    let mut worker = Worker::new(id, program, shared);
    while worker.live() > 0 {
        for index in 0..worker.slot_count() {
            if worker.advance(index) == Progress::Stalled {
                // Sole blocking point: wait until some packet arrives.
                while worker.receive() == 0 {
                    thread::yield_now();
                }
            }
        }
    }
    debug!(worker = %id, "worker finished");
    worker.stats()
}

fn halt_everyone(router: &Router) {
    if let Err(error) = router.broadcast(None, MessageId::HALT, &[]) {
        warn!(%error, "failed to broadcast halt");
    }
}

/// Broadcasts halt if the owning worker thread unwinds, so the surviving
/// workers can still reach their quiescent points and be joined.
struct HaltOnPanic<'a>(&'a Router);

impl Drop for HaltOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            halt_everyone(self.0);
        }
    }
}
