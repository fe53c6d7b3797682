//! Runtime modules that drive a [`NodeProgram`] over a [`Topology`].
//!
//! Two implementations share the worker loop in [`worker`]:
//! [`threads::ThreadedRuntime`] runs one OS thread per worker, and
//! [`sim::SimRuntime`] runs every node on the calling thread for tests and
//! interactive stepping. [`launch`] picks one from an [`ExecutionModule`].

pub mod rendezvous;
pub mod sim;
pub mod threads;
mod worker;

use std::{fmt, str::FromStr, sync::Arc};

use tracing::info;

pub use self::{
    rendezvous::Rendezvous,
    sim::{SessionEnd, SimRuntime},
    threads::ThreadedRuntime,
};
use crate::{
    error::{ConfigError, RuntimeError},
    program::NodeProgram,
    topology::Topology,
    tracelog::TraceLog,
    transport::{Mailboxes, Router, Transport},
};

/// State shared by every worker of one runtime instance.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) router: Router,
    pub(crate) mailboxes: Arc<Mailboxes>,
    pub(crate) trace: TraceLog,
    pub(crate) rendezvous: Rendezvous,
}

impl Shared {
    /// State for a runtime hosting every worker of `topology`.
    pub(crate) fn new(topology: Topology) -> Arc<Self> {
        let mailboxes = Arc::new(Mailboxes::new(topology.worker_count()));
        let transport = Arc::clone(&mailboxes) as Arc<dyn Transport>;
        Self::linked(topology, mailboxes, transport, topology.worker_count() as usize)
    }

    /// State for `parties` hosted workers whose packets leave through
    /// `transport` and arrive in `mailboxes`.
    pub(crate) fn linked(
        topology: Topology,
        mailboxes: Arc<Mailboxes>,
        transport: Arc<dyn Transport>,
        parties: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            router: Router::new(topology, transport),
            mailboxes,
            trace: TraceLog::new(),
            rendezvous: Rendezvous::new(parties),
        })
    }
}

/// Execution strategy selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionModule {
    /// One OS thread per worker.
    Threads,
    /// Every node on the calling thread.
    Sim,
}

impl FromStr for ExecutionModule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "threads" => Ok(Self::Threads),
            "sim" => Ok(Self::Sim),
            other => Err(ConfigError::UnknownModule(other.to_owned())),
        }
    }
}

impl fmt::Display for ExecutionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Threads => "threads",
            Self::Sim => "sim",
        })
    }
}

/// Totals reported by a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of logical nodes.
    pub nodes: u32,
    /// Number of workers that hosted them.
    pub workers: u32,
    /// Transitions fired by the schedulers and manual requests.
    pub fired: u64,
    /// User packets delivered to receive callbacks.
    pub delivered: u64,
}

/// A runtime module ready to execute its program.
pub trait Runtime {
    /// Run until every node has halted.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] when a worker cannot be started or fails,
    /// or when the run can no longer make progress.
    fn run(&mut self) -> Result<RunSummary, RuntimeError>;
}

/// Build the runtime `module` selects for `program` and run it to
/// completion.
///
/// # Errors
///
/// Propagates the selected runtime's error.
pub fn launch<N: NodeProgram>(
    module: ExecutionModule,
    topology: Topology,
    program: &N,
) -> Result<RunSummary, RuntimeError> {
    info!(
        %module,
        nodes = topology.node_count(),
        workers = topology.worker_count(),
        "starting runtime"
    );
    let mut runtime: Box<dyn Runtime + '_> = match module {
        ExecutionModule::Threads => Box::new(ThreadedRuntime::new(topology, program)),
        ExecutionModule::Sim => Box::new(SimRuntime::new(topology.node_count(), program)?),
    };
    let summary = runtime.run()?;
    info!(fired = summary.fired, delivered = summary.delivered, "runtime finished");
    Ok(summary)
}
