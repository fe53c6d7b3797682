//! In-process runtime that hosts every node on the calling thread.
//!
//! Besides running a program to completion, the sim runtime can be stepped
//! by hand: [`SimRuntime::fire`] fires a named transition on request and
//! [`SimRuntime::report`] snapshots every node as an output tree.
//! [`SimRuntime::serve`] exposes both to a controller over a line protocol:
//!
//! ```text
//! REPORTS                   -> one report tree on a single line
//! FIRE <transition> <node>  -> Ok | Error: <reason>
//! QUIT                      -> stop the program where it stands
//! DETACH                    -> release control; the program runs on
//! ```

use std::{
    fmt,
    io::{self, BufRead, Write},
};

use thiserror::Error;
use tracing::debug;

use super::{
    RunSummary,
    Runtime,
    Shared,
    worker::{Progress, Worker},
};
use crate::{
    error::{ConfigError, RuntimeError},
    output::{Output, OutputBlock},
    program::NodeProgram,
    topology::{NodeId, Topology, WorkerId},
    transition::{Firing, TransitionId},
};

/// How a [`SimRuntime::serve`] session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The controller sent `QUIT`.
    Quit,
    /// The controller sent `DETACH` and expects the program to run on.
    Detach,
    /// The command stream closed.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Reports,
    Fire { transition: u32, node: u32 },
    Quit,
    Detach,
}

#[derive(Debug, Error, PartialEq, Eq)]
enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("usage: FIRE <transition> <node>")]
    FireUsage,
}

fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    match verb {
        "REPORTS" => Ok(Command::Reports),
        "QUIT" => Ok(Command::Quit),
        "DETACH" => Ok(Command::Detach),
        "FIRE" => {
            let transition = words.next().and_then(|word| word.parse::<u32>().ok());
            let node = words.next().and_then(|word| word.parse::<u32>().ok());
            match (transition, node, words.next()) {
                (Some(transition), Some(node), None) => Ok(Command::Fire { transition, node }),
                _ => Err(CommandError::FireUsage),
            }
        }
        other => Err(CommandError::Unknown(other.to_owned())),
    }
}

/// Single-worker runtime driven from the calling thread.
pub struct SimRuntime<'p, N: NodeProgram> {
    topology: Topology,
    worker: Worker<'p, N>,
    steps: u64,
}

impl<'p, N: NodeProgram> SimRuntime<'p, N> {
    /// Initialise `nodes` contexts of `program` on one worker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoNodes`] when `nodes` is zero.
    pub fn new(nodes: u32, program: &'p N) -> Result<Self, ConfigError> {
        let topology = Topology::single_worker(nodes)?;
        let worker = Worker::new(WorkerId::new(0), program, Shared::new(topology));
        Ok(Self {
            topology,
            worker,
            steps: 0,
        })
    }

    /// Scheduler steps taken so far.
    #[must_use]
    pub const fn steps(&self) -> u64 { self.steps }

    /// Whether every node has halted.
    #[must_use]
    pub const fn is_finished(&self) -> bool { self.worker.live() == 0 }

    /// Give every node one scheduler step, in node order.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Stalled`] when every live node is starved and
    /// no packet is pending.
    pub fn round(&mut self) -> Result<(), RuntimeError> {
        for index in 0..self.worker.slot_count() {
            self.steps += 1;
            if self.worker.advance(index) == Progress::Stalled {
                return Err(RuntimeError::Stalled { steps: self.steps });
            }
        }
        Ok(())
    }

    /// Fire `transition` on `node` outside the scheduler's circuit.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownNode`] for a node outside the runtime
    /// and [`RuntimeError::UnknownTransition`] when the node has no such
    /// transition.
    pub fn fire(&mut self, node: NodeId, transition: TransitionId) -> Result<Firing, RuntimeError> {
        self.worker.fire_manual(node, transition)
    }

    /// Snapshot every node as a `report` tree with one `node` child each.
    #[must_use]
    pub fn report(&self) -> OutputBlock {
        let mut out = Output::new();
        out.child("report");
        out.set("nodes", self.topology.node_count());
        self.worker.report(&mut out);
        out.back().unwrap_or_else(|| OutputBlock::new("report"))
    }

    /// Answer controller commands read line by line from `input` until
    /// `QUIT`, `DETACH` or end of stream. Every answer is one line on `out`.
    /// Blank lines are ignored; malformed commands are answered with an
    /// error and the session continues.
    ///
    /// # Errors
    ///
    /// Returns any error reading `input` or writing `out`.
    pub fn serve<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<SessionEnd> {
        for read in input.lines() {
            let line = read?;
            if line.trim().is_empty() {
                continue;
            }
            let command = match parse_command(&line) {
                Ok(command) => command,
                Err(error) => {
                    writeln!(out, "Error: {error}")?;
                    out.flush()?;
                    continue;
                }
            };
            debug!(?command, "controller command");
            match command {
                Command::Reports => {
                    self.report().write(out)?;
                    writeln!(out)?;
                }
                Command::Fire { transition, node } => {
                    match self.fire(NodeId::new(node), TransitionId::new(transition)) {
                        Ok(Firing::Fired) => writeln!(out, "Ok")?,
                        Ok(Firing::NotFired) => {
                            writeln!(out, "Error: transition {transition} is not enabled on node {node}")?;
                        }
                        Err(error) => writeln!(out, "Error: {error}")?,
                    }
                }
                Command::Quit => return Ok(SessionEnd::Quit),
                Command::Detach => return Ok(SessionEnd::Detach),
            }
            out.flush()?;
        }
        Ok(SessionEnd::Closed)
    }
}

impl<N: NodeProgram> Runtime for SimRuntime<'_, N> {
    fn run(&mut self) -> Result<RunSummary, RuntimeError> {
        while !self.is_finished() {
            self.round()?;
        }
        let stats = self.worker.stats();
        Ok(RunSummary {
            nodes: self.topology.node_count(),
            workers: 1,
            fired: stats.fired,
            delivered: stats.delivered,
        })
    }
}

impl<N: NodeProgram> fmt::Debug for SimRuntime<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimRuntime")
            .field("topology", &self.topology)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("REPORTS", Ok(Command::Reports))]
    #[case("  FIRE 2 5 ", Ok(Command::Fire { transition: 2, node: 5 }))]
    #[case("FIRE 2", Err(CommandError::FireUsage))]
    #[case("FIRE 2 x", Err(CommandError::FireUsage))]
    #[case("FIRE 1 2 3", Err(CommandError::FireUsage))]
    #[case("QUIT", Ok(Command::Quit))]
    #[case("DETACH", Ok(Command::Detach))]
    #[case("reports", Err(CommandError::Unknown("reports".to_owned())))]
    fn parses_controller_commands(#[case] line: &str, #[case] expected: Result<Command, CommandError>) {
        assert_eq!(parse_command(line), expected);
    }
}
