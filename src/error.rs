//! Error types shared by the runtime, packet substrate and parameter parsing.

use std::io;

use thiserror::Error;

use crate::topology::{NodeId, WorkerId};

/// Errors raised while framing, routing or decoding packets.
#[derive(Debug, Error)]
pub enum PacketError {
    /// The target node lies outside the configured topology.
    #[error("node {node} does not exist (topology has {node_count} nodes)")]
    UnknownNode {
        /// The requested target.
        node: NodeId,
        /// Number of nodes in the topology.
        node_count: u32,
    },
    /// No queue exists for the addressed worker.
    #[error("worker {0} does not exist")]
    UnknownWorker(WorkerId),
    /// User message identifiers must fit in the non-negative range.
    #[error("message id {0} collides with the reserved control range")]
    ReservedMessageId(u32),
    /// Payload exceeds [`crate::packet::MAX_PAYLOAD_SIZE`].
    #[error("payload of {0} bytes is too large")]
    PayloadTooLarge(usize),
    /// Buffer is too short to contain a packet header or payload.
    #[error("buffer too short")]
    ShortBuffer,
    /// Header size field disagrees with the bytes present.
    #[error("size mismatch")]
    SizeMismatch,
    /// I/O error on a stream transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Fatal configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The execution module name is not recognised.
    #[error("unknown module '{0}'")]
    UnknownModule(String),
    /// A runtime needs at least one node.
    #[error("at least one node is required")]
    NoNodes,
    /// The hosted worker range is empty or reaches past the topology.
    #[error("hosted workers {start}..{end} do not fit a topology of {workers} workers")]
    HostedWorkers {
        /// First hosted worker.
        start: u32,
        /// One past the last hosted worker.
        end: u32,
        /// Workers in the topology.
        workers: u32,
    },
}

/// Errors raised while parsing `name=value` program parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// The argument has no `=` separator.
    #[error("invalid format of parameter '{0}', expected NAME=VALUE")]
    InvalidFormat(String),
    /// The parameter name was not declared.
    #[error("unknown parameter '{0}'")]
    Unknown(String),
    /// The value is not an integer.
    #[error("invalid value '{value}' for parameter '{name}'")]
    InvalidValue {
        /// Parameter name.
        name: String,
        /// Rejected value.
        value: String,
    },
    /// Declared parameters that were not supplied.
    #[error("mandatory parameter(s) required: {}", .0.join(", "))]
    Missing(Vec<String>),
}

/// Errors surfaced by the runtime modules.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] io::Error),
    /// A worker thread panicked.
    #[error("worker {0} panicked")]
    WorkerPanicked(WorkerId),
    /// Every live node is starved and no packet is in flight.
    #[error("simulation stalled after {steps} steps")]
    Stalled {
        /// Scheduler steps taken before the stall was detected.
        steps: u64,
    },
    /// A manual firing named a transition the node does not have.
    #[error("node {node} has no transition {transition}")]
    UnknownTransition {
        /// Node addressed by the request.
        node: NodeId,
        /// Requested transition identifier.
        transition: u32,
    },
    /// A node outside the topology was addressed.
    #[error("node {0} is not hosted by this runtime")]
    UnknownNode(NodeId),
    /// Sending a packet failed.
    #[error(transparent)]
    Packet(#[from] PacketError),
}
