//! Fair-scheduled place/transition runtime with an explicit-state explorer.
//!
//! Programs describe logical nodes as guarded [`transition`]s over private
//! places. The live [`runtime`] multiplexes nodes onto workers, schedules
//! each node's transitions with the [`scheduler`]'s fair round-robin, and
//! lets nodes exchange framed [`packet`]s. The [`statespace`] explorer fires
//! the same kind of transitions exhaustively to build a deduplicated
//! reachability graph.

pub mod cli;
pub mod context;
pub mod error;
pub mod nets;
pub mod output;
pub mod packet;
pub mod params;
pub mod program;
pub mod runtime;
pub mod scheduler;
pub mod statespace;
#[cfg(test)]
pub(crate) mod test_helpers;
pub mod topology;
pub mod tracelog;
pub mod transition;
pub mod transport;
