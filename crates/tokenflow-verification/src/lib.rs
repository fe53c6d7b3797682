//! Model-checking harnesses for tokenflow.
//!
//! Two Stateright models live here:
//!
//! - [`halt_model`] abstracts the threaded runtime's shutdown protocol: per-worker LIFO
//!   mailboxes, a halt broadcast from one node and workers that drain and retire.
//! - [`net_model`] replays a [`tokenflow::statespace::NetDef`] under Stateright so its
//!   reachable state count can be compared with the one reported by
//!   [`tokenflow::statespace::Explorer`].

pub mod halt_model;
pub mod net_model;
