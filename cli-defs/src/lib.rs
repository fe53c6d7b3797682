//! Shared CLI type definitions for tokenflow build and runtime.
//!
//! This crate provides the argument and configuration types used by both the
//! `build.rs` script (for man page generation) and the `tokenflow` binary.
//! Keeping them here lets the build script render the man page without
//! compiling the runtime itself.

// The derives below expand into module-level helpers, so these suppressions
// cannot be scoped to a single item.
#![expect(
    non_snake_case,
    reason = "Clap/OrthoConfig derive macros generate helper modules with uppercase names"
)]
#![expect(
    missing_docs,
    reason = "OrthoConfig and Clap derive macros generate items that cannot be documented"
)]

use clap::{Args, Parser, Subcommand};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

/// Execution module selected when none is configured.
pub const DEFAULT_MODULE: &str = "threads";
/// Logical node count used when none is configured.
pub const DEFAULT_NODES: u32 = 2;
/// Worker count sentinel meaning "one worker per node".
pub const DEFAULT_PROCESSES: u32 = 0;

/// Runtime configuration shared by every subcommand.
///
/// Values are layered: command-line flags override `TOKENFLOW_*`
/// environment variables, which override a `.tokenflow.toml` dotfile, which
/// overrides the defaults above.
#[derive(Args, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "TOKENFLOW_")]
pub struct RuntimeConfig {
    /// Execution module: `threads` or `sim`.
    #[ortho_config(default = DEFAULT_MODULE.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_MODULE))]
    pub module: String,
    /// Number of logical nodes.
    #[ortho_config(default = DEFAULT_NODES)]
    #[arg(long, default_value_t = DEFAULT_NODES)]
    pub nodes: u32,
    /// Number of worker threads; zero or more than `nodes` means one per node.
    #[ortho_config(default = DEFAULT_PROCESSES)]
    #[arg(long, default_value_t = DEFAULT_PROCESSES)]
    pub processes: u32,
}

/// Program parameters shared by the subcommands.
#[derive(Args, Deserialize, Serialize, Default, Debug, Clone)]
pub struct ProgramArgs {
    /// Program parameter in `name=value` form; repeat for each parameter.
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,
}

/// Arguments of the `run` subcommand.
#[derive(Args, Deserialize, Serialize, Default, Debug, Clone)]
pub struct RunArgs {
    /// Program parameters.
    #[command(flatten)]
    pub program: ProgramArgs,
    /// Write a trace log of fired transitions and received batches here.
    #[arg(long, value_name = "PATH")]
    pub trace: Option<String>,
}

/// CLI subcommands exposed by `tokenflow`.
#[derive(Subcommand, Deserialize, Serialize, Debug, Clone)]
pub enum Commands {
    /// Run the token-ring program on the selected execution module.
    Run(RunArgs),
    /// Explore the counter net and print its reachability graph.
    Verify(ProgramArgs),
    /// Control the token ring on the sim runtime with commands read from
    /// stdin (`REPORTS`, `FIRE <transition> <node>`, `QUIT`, `DETACH`).
    Simulate(ProgramArgs),
}

/// Top-level CLI entry point consumed by binaries.
#[derive(Parser, Deserialize, Serialize, Debug, Clone)]
#[command(name = "tokenflow", author, version, about)]
pub struct Cli {
    /// Runtime configuration.
    #[command(flatten)]
    pub config: RuntimeConfig,
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}
