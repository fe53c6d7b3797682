//! Command dispatch for the `tokenflow` binary.
//!
//! The command-line types live in `cli-defs` so `build.rs` can render the
//! man page from them. This module layers configuration sources and runs
//! the selected subcommand.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
pub use cli_defs::{Cli, Commands, ProgramArgs, RunArgs, RuntimeConfig};
use ortho_config::OrthoConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    nets::{counter::CounterNet, ring::TokenRing},
    params::{ParamSchema, ParamSpec},
    runtime::{ExecutionModule, RunSummary, Runtime, SessionEnd, SimRuntime, launch},
    statespace::Explorer,
    topology::Topology,
};

/// Parse the process arguments, merge configuration and run the requested
/// subcommand, reading controller commands from stdin and writing its output
/// to stdout.
///
/// # Errors
///
/// Returns any configuration, parameter or runtime error; the binary
/// reports it and exits non-zero.
pub fn run() -> Result<()> {
    init_tracing();
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let config = layered_config(&matches, cli.config)?;
    let stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout().lock();
    run_with_config(&config, cli.command, stdin, &mut stdout)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TOKENFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber installed by an embedding process takes precedence.
    let _installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Overlay flags given on the command line onto the environment, dotfile
/// and default layers.
fn layered_config(matches: &ArgMatches, cli: RuntimeConfig) -> Result<RuntimeConfig> {
    let mut config =
        RuntimeConfig::load_from_iter(["tokenflow"]).context("failed to load configuration")?;
    let explicit = |id: &str| matches.value_source(id) == Some(ValueSource::CommandLine);
    if explicit("module") {
        config.module = cli.module;
    }
    if explicit("nodes") {
        config.nodes = cli.nodes;
    }
    if explicit("processes") {
        config.processes = cli.processes;
    }
    Ok(config)
}

/// Run `command` under `config`, writing results to `out`. Only
/// `simulate` reads `input`.
///
/// # Errors
///
/// Returns an error for an unknown execution module, an invalid topology,
/// malformed or missing parameters, or a failed run.
pub fn run_with_config<R: BufRead, W: Write>(
    config: &RuntimeConfig,
    command: Commands,
    input: R,
    out: &mut W,
) -> Result<()> {
    match command {
        Commands::Run(args) => run_ring(config, &args, out),
        Commands::Verify(args) => verify_counter(config, &args, out),
        Commands::Simulate(args) => simulate_ring(config, &args, input, out),
    }
}

fn parse_param(schema: &ParamSchema, args: &ProgramArgs, name: &str) -> Result<u32> {
    let values = schema
        .parse(&args.params)
        .with_context(|| format!("expected parameters:\n{}", schema.help()))?;
    Ok(values.get_u32(name)?)
}

fn ring_laps(args: &ProgramArgs) -> Result<u32> {
    let schema = ParamSchema::new([ParamSpec::new("laps", "circuits the token makes")]);
    parse_param(&schema, args, "laps")
}

fn write_summary<W: Write>(out: &mut W, summary: &RunSummary) -> Result<()> {
    writeln!(
        out,
        "nodes={} workers={} fired={} delivered={}",
        summary.nodes, summary.workers, summary.fired, summary.delivered
    )?;
    Ok(())
}

fn run_ring<W: Write>(config: &RuntimeConfig, args: &RunArgs, out: &mut W) -> Result<()> {
    let module: ExecutionModule = config.module.parse()?;
    let topology = Topology::new(config.nodes, config.processes)?;
    let laps = ring_laps(&args.program)?;
    let ring = match &args.trace {
        Some(path) => TokenRing::new(laps).with_trace(path.clone()),
        None => TokenRing::new(laps),
    };
    let summary = launch(module, topology, &ring).context("token ring failed")?;
    write_summary(out, &summary)
}

fn simulate_ring<R: BufRead, W: Write>(
    config: &RuntimeConfig,
    args: &ProgramArgs,
    input: R,
    out: &mut W,
) -> Result<()> {
    let laps = ring_laps(args)?;
    let ring = TokenRing::new(laps);
    let mut sim = SimRuntime::new(config.nodes, &ring)?;
    match sim.serve(input, out).context("controller session failed")? {
        SessionEnd::Detach => {
            let summary = sim.run().context("token ring failed")?;
            write_summary(out, &summary)
        }
        SessionEnd::Quit | SessionEnd::Closed => {
            info!(steps = sim.steps(), "simulation stopped by controller");
            Ok(())
        }
    }
}

fn verify_counter<W: Write>(config: &RuntimeConfig, args: &ProgramArgs, out: &mut W) -> Result<()> {
    let schema = ParamSchema::new([ParamSpec::new("limit", "bound of every counter")]);
    let limit = parse_param(&schema, args, "limit")?;
    let net = CounterNet::new(limit);
    let mut explorer = Explorer::new(&net, config.nodes);
    explorer.verify(out).context("failed to write reachability graph")?;
    info!(
        states = explorer.state_count(),
        edges = explorer.edge_count(),
        "verification finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use rstest::rstest;

    use super::*;

    fn config(module: &str, nodes: u32) -> RuntimeConfig {
        RuntimeConfig {
            module: module.to_owned(),
            nodes,
            processes: 0,
        }
    }

    fn program(params: &[&str]) -> ProgramArgs {
        ProgramArgs {
            params: params.iter().map(|p| (*p).to_owned()).collect(),
        }
    }

    #[rstest]
    #[case("sim")]
    #[case("threads")]
    fn run_reports_totals(#[case] module: &str) {
        let args = RunArgs {
            program: program(&["laps=2"]),
            trace: None,
        };
        let mut out = Vec::new();
        run_with_config(&config(module, 3), Commands::Run(args), io::empty(), &mut out).expect("run");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("fired=7 delivered=6"), "{text}");
    }

    #[test]
    fn verify_prints_the_graph() {
        let mut out = Vec::new();
        run_with_config(
            &config("threads", 1),
            Commands::Verify(program(&["limit=1"])),
            io::empty(),
            &mut out,
        )
        .expect("verify");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "digraph statespace {\n\t\"s0\" -> \"s1\";\n}\n"
        );
    }

    #[rstest]
    #[case(config("mpi", 2), program(&["laps=1"]))]
    #[case(config("sim", 0), program(&["laps=1"]))]
    #[case(config("sim", 2), program(&[]))]
    #[case(config("sim", 2), program(&["laps"]))]
    fn invalid_input_is_fatal(#[case] cfg: RuntimeConfig, #[case] args: ProgramArgs) {
        let run = RunArgs {
            program: args,
            trace: None,
        };
        let mut out = Vec::new();
        assert!(run_with_config(&cfg, Commands::Run(run), io::empty(), &mut out).is_err());
        assert!(out.is_empty());
    }

    fn simulate(script: &str) -> String {
        let mut out = Vec::new();
        run_with_config(
            &config("sim", 2),
            Commands::Simulate(program(&["laps=1"])),
            Cursor::new(script.to_owned()),
            &mut out,
        )
        .expect("simulate");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn simulate_answers_commands_then_runs_on_after_detach() {
        let text = simulate("REPORTS\nFIRE 0 0\nFIRE 0 0\n\nFIRE 9 1\nSTEP\nDETACH\nREPORTS\n");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "<report nodes='2'>\
                 <node id='0' halted='false'><ring holding='true' passes='0' /></node>\
                 <node id='1' halted='false'><ring holding='false' passes='0' /></node>\
                 </report>",
                "Ok",
                "Error: transition 0 is not enabled on node 0",
                "Error: node 1 has no transition 9",
                "Error: unknown command 'STEP'",
                "nodes=2 workers=1 fired=3 delivered=2",
            ]
        );
    }

    #[rstest]
    #[case("QUIT\nREPORTS\n")]
    #[case("")]
    fn simulate_stops_on_quit_or_closed_input(#[case] script: &str) {
        assert_eq!(simulate(script), "");
    }
}
