//! Renders the `tokenflow(1)` man page into `OUT_DIR` with `clap_mangen`.
//!
//! The command definition comes from `cli-defs`, so the build script never
//! has to compile the runtime it documents.

use std::{env, fs, io, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;
use cli_defs::Cli;

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=cli-defs");

    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            // Analysis-only invocations run without OUT_DIR.
            return Ok(());
        }
    };
    let bin_name = env::var("CARGO_PKG_NAME").unwrap_or_else(|_| "tokenflow".into());

    let mut page = fs::File::create(out_dir.join(format!("{bin_name}.1")))?;
    Man::new(Cli::command()).render(&mut page)
}
