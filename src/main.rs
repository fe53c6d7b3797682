//! Binary entry point for `tokenflow`.
//!
//! Dispatch lives in [`tokenflow::cli`]; this binary only delegates to it.

use anyhow::Result;

fn main() -> Result<()> { tokenflow::cli::run() }
