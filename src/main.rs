#![recursion_limit = "256"]

mod cli;
mod application;
mod domain;
mod data;
mod ml;
mod infra;

use anyhow::Result;
use cli::Cli;
use clap::Parser;

fn main() -> Result<()> {
    // Logging is initialised per subcommand: `train` needs the run
    // directory (derived from --save-path) before the file layer exists.
    let cli = Cli::parse();
    cli.run()
}
