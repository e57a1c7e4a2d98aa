//! Command-line interface for requirements traceability.

mod cli;

use clap::Parser;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    Cli::parse().run()
}
