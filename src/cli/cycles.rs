use std::{collections::HashSet, process};

use clap::Parser;
use tracing::instrument;

use super::{Context, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Report circular dependencies")]
pub struct Cycles {}

impl Cycles {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let project = context.open()?;
        let cycles = project.db.find_cycles();

        if cycles.is_empty() {
            println!("Cycles: {} ✅", "0".success());
            return Ok(());
        }

        println!(
            "Found {} circular dependency group(s) ⚠️",
            cycles.len().to_string().warning()
        );
        for (i, cycle) in (1..).zip(&cycles) {
            let mut path = cycle.join(" -> ");
            if let Some(first) = cycle.first() {
                path.push_str(" -> ");
                path.push_str(first);
            }
            let members = cycle.iter().collect::<HashSet<_>>().len();
            println!("  {i}. {path} {}", format!("({members} members)").dim());
        }
        println!();
        println!(
            "{}",
            "Resolve cycles to restore an acyclic dependency graph.".dim()
        );

        process::exit(1);
    }
}
