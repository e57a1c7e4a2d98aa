use anyhow::Context as _;
use clap::Parser;
use rtmx::{check_reciprocity, fix_reciprocity};
use tracing::{info, instrument};

use super::{Context, display_relative, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Check that every 'blocks' entry has a matching dependency and vice versa")]
pub struct Reconcile {
    /// Repair violations and save the database
    #[arg(long)]
    execute: bool,
}

impl Reconcile {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let mut project = context.open()?;
        let violations = check_reciprocity(&project.db);

        if violations.is_empty() {
            println!("{}", "✅ Dependencies and blocks are reciprocal".success());
            return Ok(());
        }

        println!(
            "Found {} reciprocity violation(s):",
            violations.len().to_string().warning()
        );
        for violation in &violations {
            println!(
                "  {} <-> {}: {}",
                violation.source,
                violation.related,
                violation.issue.dim()
            );
        }
        println!();

        if !self.execute {
            println!(
                "{}",
                "Run 'rtmx reconcile --execute' to repair.".dim()
            );
            return Ok(());
        }

        let fixed = fix_reciprocity(&mut project.db);
        if fixed > 0 {
            project
                .db
                .save(&project.path)
                .with_context(|| format!("failed to save {}", project.path.display()))?;
            info!(fixed, "saved reconciled database");
        }

        println!(
            "{}",
            format!(
                "✅ Fixed {fixed} relation(s) in {}",
                display_relative(&project.path)
            )
            .success()
        );

        let remaining = check_reciprocity(&project.db).len();
        if remaining > 0 {
            println!(
                "{}",
                format!("{remaining} violation(s) reference missing requirements and need manual attention").warning()
            );
        }

        Ok(())
    }
}
