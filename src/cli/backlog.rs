use std::cmp::Reverse;

use clap::Parser;
use rtmx::{Priority, Recognised, RemoteResolver, Requirement};
use tracing::instrument;

use super::{
    Context,
    terminal::{Colorize, fit, paint_status},
};

#[derive(Debug, Parser)]
#[command(about = "List incomplete requirements, most urgent first")]
pub struct Backlog {
    /// Only show requirements in this phase
    #[arg(long)]
    phase: Option<i64>,

    /// Only show requirements that block other requirements
    #[arg(long)]
    critical: bool,
}

struct Entry<'a> {
    requirement: &'a Requirement,
    blocking: usize,
    blocked: bool,
}

/// Sort key: known priorities in urgency order, unknown text last, then the
/// number of dependents (descending), then identifier.
fn sort_key<'a>(entry: &Entry<'a>) -> (bool, Option<Priority>, Reverse<usize>, &'a str) {
    let priority = entry.requirement.priority.known().copied();
    (
        priority.is_none(),
        priority,
        Reverse(entry.blocking),
        entry.requirement.req_id(),
    )
}

impl Backlog {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let project = context.open()?;
        let db = &project.db;
        let mut resolver = RemoteResolver::new(&project.config);

        let mut entries: Vec<Entry<'_>> = db
            .iter()
            .filter(|requirement| !requirement.is_complete())
            .filter(|requirement| self.phase.is_none_or(|phase| requirement.phase == Some(phase)))
            .map(|requirement| Entry {
                requirement,
                blocking: db.blocking_count(requirement.req_id()),
                blocked: requirement.is_blocked(db, Some(&mut resolver)),
            })
            .filter(|entry| !self.critical || entry.blocking > 0)
            .collect();

        entries.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

        if entries.is_empty() {
            println!("{}", "Backlog is empty.".success());
            return Ok(());
        }

        println!(
            "{:<20} {:<10} {:<12} {:>6}  Requirement",
            "ID", "Priority", "Status", "Blocks"
        );
        for entry in &entries {
            let requirement = entry.requirement;
            let marker = if entry.blocked { "⛔" } else { "  " };
            println!(
                "{:<20} {} {} {:>6} {marker} {}",
                requirement.req_id(),
                priority_label(&requirement.priority),
                paint_status(&requirement.status, &format!("{:<12}", requirement.status)),
                entry.blocking,
                fit(&requirement.requirement_text, 56),
            );
        }

        let blocked = entries.iter().filter(|entry| entry.blocked).count();
        println!();
        println!(
            "{} incomplete, {} blocked",
            entries.len(),
            blocked.to_string().warning()
        );

        Ok(())
    }
}

/// The priority padded to its column, then colored.
fn priority_label(priority: &Recognised<Priority>) -> String {
    let text = format!("{priority:<10}");
    match priority {
        Recognised::Known(Priority::Critical) => text.error(),
        Recognised::Known(Priority::High) => text.warning(),
        Recognised::Known(_) => text,
        Recognised::Unknown(_) => text.dim(),
    }
}
