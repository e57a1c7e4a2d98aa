use std::{collections::BTreeMap, fs, path::PathBuf};

use anyhow::Context as _;
use clap::Parser;
use rtmx::{Config, Database, Recognised, RemoteResolver, Requirement, Status as RequirementStatus};
use serde_json::json;
use tracing::instrument;

use super::{
    Context, display_relative,
    terminal::{Colorize, fit, paint_status},
};

#[derive(Debug, Parser, Default)]
#[command(about = "Show completion status (-v by category, -vv by requirement)")]
pub struct Status {
    /// Detail level (-v by category, -vv by requirement)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Export the status as JSON to this file
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct Tally {
    total: usize,
    complete: usize,
    partial: usize,
}

impl Tally {
    fn add(&mut self, requirement: &Requirement) {
        self.total += 1;
        match requirement.status {
            Recognised::Known(RequirementStatus::Complete) => self.complete += 1,
            Recognised::Known(RequirementStatus::Partial) => self.partial += 1,
            _ => {}
        }
    }

    /// Complete requirements count fully, partial ones by half.
    fn completion(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (to_f64(self.complete) + to_f64(self.partial) / 2.0) * 100.0 / to_f64(self.total)
    }
}

fn to_f64(n: usize) -> f64 {
    f64::from(u32::try_from(n).unwrap_or(u32::MAX))
}

impl Status {
    #[cfg(test)]
    pub(super) const fn detail(&self) -> u8 {
        self.verbose
    }

    #[instrument(level = "debug", skip_all)]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let project = context.open()?;
        let db = &project.db;

        let mut overall = Tally::default();
        let mut by_category: BTreeMap<&str, Tally> = BTreeMap::new();
        let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
        for requirement in db {
            overall.add(requirement);
            by_category
                .entry(requirement.category.as_str())
                .or_default()
                .add(requirement);
            *by_status.entry(requirement.status.to_string()).or_default() += 1;
        }

        Self::output_summary(&project.path, &overall, &by_status);
        if self.verbose >= 1 {
            Self::output_categories(&by_category);
        }
        if self.verbose >= 2 {
            Self::output_requirements(db);
        }

        if let Some(path) = &self.json {
            let output = Self::status_json(db, &project.config, &overall, &by_status, &by_category);
            fs::write(path, serde_json::to_string_pretty(&output)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!();
            println!("Exported status to {}", display_relative(path).info());
        }

        Ok(())
    }

    fn output_summary(path: &std::path::Path, overall: &Tally, by_status: &BTreeMap<String, usize>) {
        println!("RTM status: {}", display_relative(path).bold());
        println!("{}", "──────────────────".dim());

        for status in RequirementStatus::ALL {
            let count = by_status.get(status.as_str()).copied().unwrap_or(0);
            println!(
                "{} {count:>5}",
                paint_status(&Recognised::Known(status), &format!("{status:<14}"))
            );
        }
        for (status, count) in by_status {
            if status.parse::<RequirementStatus>().is_err() {
                println!("{} {count:>5}", format!("{status:<14}").dim());
            }
        }
        println!("{:<14} {:>5}", "Total", overall.total);
        println!();

        let completion = format!("{:.1}%", overall.completion());
        let completion = if overall.complete == overall.total {
            completion.success()
        } else {
            completion.warning()
        };
        println!("Completion: {completion}");
    }

    fn output_categories(by_category: &BTreeMap<&str, Tally>) {
        println!();
        println!("{:<24} {:>8} {:>8}", "Category", "Done", "%");
        for (category, tally) in by_category {
            let name = if category.is_empty() {
                "(none)".to_string()
            } else {
                (*category).to_string()
            };
            println!(
                "{name:<24} {:>8} {:>7.1}%",
                format!("{}/{}", tally.complete, tally.total),
                tally.completion()
            );
        }
    }

    fn output_requirements(db: &Database) {
        println!();
        for requirement in db {
            let status = format!("{:<12}", requirement.status);
            let prefix = format!("{status} {:<20}", requirement.req_id());
            println!(
                "{} {:<20} {}",
                paint_status(&requirement.status, &status),
                requirement.req_id(),
                fit(&requirement.requirement_text, prefix.len() + 1).dim()
            );
        }
    }

    /// Cross-repo dependencies are resolved through the configured remotes
    /// when computing `blocked`.
    fn status_json(
        db: &Database,
        config: &Config,
        overall: &Tally,
        by_status: &BTreeMap<String, usize>,
        by_category: &BTreeMap<&str, Tally>,
    ) -> serde_json::Value {
        let mut resolver = RemoteResolver::new(config);

        let categories: Vec<_> = by_category
            .iter()
            .map(|(category, tally)| {
                json!({
                    "category": category,
                    "total": tally.total,
                    "complete": tally.complete,
                    "partial": tally.partial,
                    "completion": tally.completion(),
                })
            })
            .collect();

        let requirements: Vec<_> = db
            .iter()
            .map(|requirement| {
                json!({
                    "req_id": requirement.req_id(),
                    "category": requirement.category,
                    "status": requirement.status.to_string(),
                    "priority": requirement.priority.to_string(),
                    "phase": requirement.phase,
                    "blocked": requirement.is_blocked(db, Some(&mut resolver)),
                })
            })
            .collect();

        json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "total": overall.total,
            "completion": overall.completion(),
            "by_status": by_status,
            "categories": categories,
            "requirements": requirements,
        })
    }
}
