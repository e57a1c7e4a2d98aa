use clap::Parser;
use rtmx::{Database, RemoteResolver, Requirement, Resolution, parse_requirement_ref};
use tracing::instrument;

use super::{
    Context,
    terminal::{Colorize, colored_status, fit},
};

#[derive(Debug, Parser)]
#[command(about = "Show the dependency graph")]
pub struct Deps {
    /// Only show requirements in this category
    #[arg(long)]
    category: Option<String>,

    /// Only show requirements in this phase
    #[arg(long)]
    phase: Option<i64>,

    /// Show the dependencies and dependents of a single requirement
    #[arg(long = "req", value_name = "ID")]
    req_id: Option<String>,
}

impl Deps {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let project = context.open()?;
        let mut resolver = RemoteResolver::new(&project.config);

        match &self.req_id {
            Some(req_id) => {
                let requirement = project.db.get(req_id)?;
                Self::output_requirement(&project.db, requirement, &mut resolver);
            }
            None => self.output_overview(&project.db, &mut resolver),
        }

        Ok(())
    }

    fn output_overview(&self, db: &Database, resolver: &mut RemoteResolver<'_>) {
        let selected: Vec<&Requirement> = db
            .iter()
            .filter(|r| self.category.as_ref().is_none_or(|c| &r.category == c))
            .filter(|r| self.phase.is_none_or(|phase| r.phase == Some(phase)))
            .collect();

        if selected.is_empty() {
            println!("{}", "No matching requirements.".dim());
            return;
        }

        println!(
            "{:<20} {:>5} {:>7}  {:<8} Requirement",
            "ID", "Deps", "Blocks", "Blocked"
        );
        for requirement in selected {
            let blocked = if requirement.is_blocked(db, Some(&mut *resolver)) {
                format!("{:<8}", "yes").warning()
            } else {
                format!("{:<8}", "no").dim()
            };
            println!(
                "{:<20} {:>5} {:>7}  {} {}",
                requirement.req_id(),
                requirement.dependencies().len(),
                db.blocking_count(requirement.req_id()),
                blocked,
                fit(&requirement.requirement_text, 46),
            );
        }
    }

    fn output_requirement(
        db: &Database,
        requirement: &Requirement,
        resolver: &mut RemoteResolver<'_>,
    ) {
        println!(
            "{} {}",
            requirement.req_id().bold(),
            colored_status(&requirement.status)
        );
        if !requirement.requirement_text.is_empty() {
            println!("{}", requirement.requirement_text.dim());
        }
        println!();

        println!("Depends on ({}):", requirement.dependencies().len());
        for dep in requirement.dependencies() {
            println!("  {}", describe_dependency(db, dep, resolver));
        }

        let dependents: Vec<&Requirement> = db.dependents(requirement.req_id()).collect();
        println!();
        println!("Required by ({}):", dependents.len());
        for dependent in dependents {
            println!(
                "  {:<20} {}",
                dependent.req_id(),
                colored_status(&dependent.status)
            );
        }

        println!();
        if requirement.is_blocked(db, Some(&mut *resolver)) {
            println!("{}", "⛔ Blocked by incomplete dependencies".warning());
        } else {
            println!("{}", "✅ Not blocked".success());
        }
    }
}

/// One line describing a dependency and whether it is satisfied.
fn describe_dependency(db: &Database, dep: &str, resolver: &mut RemoteResolver<'_>) -> String {
    let Ok(reference) = parse_requirement_ref(dep) else {
        return format!("{dep:<30} {}", "invalid reference".error());
    };

    if reference.is_local() {
        return match db.find(reference.req_id()) {
            Some(target) => format!("{dep:<30} {}", colored_status(&target.status)),
            None => format!("{dep:<30} {}", "not found".error()),
        };
    }

    let state = match resolver.resolve(&reference) {
        Resolution::Found { requirement, .. } => colored_status(&requirement.status),
        Resolution::Missing { remote } => format!("not found in remote '{}'", remote.alias).error(),
        Resolution::NoLocalPath(remote) | Resolution::Unavailable(remote) => {
            format!("remote '{}' unavailable", remote.alias).dim()
        }
        Resolution::UnknownAlias(alias) => format!("unknown remote '{alias}'").error(),
        Resolution::UnknownRepo(repo) => format!("no remote for '{repo}'").error(),
        Resolution::Local => String::new(),
    };
    format!("{dep:<30} {state}")
}
