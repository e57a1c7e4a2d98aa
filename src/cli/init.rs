use std::path::{Path, PathBuf};

use anyhow::Context as _;
use rtmx::{Config, Database, Priority, Requirement, Status};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// Overwrite existing files
    #[arg(long)]
    force: bool,
}

impl Command {
    #[instrument]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let created = initialize(root, self.force)?;

        println!("Initialized RTMX project in {}", root.display());
        for path in &created {
            let relative = path.strip_prefix(root).unwrap_or(path);
            println!("  Created: {}", relative.display());
        }
        println!();
        println!("Next steps:");
        println!(
            "  {}",
            "Edit .rtmx/database.csv to add your requirements".dim()
        );
        println!("  rtmx status");

        Ok(())
    }
}

/// Writes a starter database and configuration under `root/.rtmx`.
fn initialize(root: &Path, force: bool) -> anyhow::Result<Vec<PathBuf>> {
    let rtmx_dir = root.join(".rtmx");
    let database_path = rtmx_dir.join("database.csv");
    let config_path = rtmx_dir.join("config.yaml");

    if !force {
        if let Some(existing) = [&database_path, &config_path]
            .into_iter()
            .find(|path| path.exists())
        {
            anyhow::bail!(
                "Project already initialized (found {}). Use --force to overwrite",
                existing.display()
            );
        }
    }

    starter_database()
        .save(&database_path)
        .with_context(|| format!("failed to create {}", database_path.display()))?;

    Config::default()
        .save(&config_path)
        .with_context(|| format!("failed to create {}", config_path.display()))?;

    Ok(vec![database_path, config_path])
}

fn starter_database() -> Database {
    let mut requirement = Requirement::new("REQ-INIT-001");
    requirement.category = "SETUP".to_string();
    requirement.subcategory = "Project".to_string();
    requirement.requirement_text =
        "Requirements traceability is initialized for this project".to_string();
    requirement.validation_method = "Inspection".to_string();
    requirement.status = Status::Complete.into();
    requirement.priority = Priority::High.into();
    requirement.phase = Some(1);

    [requirement].into_iter().collect()
}
