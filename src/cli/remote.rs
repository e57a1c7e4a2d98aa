use std::{
    path::{Path, PathBuf},
    process,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rtmx::{Config, RemoteConfig};
use tracing::{info, instrument};

use super::{Context, display_relative, terminal::Colorize};

#[derive(Debug, Parser)]
pub struct Command {
    #[command(subcommand)]
    command: RemoteCommand,
}

#[derive(Debug, Subcommand)]
enum RemoteCommand {
    /// List configured remotes and whether their databases are available
    List,

    /// Register a remote repository
    Add(AddArgs),

    /// Remove a remote repository
    Remove {
        /// Alias of the remote to remove
        alias: String,
    },
}

#[derive(Debug, Parser)]
struct AddArgs {
    /// Short name used in `alias:REQ-ID` references
    alias: String,

    /// Repository identity, e.g. `org/repo`
    #[arg(long)]
    repo: String,

    /// Local checkout of the repository
    #[arg(long)]
    path: Option<PathBuf>,

    /// Database location inside the repository
    #[arg(long, default_value = ".rtmx/database.csv")]
    database: PathBuf,
}

impl Command {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let config = context.config()?;

        match self.command {
            RemoteCommand::List => list(&config),
            RemoteCommand::Add(args) => add(context, config, args)?,
            RemoteCommand::Remove { alias } => remove(context, config, &alias)?,
        }

        Ok(())
    }
}

fn list(config: &Config) {
    let remotes: Vec<&RemoteConfig> = config.sync.remotes().collect();

    if remotes.is_empty() {
        println!("No remotes configured.");
        println!(
            "{}",
            "Add one with: rtmx remote add <alias> --repo <org/repo> --path <dir>".dim()
        );
        return;
    }

    let base = config.project_root().unwrap_or_else(|| Path::new("."));

    println!("Configured remotes ({}):", remotes.len());
    println!();
    for remote in remotes {
        let marker = match remote.database_path(base) {
            Some(path) if path.is_file() => "✓ available".success(),
            Some(_) => "✗ not found".error(),
            None => "(no local path)".dim(),
        };
        println!("  {}: {} {marker}", remote.alias.bold(), remote.repo);
        if let Some(path) = &remote.path {
            println!("    path: {}", path.display());
        }
        println!("    database: {}", remote.database.display());
    }
}

fn add(context: &Context, mut config: Config, args: AddArgs) -> anyhow::Result<()> {
    if config.sync.get_remote(&args.alias).is_some() {
        eprintln!(
            "{}",
            format!(
                "Remote '{}' already exists. Use 'rtmx remote remove' first.",
                args.alias
            )
            .error()
        );
        process::exit(1);
    }

    let mut remote = RemoteConfig::new(&args.alias, &args.repo).with_database(args.database);
    if let Some(path) = &args.path {
        remote = remote.with_path(path);
    }
    config.sync.add_remote(remote);

    let path = save(context, &config)?;
    info!(alias = %args.alias, config = %path.display(), "added remote");

    println!(
        "{}",
        format!("Added remote '{}' -> {}", args.alias, args.repo).success()
    );
    if let Some(local) = &args.path {
        println!("  local path: {}", local.display());
    }

    Ok(())
}

fn remove(context: &Context, mut config: Config, alias: &str) -> anyhow::Result<()> {
    if config.sync.remove_remote(alias).is_none() {
        eprintln!("{}", format!("Remote '{alias}' not found.").error());
        process::exit(1);
    }

    let path = save(context, &config)?;
    info!(alias, config = %path.display(), "removed remote");

    println!("{}", format!("Removed remote '{alias}'").success());
    Ok(())
}

fn save(context: &Context, config: &Config) -> anyhow::Result<PathBuf> {
    let path = context.config_path(config)?;
    config
        .save(&path)
        .with_context(|| format!("failed to write {}", display_relative(&path)))?;
    Ok(path)
}
