use std::{
    env,
    path::{Path, PathBuf},
};

mod backlog;
mod cycles;
mod deps;
mod init;
mod reconcile;
mod remote;
mod status;
mod terminal;
mod validate;

use anyhow::Context as _;
use backlog::Backlog;
use clap::ArgAction;
use cycles::Cycles;
use deps::Deps;
use reconcile::Reconcile;
use rtmx::{Config, Database, find_database};
use status::Status;
use tracing::{debug, instrument};
use validate::Validate;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Log verbosity (-v, -vv, -vvv), given before the command
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Path to the RTM database CSV.
    ///
    /// By default the database is searched for upward from the current
    /// directory.
    #[arg(long, value_name = "PATH", global = true)]
    rtm_csv: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);
        if self.no_color {
            terminal::disable_color();
        }

        let context = Context {
            rtm_csv: self.rtm_csv,
            config: self.config,
        };

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(&context)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show completion status (default)
    Status(Status),

    /// List incomplete requirements by priority
    Backlog(Backlog),

    /// Check and repair dependency/blocks reciprocity
    Reconcile(Reconcile),

    /// Show the dependency graph
    Deps(Deps),

    /// Report circular dependencies
    Cycles(Cycles),

    /// Validate the database and cross-repo references
    Validate(Validate),

    /// Initialize a new RTMX project
    Init(init::Command),

    /// Manage remote repositories for cross-repo references
    Remote(remote::Command),
}

impl Command {
    fn run(self, context: &Context) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(context)?,
            Self::Backlog(command) => command.run(context)?,
            Self::Reconcile(command) => command.run(context)?,
            Self::Deps(command) => command.run(context)?,
            Self::Cycles(command) => command.run(context)?,
            Self::Validate(command) => command.run(context)?,
            Self::Init(command) => command.run(&env::current_dir()?)?,
            Self::Remote(command) => command.run(context)?,
        }
        Ok(())
    }
}

/// Global options shared by every command.
#[derive(Debug)]
pub struct Context {
    rtm_csv: Option<PathBuf>,
    config: Option<PathBuf>,
}

/// A loaded database together with its configuration.
#[derive(Debug)]
pub struct Project {
    pub config: Config,
    pub path: PathBuf,
    pub db: Database,
}

impl Context {
    /// Load the configuration named on the command line, or the nearest one
    /// above the current directory.
    pub fn config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load config {}", path.display())),
            None => Ok(Config::discover(&env::current_dir()?)?),
        }
    }

    /// Where configuration changes are written.
    ///
    /// Defaults to `.rtmx/config.yaml` in the current directory when no
    /// configuration file exists yet.
    pub fn config_path(&self, config: &Config) -> anyhow::Result<PathBuf> {
        if let Some(path) = config.path() {
            return Ok(path.to_path_buf());
        }
        Ok(env::current_dir()?.join(".rtmx").join("config.yaml"))
    }

    /// Resolve the database path: the `--rtm-csv` option, then the configured
    /// database of the project, then an upward search.
    fn database_path(&self, config: &Config) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.rtm_csv {
            return Ok(path.clone());
        }

        if let Some(path) = config
            .project_root()
            .map(|root| root.join(config.database()))
            .filter(|path| path.is_file())
        {
            return Ok(path);
        }

        Ok(find_database(&env::current_dir()?)?)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn open(&self) -> anyhow::Result<Project> {
        let config = self.config()?;
        let path = self.database_path(&config)?;
        debug!(path = %path.display(), "loading database");
        let db = Database::load(&path)
            .with_context(|| format!("failed to load {}", display_relative(&path)))?;
        Ok(Project { config, path, db })
    }
}

/// Shows `path` relative to the current directory where possible.
pub fn display_relative(path: &Path) -> String {
    env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn status_detail_is_separate_from_log_verbosity() {
        let cli = Cli::try_parse_from(["rtmx", "status", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(matches!(cli.command, Some(Command::Status(ref status)) if status.detail() == 2));

        let cli = Cli::try_parse_from(["rtmx", "-v", "status"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Some(Command::Status(ref status)) if status.detail() == 0));
    }
}
