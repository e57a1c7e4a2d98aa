use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::storage::find_config;

/// Project configuration, stored as YAML under a top-level `rtmx` key.
///
/// ```yaml
/// rtmx:
///   database: .rtmx/database.csv
///   sync:
///     conflict_resolution: manual
///     remotes:
///       sync:
///         repo: rtmx-ai/rtmx-sync
///         path: ../rtmx-sync
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ConfigFile", into = "ConfigFile")]
pub struct Config {
    /// Database location, relative to the project root.
    database: PathBuf,

    /// Cross-repository synchronisation settings.
    pub sync: SyncConfig,

    /// The file this configuration was loaded from. Never serialized.
    path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            sync: SyncConfig::default(),
            path: None,
        }
    }
}

impl Config {
    /// Loads the configuration from a YAML file at the given path.
    ///
    /// A missing or empty file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the YAML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self {
                    path: Some(path.to_path_buf()),
                    ..Self::default()
                });
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let mut config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Search upward from `start` for a configuration file and load it.
    ///
    /// Returns the default configuration if none is found.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is found but cannot be
    /// loaded.
    pub fn discover(start: &Path) -> Result<Self, ConfigError> {
        find_config(start).map_or_else(|| Ok(Self::default()), |path| Self::load(&path))
    }

    /// Saves the configuration to a YAML file at the given path, creating
    /// parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized or if the
    /// file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The file this configuration was loaded from, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The configured database location, relative to the project root.
    #[must_use]
    pub fn database(&self) -> &Path {
        &self.database
    }

    /// The directory the configuration belongs to.
    ///
    /// For `<root>/.rtmx/config.yaml` this is `<root>`; for `<root>/rtmx.yaml`
    /// it is also `<root>`. `None` for configurations not loaded from disk.
    #[must_use]
    pub fn project_root(&self) -> Option<&Path> {
        let parent = self.path.as_deref()?.parent()?;
        if parent.file_name().is_some_and(|name| name == ".rtmx") {
            parent.parent()
        } else {
            Some(parent)
        }
    }
}

/// Cross-repository synchronisation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncConfig {
    /// How conflicting edits between repositories are settled.
    pub conflict_resolution: ConflictResolution,

    remotes: BTreeMap<String, RemoteConfig>,
}

impl SyncConfig {
    /// The remote registered under `alias`.
    #[must_use]
    pub fn get_remote(&self, alias: &str) -> Option<&RemoteConfig> {
        self.remotes.get(alias)
    }

    /// The first remote (in alias order) whose repository is `repo`.
    #[must_use]
    pub fn remote_for_repo(&self, repo: &str) -> Option<&RemoteConfig> {
        self.remotes.values().find(|remote| remote.repo == repo)
    }

    /// All configured remotes, in alias order.
    pub fn remotes(&self) -> impl Iterator<Item = &RemoteConfig> {
        self.remotes.values()
    }

    /// Registers a remote, replacing any remote with the same alias.
    ///
    /// Returns the replaced remote, if there was one.
    pub fn add_remote(&mut self, remote: RemoteConfig) -> Option<RemoteConfig> {
        self.remotes.insert(remote.alias.clone(), remote)
    }

    /// Removes the remote registered under `alias`.
    pub fn remove_remote(&mut self, alias: &str) -> Option<RemoteConfig> {
        self.remotes.remove(alias)
    }
}

/// A named external requirements database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// The short name used in `alias:REQ-ID` references.
    pub alias: String,

    /// Repository identity, e.g. `rtmx-ai/rtmx-sync`.
    pub repo: String,

    /// Local checkout of the repository. Without one, the remote cannot be
    /// resolved.
    pub path: Option<PathBuf>,

    /// Database location inside the repository.
    pub database: PathBuf,
}

impl RemoteConfig {
    /// A remote with no local checkout and the default database location.
    #[must_use]
    pub fn new(alias: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            repo: repo.into(),
            path: None,
            database: default_database(),
        }
    }

    /// Sets the local checkout path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the database location inside the repository.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<PathBuf>) -> Self {
        self.database = database.into();
        self
    }

    /// The remote database file, with relative checkout paths resolved
    /// against `base`. `None` if no local path is configured.
    #[must_use]
    pub fn database_path(&self, base: &Path) -> Option<PathBuf> {
        self.path
            .as_ref()
            .map(|path| base.join(path).join(&self.database))
    }
}

/// Strategy for settling conflicting edits between repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictResolution {
    /// Ask the operator.
    #[default]
    Manual,
    /// Keep the local value.
    PreferLocal,
    /// Take the remote value.
    PreferRemote,
}

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        /// The config file.
        path: PathBuf,
        /// The underlying IO error.
        source: io::Error,
    },

    /// The file is not valid configuration YAML.
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        /// The config file.
        path: PathBuf,
        /// The underlying YAML error.
        source: serde_yaml::Error,
    },

    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(serde_yaml::Error),

    /// The file could not be written.
    #[error("failed to write config file {}: {source}", .path.display())]
    Write {
        /// The config file.
        path: PathBuf,
        /// The underlying IO error.
        source: io::Error,
    },
}

fn default_database() -> PathBuf {
    PathBuf::from(".rtmx/database.csv")
}

/// The on-disk shape of the configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    rtmx: Section,
}

#[derive(Debug, Serialize, Deserialize)]
struct Section {
    #[serde(default = "default_database")]
    database: PathBuf,

    #[serde(default)]
    sync: SyncSection,
}

impl Default for Section {
    fn default() -> Self {
        Self {
            database: default_database(),
            sync: SyncSection::default(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SyncSection {
    #[serde(default)]
    conflict_resolution: ConflictResolution,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    remotes: BTreeMap<String, RemoteEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RemoteEntry {
    repo: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,

    #[serde(default = "default_database")]
    database: PathBuf,
}

impl From<ConfigFile> for Config {
    fn from(file: ConfigFile) -> Self {
        let Section { database, sync } = file.rtmx;
        let remotes = sync
            .remotes
            .into_iter()
            .map(|(alias, entry)| {
                let remote = RemoteConfig {
                    alias: alias.clone(),
                    repo: entry.repo,
                    path: entry.path,
                    database: entry.database,
                };
                (alias, remote)
            })
            .collect();

        Self {
            database,
            sync: SyncConfig {
                conflict_resolution: sync.conflict_resolution,
                remotes,
            },
            path: None,
        }
    }
}

impl From<Config> for ConfigFile {
    fn from(config: Config) -> Self {
        let remotes = config
            .sync
            .remotes
            .into_iter()
            .map(|(alias, remote)| {
                let entry = RemoteEntry {
                    repo: remote.repo,
                    path: remote.path,
                    database: remote.database,
                };
                (alias, entry)
            })
            .collect();

        Self {
            rtmx: Section {
                database: config.database,
                sync: SyncSection {
                    conflict_resolution: config.sync.conflict_resolution,
                    remotes,
                },
            },
        }
    }
}
