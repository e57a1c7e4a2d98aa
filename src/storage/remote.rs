use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use tracing::{debug, instrument, warn};

use crate::{
    Database, Requirement,
    domain::{Config, RemoteConfig, RequirementRef, SyncConfig},
};

/// Loads remote databases on demand and resolves cross-repo references.
///
/// Each remote is loaded at most once per resolver. A remote that could not
/// be loaded is remembered as unavailable and not retried.
#[derive(Debug)]
pub struct RemoteResolver<'c> {
    sync: &'c SyncConfig,

    /// Directory that relative checkout paths are resolved against.
    base_dir: PathBuf,

    /// Loaded databases by alias. `None` marks a remote known to be
    /// unavailable.
    cache: HashMap<String, Option<Database>>,
}

/// The outcome of resolving a single reference.
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    /// The reference points into the local database.
    Local,

    /// No remote is configured under the reference's alias.
    UnknownAlias(&'a str),

    /// No remote is configured for the reference's repository.
    UnknownRepo(&'a str),

    /// The remote has no local checkout configured.
    NoLocalPath(&'a RemoteConfig),

    /// The remote's database is missing or could not be loaded.
    Unavailable(&'a RemoteConfig),

    /// The remote was loaded but does not contain the requirement.
    Missing {
        /// The remote that was searched.
        remote: &'a RemoteConfig,
    },

    /// The requirement was found.
    Found {
        /// The remote that holds the requirement.
        remote: &'a RemoteConfig,
        /// The remote requirement.
        requirement: &'a Requirement,
    },
}

impl<'c> RemoteResolver<'c> {
    /// A resolver for the remotes in `config`.
    ///
    /// Relative checkout paths are resolved against the project root, or the
    /// working directory if the configuration was not loaded from a file.
    #[must_use]
    pub fn new(config: &'c Config) -> Self {
        let base_dir = config
            .project_root()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self::with_base_dir(&config.sync, base_dir)
    }

    /// A resolver for `sync` that resolves relative checkout paths against
    /// `base_dir`.
    #[must_use]
    pub fn with_base_dir(sync: &'c SyncConfig, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            sync,
            base_dir: base_dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Resolve a reference against the configured remotes.
    ///
    /// Alias references are looked up by alias; repository references by
    /// the first remote configured for that repository.
    pub fn resolve<'r>(&'r mut self, reference: &'r RequirementRef) -> Resolution<'r> {
        let sync: &'c SyncConfig = self.sync;

        let remote = match (reference.remote_alias(), reference.full_repo()) {
            (Some(alias), _) => match sync.get_remote(alias) {
                Some(remote) => remote,
                None => return Resolution::UnknownAlias(alias),
            },
            (None, Some(repo)) => match sync.remote_for_repo(repo) {
                Some(remote) => remote,
                None => return Resolution::UnknownRepo(repo),
            },
            (None, None) => return Resolution::Local,
        };

        if remote.path.is_none() {
            return Resolution::NoLocalPath(remote);
        }

        match self.database(remote) {
            None => Resolution::Unavailable(remote),
            Some(db) => match db.find(reference.req_id()) {
                Some(requirement) => Resolution::Found {
                    remote,
                    requirement,
                },
                None => Resolution::Missing { remote },
            },
        }
    }

    /// The database of a remote, loading it on first use.
    ///
    /// Returns `None` if the remote has no local checkout, or its database
    /// is missing or fails to load.
    pub fn database(&mut self, remote: &RemoteConfig) -> Option<&Database> {
        let base_dir = &self.base_dir;
        self.cache
            .entry(remote.alias.clone())
            .or_insert_with(|| load_remote(base_dir, remote))
            .as_ref()
    }
}

#[instrument(level = "debug", skip(base_dir, remote), fields(alias = %remote.alias))]
fn load_remote(base_dir: &Path, remote: &RemoteConfig) -> Option<Database> {
    let path = remote.database_path(base_dir)?;

    if !path.is_file() {
        debug!(path = %path.display(), "remote database not found");
        return None;
    }

    match Database::load(&path) {
        Ok(db) => {
            debug!(path = %path.display(), requirements = db.len(), "loaded remote database");
            Some(db)
        }
        Err(e) => {
            warn!(path = %path.display(), "failed to load remote database: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write_remote(root: &Path, rows: &str) {
        let path = root.join(".rtmx/database.csv");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("req_id,category,requirement_text,status\n{rows}")).unwrap();
    }

    fn sync_with(remote: RemoteConfig) -> SyncConfig {
        let mut sync = SyncConfig::default();
        sync.add_remote(remote);
        sync
    }

    #[test]
    fn resolves_alias_and_repository_references() {
        let tmp = TempDir::new().unwrap();
        write_remote(tmp.path(), "REQ-SYNC-001,SYNC,Text,COMPLETE\n");
        let sync = sync_with(RemoteConfig::new("sync", "org/sync").with_path(tmp.path()));
        let mut resolver = RemoteResolver::with_base_dir(&sync, "/");

        let by_alias = RequirementRef::aliased("sync", "REQ-SYNC-001");
        assert!(matches!(
            resolver.resolve(&by_alias),
            Resolution::Found { requirement, .. } if requirement.is_complete()
        ));

        let by_repo = RequirementRef::in_repo("org/sync", "REQ-SYNC-001");
        assert!(matches!(
            resolver.resolve(&by_repo),
            Resolution::Found { .. }
        ));

        let missing = RequirementRef::aliased("sync", "REQ-NOPE");
        assert!(matches!(
            resolver.resolve(&missing),
            Resolution::Missing { remote } if remote.alias == "sync"
        ));
    }

    #[test]
    fn unconfigured_remotes_are_reported() {
        let sync = SyncConfig::default();
        let mut resolver = RemoteResolver::with_base_dir(&sync, ".");

        let alias = RequirementRef::aliased("unknown", "REQ-1");
        assert!(matches!(
            resolver.resolve(&alias),
            Resolution::UnknownAlias("unknown")
        ));

        let repo = RequirementRef::in_repo("org/other", "REQ-1");
        assert!(matches!(
            resolver.resolve(&repo),
            Resolution::UnknownRepo("org/other")
        ));

        let local = RequirementRef::local("REQ-1");
        assert!(matches!(resolver.resolve(&local), Resolution::Local));
    }

    #[test]
    fn remote_without_path_cannot_be_resolved() {
        let sync = sync_with(RemoteConfig::new("sync", "org/sync"));
        let mut resolver = RemoteResolver::with_base_dir(&sync, ".");
        let reference = RequirementRef::aliased("sync", "REQ-1");
        assert!(matches!(
            resolver.resolve(&reference),
            Resolution::NoLocalPath(_)
        ));
    }

    #[test]
    fn missing_checkout_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let sync = sync_with(
            RemoteConfig::new("sync", "org/sync").with_path(tmp.path().join("does-not-exist")),
        );
        let mut resolver = RemoteResolver::with_base_dir(&sync, ".");
        let reference = RequirementRef::aliased("sync", "REQ-1");
        assert!(matches!(
            resolver.resolve(&reference),
            Resolution::Unavailable(_)
        ));
    }

    #[test]
    fn unreadable_database_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        write_remote(tmp.path(), "");
        let sync = sync_with(RemoteConfig::new("sync", "org/sync").with_path(tmp.path()));
        let mut resolver = RemoteResolver::with_base_dir(&sync, ".");

        let reference = RequirementRef::aliased("sync", "REQ-1");
        assert!(matches!(
            resolver.resolve(&reference),
            Resolution::Unavailable(remote) if remote.alias == "sync"
        ));
    }

    #[test]
    fn unavailable_remote_is_not_retried() {
        let tmp = TempDir::new().unwrap();
        let sync = sync_with(RemoteConfig::new("sync", "org/sync").with_path(tmp.path()));
        let mut resolver = RemoteResolver::with_base_dir(&sync, ".");
        let reference = RequirementRef::aliased("sync", "REQ-1");

        assert!(matches!(
            resolver.resolve(&reference),
            Resolution::Unavailable(_)
        ));

        write_remote(tmp.path(), "REQ-1,C,T,COMPLETE\n");

        assert!(matches!(
            resolver.resolve(&reference),
            Resolution::Unavailable(_)
        ));
        assert!(resolver.database(sync.get_remote("sync").unwrap()).is_none());

        let mut fresh = RemoteResolver::with_base_dir(&sync, ".");
        assert!(matches!(
            fresh.resolve(&reference),
            Resolution::Found { .. }
        ));
    }

    #[test]
    fn relative_paths_resolve_against_base_dir() {
        let tmp = TempDir::new().unwrap();
        write_remote(&tmp.path().join("remote"), "REQ-1,C,T,MISSING\n");
        let sync = sync_with(RemoteConfig::new("r", "org/r").with_path("remote"));
        let mut resolver = RemoteResolver::with_base_dir(&sync, tmp.path());

        let reference = RequirementRef::aliased("r", "REQ-1");
        assert!(matches!(
            resolver.resolve(&reference),
            Resolution::Found { requirement, .. } if !requirement.is_complete()
        ));
    }

    #[test]
    fn remote_is_loaded_once() {
        let tmp = TempDir::new().unwrap();
        write_remote(tmp.path(), "REQ-1,C,T,COMPLETE\n");
        let sync = sync_with(RemoteConfig::new("sync", "org/sync").with_path(tmp.path()));
        let mut resolver = RemoteResolver::with_base_dir(&sync, "/");
        let reference = RequirementRef::aliased("sync", "REQ-1");

        assert!(matches!(resolver.resolve(&reference), Resolution::Found { .. }));
        fs::remove_file(tmp.path().join(".rtmx/database.csv")).unwrap();
        assert!(matches!(resolver.resolve(&reference), Resolution::Found { .. }));
    }
}
