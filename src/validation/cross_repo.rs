use std::path::Path;

use serde::Serialize;
use tracing::instrument;

use crate::{
    Database,
    domain::{Config, parse_requirement_ref},
    storage::{RemoteResolver, Resolution},
};

/// Findings from cross-repository dependency validation.
///
/// Remotes that cannot be checked produce warnings rather than errors, so
/// that validation still passes when working offline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrossRepoReport {
    /// Problems that are definitely wrong.
    pub errors: Vec<String>,
    /// References that could not be verified.
    pub warnings: Vec<String>,
}

impl CrossRepoReport {
    /// Whether there were no errors and no warnings.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Check every cross-repo dependency against the configured remotes.
///
/// A fresh [`RemoteResolver`] is built for the call; neither the database
/// nor the configuration is modified.
#[must_use]
pub fn validate_cross_repo_deps(db: &Database, config: &Config) -> CrossRepoReport {
    let mut resolver = RemoteResolver::new(config);
    validate_cross_repo_deps_with(db, &mut resolver)
}

/// As [`validate_cross_repo_deps`], reusing an existing resolver and its
/// cache.
#[instrument(level = "debug", skip_all, fields(requirements = db.len()))]
pub fn validate_cross_repo_deps_with(
    db: &Database,
    resolver: &mut RemoteResolver<'_>,
) -> CrossRepoReport {
    let mut report = CrossRepoReport::default();

    for req in db {
        let id = req.req_id();

        for dep in req.dependencies() {
            let reference = match parse_requirement_ref(dep) {
                Ok(reference) => reference,
                Err(e) => {
                    report
                        .errors
                        .push(format!("{id}: Invalid dependency reference '{dep}': {e}"));
                    continue;
                }
            };

            match resolver.resolve(&reference) {
                Resolution::Local | Resolution::Found { .. } => {}
                Resolution::UnknownAlias(alias) => report.errors.push(format!(
                    "{id}: Unknown remote alias '{alias}' in dependency '{dep}'"
                )),
                Resolution::UnknownRepo(repo) => report.errors.push(format!(
                    "{id}: No remote configured for repository '{repo}' in dependency '{dep}'"
                )),
                Resolution::NoLocalPath(remote) => report.warnings.push(format!(
                    "{id}: Remote '{}' has no local path configured - cannot verify '{dep}'",
                    remote.alias
                )),
                Resolution::Unavailable(remote) => report.warnings.push(format!(
                    "{id}: Remote '{}' unavailable or not found at '{}' - cannot verify '{dep}'",
                    remote.alias,
                    remote.path.as_deref().unwrap_or_else(|| Path::new("")).display()
                )),
                Resolution::Missing { remote } => report.errors.push(format!(
                    "{id}: Dependency '{}' not found in remote '{}'",
                    reference.req_id(),
                    remote.alias
                )),
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use test_case::test_case;

    use super::*;
    use crate::{
        Requirement,
        domain::{RemoteConfig, Status},
    };

    fn remote_checkout(status: Status) -> TempDir {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".rtmx/database.csv");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            path,
            format!(
                "req_id,category,requirement_text,status\nREQ-SYNC-001,SYNC,Sync engine,{status}\n"
            ),
        )
        .unwrap();
        tmp
    }

    fn config_with(remote: RemoteConfig) -> Config {
        let mut config = Config::default();
        config.sync.add_remote(remote);
        config
    }

    fn local_db(dependency: &str) -> Database {
        let mut req = Requirement::new("REQ-LOCAL-001");
        req.add_dependency(dependency);
        Database::from_iter([req])
    }

    fn is_blocked(db: &Database, config: &Config) -> bool {
        let mut resolver = RemoteResolver::new(config);
        db.get("REQ-LOCAL-001")
            .unwrap()
            .is_blocked(db, Some(&mut resolver))
    }

    #[test]
    fn complete_remote_dependency_is_valid_and_unblocked() {
        let checkout = remote_checkout(Status::Complete);
        let config =
            config_with(RemoteConfig::new("sync", "rtmx-ai/rtmx-sync").with_path(checkout.path()));
        let db = local_db("sync:REQ-SYNC-001");

        let report = validate_cross_repo_deps(&db, &config);

        assert!(report.is_clean(), "{report:?}");
        assert!(!is_blocked(&db, &config));
    }

    #[test]
    fn incomplete_remote_dependency_blocks() {
        let checkout = remote_checkout(Status::InProgress);
        let config =
            config_with(RemoteConfig::new("sync", "rtmx-ai/rtmx-sync").with_path(checkout.path()));
        let db = local_db("sync:REQ-SYNC-001");

        assert!(validate_cross_repo_deps(&db, &config).is_clean());
        assert!(is_blocked(&db, &config));
    }

    #[test]
    fn full_repository_reference_uses_matching_remote() {
        let checkout = remote_checkout(Status::Complete);
        let config =
            config_with(RemoteConfig::new("sync", "rtmx-ai/rtmx-sync").with_path(checkout.path()));
        let db = local_db("rtmx-ai/rtmx-sync:REQ-SYNC-001");

        assert!(validate_cross_repo_deps(&db, &config).is_clean());
        assert!(!is_blocked(&db, &config));
    }

    #[test]
    fn unavailable_remote_degrades_to_warning() {
        let tmp = TempDir::new().unwrap();
        let config = config_with(
            RemoteConfig::new("sync", "rtmx-ai/rtmx-sync").with_path(tmp.path().join("nowhere")),
        );
        let db = local_db("sync:REQ-SYNC-001");

        let report = validate_cross_repo_deps(&db, &config);

        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(
            report.warnings[0].contains("unavailable") || report.warnings[0].contains("not found")
        );
        assert!(!is_blocked(&db, &config));
    }

    #[test_case("req_id,category,requirement_text,status\n"; "header only")]
    #[test_case("req_id,phase\nREQ-SYNC-001,first\n"; "invalid phase")]
    #[test_case(""; "empty file")]
    fn unloadable_remote_degrades_to_warning(contents: &str) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".rtmx/database.csv");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        let config =
            config_with(RemoteConfig::new("sync", "rtmx-ai/rtmx-sync").with_path(tmp.path()));
        let db = local_db("sync:REQ-SYNC-001");

        let report = validate_cross_repo_deps(&db, &config);

        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("unavailable"));
        assert!(!is_blocked(&db, &config));
    }

    #[test]
    fn remote_without_path_degrades_to_warning() {
        let config = config_with(RemoteConfig::new("sync", "rtmx-ai/rtmx-sync"));
        let db = local_db("sync:REQ-SYNC-001");

        let report = validate_cross_repo_deps(&db, &config);

        assert!(report.errors.is_empty());
        assert!(report.warnings[0].contains("has no local path configured"));
        assert!(!is_blocked(&db, &config));
    }

    #[test]
    fn unknown_alias_is_an_error() {
        let db = local_db("unknown:REQ-X-001");

        let report = validate_cross_repo_deps(&db, &Config::default());

        assert_eq!(report.errors.len(), 1);
        let error = report.errors[0].to_lowercase();
        assert!(error.contains("unknown"));
        assert!(error.contains("'unknown'"));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unmatched_repository_is_an_error() {
        let db = local_db("other-org/other:REQ-1");

        let report = validate_cross_repo_deps(&db, &Config::default());

        assert_eq!(
            report.errors,
            ["REQ-LOCAL-001: No remote configured for repository 'other-org/other' in dependency 'other-org/other:REQ-1'"]
        );
    }

    #[test]
    fn requirement_missing_from_remote_is_an_error() {
        let checkout = remote_checkout(Status::Complete);
        let config =
            config_with(RemoteConfig::new("sync", "rtmx-ai/rtmx-sync").with_path(checkout.path()));
        let db = local_db("sync:REQ-SYNC-999");

        let report = validate_cross_repo_deps(&db, &config);

        assert_eq!(
            report.errors,
            ["REQ-LOCAL-001: Dependency 'REQ-SYNC-999' not found in remote 'sync'"]
        );
        assert!(is_blocked(&db, &config));
    }

    #[test]
    fn malformed_reference_is_an_error() {
        let db = local_db("a:b:c");
        let report = validate_cross_repo_deps(&db, &Config::default());
        assert!(report.errors[0].contains("Invalid dependency reference"));
    }

    #[test]
    fn local_dependencies_are_ignored() {
        let db = local_db("REQ-OTHER");
        assert!(validate_cross_repo_deps(&db, &Config::default()).is_clean());
    }
}
