use std::path::{Path, PathBuf};

use tracing::debug;

/// Maximum number of directories examined when searching upward, including
/// the start directory.
pub const MAX_SEARCH_DEPTH: usize = 20;

const DATABASE_CANDIDATES: [&str; 2] = [".rtmx/database.csv", "docs/rtm_database.csv"];
const CONFIG_CANDIDATES: [&str; 2] = [".rtmx/config.yaml", "rtmx.yaml"];

/// Error returned when no database can be found.
#[derive(Debug, thiserror::Error)]
#[error(
    "could not find RTM database (looking for .rtmx/database.csv or docs/rtm_database.csv), started from {}",
    .start.display()
)]
pub struct LocateError {
    /// The directory the search started from.
    pub start: PathBuf,
}

/// Search upward from `start` for the requirements database.
///
/// In each directory `.rtmx/database.csv` is preferred over the legacy
/// `docs/rtm_database.csv`.
///
/// # Errors
///
/// Returns [`LocateError`] if neither file exists within
/// [`MAX_SEARCH_DEPTH`] levels.
pub fn find_database(start: &Path) -> Result<PathBuf, LocateError> {
    search_upward(start, &DATABASE_CANDIDATES).ok_or_else(|| LocateError {
        start: start.to_path_buf(),
    })
}

/// Search upward from `start` for a configuration file.
///
/// In each directory `.rtmx/config.yaml` is preferred over `rtmx.yaml`.
#[must_use]
pub fn find_config(start: &Path) -> Option<PathBuf> {
    search_upward(start, &CONFIG_CANDIDATES)
}

fn search_upward(start: &Path, candidates: &[&str]) -> Option<PathBuf> {
    let start = start
        .canonicalize()
        .unwrap_or_else(|_| start.to_path_buf());

    start
        .ancestors()
        .take(MAX_SEARCH_DEPTH)
        .flat_map(|dir| candidates.iter().map(move |candidate| dir.join(candidate)))
        .find(|path| path.is_file())
        .inspect(|path| debug!(path = %path.display(), "found"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "req_id\n").unwrap();
    }

    fn nested(root: &Path, depth: usize) -> PathBuf {
        let dir = (0..depth).fold(root.to_path_buf(), |dir, i| dir.join(format!("d{i}")));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn finds_database_in_ancestor() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join(".rtmx/database.csv");
        touch(&db);

        let found = find_database(&nested(tmp.path(), 3)).unwrap();

        assert_eq!(found, db.canonicalize().unwrap());
    }

    #[test]
    fn prefers_rtmx_directory_over_legacy_location() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("docs/rtm_database.csv"));
        touch(&tmp.path().join(".rtmx/database.csv"));

        let found = find_database(tmp.path()).unwrap();

        assert!(found.ends_with(".rtmx/database.csv"));
    }

    #[test]
    fn nearer_legacy_database_wins() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join(".rtmx/database.csv"));
        let inner = nested(tmp.path(), 1);
        touch(&inner.join("docs/rtm_database.csv"));

        let found = find_database(&inner).unwrap();

        assert!(found.ends_with("d0/docs/rtm_database.csv"));
    }

    #[test]
    fn search_stops_at_max_depth() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join(".rtmx/database.csv"));

        assert!(find_database(&nested(tmp.path(), MAX_SEARCH_DEPTH - 1)).is_ok());
        assert!(find_database(&nested(tmp.path(), MAX_SEARCH_DEPTH)).is_err());
    }

    #[test]
    fn finds_config_files() {
        let tmp = TempDir::new().unwrap();
        assert!(find_config(tmp.path()).is_none());

        touch(&tmp.path().join("rtmx.yaml"));
        assert!(find_config(tmp.path()).unwrap().ends_with("rtmx.yaml"));

        touch(&tmp.path().join(".rtmx/config.yaml"));
        assert!(
            find_config(tmp.path())
                .unwrap()
                .ends_with(".rtmx/config.yaml")
        );
    }
}
