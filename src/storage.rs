//! Filesystem storage: the CSV database format, locating project files, and
//! loading remote databases.

/// CSV serialization for requirements databases.
pub mod csv;
mod locate;
mod remote;

pub use self::csv::{LoadError, SaveError};
pub use locate::{LocateError, MAX_SEARCH_DEPTH, find_config, find_database};
pub use remote::{RemoteResolver, Resolution};
