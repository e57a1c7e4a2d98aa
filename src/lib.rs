//! Requirements traceability with dependency graph validation.
//!
//! Requirements are rows of a CSV database. Each row carries a status, a
//! priority, and two relation sets: the requirements it depends on and the
//! requirements it blocks. This crate loads and saves that database, detects
//! circular dependencies, keeps `blocks` and `dependencies` consistent, and
//! checks references to requirements held in other repositories.

pub mod domain;
pub use domain::{
    Config, Database, NotFoundError, Priority, Recognised, RemoteConfig, Requirement,
    RequirementRef, Status, parse_requirement_ref,
};

/// Filesystem storage for requirements databases.
pub mod storage;
pub use storage::{RemoteResolver, Resolution, find_database};

pub mod validation;
pub use validation::{
    CrossRepoReport, ReciprocityViolation, ValidationSummary, check_reciprocity, fix_reciprocity,
    validate_all, validate_cross_repo_deps,
};
