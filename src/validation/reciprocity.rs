//! Consistency of the `blocks` and `dependencies` relations.
//!
//! Within one database, "A blocks B" and "B depends on A" must always appear
//! together. Cross-repo entries are exempt; each repository maintains its own
//! side.

use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::Database;

/// A single reciprocity problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReciprocityViolation {
    /// The requirement that should change to restore reciprocity.
    pub source: String,
    /// The other side of the relation.
    pub related: String,
    /// Human-readable description.
    pub issue: String,
}

impl ReciprocityViolation {
    fn new(source: &str, related: &str, issue: String) -> Self {
        Self {
            source: source.to_string(),
            related: related.to_string(),
            issue,
        }
    }
}

impl fmt::Display for ReciprocityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}: {}", self.source, self.related, self.issue)
    }
}

/// Find every local relation that lacks its inverse.
///
/// For each requirement `A`:
/// - every `B` in `A.blocks` must exist and list `A` as a dependency;
/// - every `B` in `A.dependencies` must exist and list `A` in its blocks.
#[must_use]
#[instrument(level = "debug", skip(db))]
pub fn check_reciprocity(db: &Database) -> Vec<ReciprocityViolation> {
    let mut violations = Vec::new();

    for req in db {
        let id = req.req_id();

        for blocked in req.local_blocks() {
            match db.find(blocked) {
                None => violations.push(ReciprocityViolation::new(
                    id,
                    blocked,
                    "blocks non-existent requirement".to_string(),
                )),
                Some(target) if !target.dependencies().contains(id) => {
                    violations.push(ReciprocityViolation::new(
                        id,
                        blocked,
                        format!("blocks {blocked} but {blocked} doesn't depend on {id}"),
                    ));
                }
                Some(_) => {}
            }
        }

        for dep in req.local_dependencies() {
            match db.find(dep) {
                None => violations.push(ReciprocityViolation::new(
                    id,
                    dep,
                    "depends on non-existent requirement".to_string(),
                )),
                Some(target) if !target.blocks().contains(id) => {
                    violations.push(ReciprocityViolation::new(
                        dep,
                        id,
                        format!("{id} depends on {dep} but {dep} doesn't block {id}"),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    debug!(violations = violations.len());
    violations
}

/// Add the missing inverse of every local relation, in place.
///
/// Dangling references are left alone and no requirement is created.
/// Returns the number of entries added; a second call returns zero.
#[instrument(level = "debug", skip(db))]
pub fn fix_reciprocity(db: &mut Database) -> usize {
    let relations: Vec<(String, Vec<String>, Vec<String>)> = db
        .iter()
        .map(|req| {
            (
                req.req_id().to_string(),
                req.local_blocks().map(String::from).collect(),
                req.local_dependencies().map(String::from).collect(),
            )
        })
        .collect();

    let mut fixed = 0;
    for (id, blocks, dependencies) in relations {
        for blocked in blocks {
            if db
                .get_mut(&blocked)
                .is_ok_and(|target| target.add_dependency(id.as_str()))
            {
                fixed += 1;
            }
        }
        for dep in dependencies {
            if db
                .get_mut(&dep)
                .is_ok_and(|target| target.add_block(id.as_str()))
            {
                fixed += 1;
            }
        }
    }

    debug!(fixed);
    fixed
}
