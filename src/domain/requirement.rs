use std::collections::{BTreeMap, BTreeSet};

use crate::{
    domain::{
        reference::{RequirementRef, parse_requirement_ref},
        status::{Priority, Recognised, Status},
        Database,
    },
    storage::{RemoteResolver, Resolution},
};

/// A requirement is a single row of the traceability database.
///
/// Besides its identity and classification, a requirement carries two
/// relation sets. `dependencies` lists the requirements that must be complete
/// before this one is satisfied; `blocks` is the inverse view, listing the
/// requirements this one gates. Both hold raw reference strings, which may
/// point at other repositories (see [`RequirementRef`]).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Requirement {
    /// Unique identifier within the owning database.
    pub(crate) req_id: String,

    /// Top-level grouping.
    pub category: String,
    /// Second-level grouping.
    pub subcategory: String,
    /// The requirement statement.
    pub requirement_text: String,
    /// Measurable target, if any.
    pub target_value: String,
    /// Test module that verifies the requirement.
    pub test_module: String,
    /// Test function that verifies the requirement.
    pub test_function: String,
    /// How the requirement is validated.
    pub validation_method: String,

    /// Implementation status.
    pub status: Recognised<Status>,
    /// Scheduling priority.
    pub priority: Recognised<Priority>,
    /// Delivery phase. Valid phases start at 1.
    pub phase: Option<i64>,

    /// Free-form notes.
    pub notes: String,
    /// Estimated effort in weeks, kept as written.
    pub effort_weeks: String,
    /// Person responsible.
    pub assignee: String,
    /// Sprint the work is planned for.
    pub sprint: String,
    /// Date work started.
    pub started_date: String,
    /// Date work completed.
    pub completed_date: String,
    /// Path to a longer requirement specification.
    pub requirement_file: String,

    /// References this requirement depends on.
    pub(crate) dependencies: BTreeSet<String>,
    /// References this requirement blocks.
    pub(crate) blocks: BTreeSet<String>,

    /// Validation taxonomy flags, keyed by column name.
    pub(crate) flags: BTreeMap<String, bool>,
    /// Columns this crate does not interpret, passed through verbatim.
    pub(crate) extra: BTreeMap<String, String>,
}

impl Requirement {
    /// Construct a new requirement with the given identifier.
    ///
    /// All other fields take their default values; status defaults to
    /// `MISSING` and priority to `MEDIUM`.
    #[must_use]
    pub fn new(req_id: impl Into<String>) -> Self {
        Self {
            req_id: req_id.into(),
            ..Self::default()
        }
    }

    /// The requirement's identifier.
    #[must_use]
    pub fn req_id(&self) -> &str {
        &self.req_id
    }

    /// Whether the requirement has reached `COMPLETE`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == Recognised::Known(Status::Complete)
    }

    /// The references this requirement depends on, in sorted order.
    #[must_use]
    pub const fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    /// The references this requirement blocks, in sorted order.
    #[must_use]
    pub const fn blocks(&self) -> &BTreeSet<String> {
        &self.blocks
    }

    /// Dependencies that refer to requirements in the same database.
    ///
    /// References that fail to parse are treated as local identifiers.
    pub fn local_dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .map(String::as_str)
            .filter(|dep| is_local_reference(dep))
    }

    /// Blocked references that refer to requirements in the same database.
    pub fn local_blocks(&self) -> impl Iterator<Item = &str> {
        self.blocks
            .iter()
            .map(String::as_str)
            .filter(|block| is_local_reference(block))
    }

    /// Add a dependency.
    ///
    /// Returns `true` if the dependency was not already present.
    pub fn add_dependency(&mut self, reference: impl Into<String>) -> bool {
        self.dependencies.insert(reference.into())
    }

    /// Remove a dependency, returning whether it was present.
    pub fn remove_dependency(&mut self, reference: &str) -> bool {
        self.dependencies.remove(reference)
    }

    /// Add a blocked requirement.
    ///
    /// Returns `true` if the reference was not already present.
    pub fn add_block(&mut self, reference: impl Into<String>) -> bool {
        self.blocks.insert(reference.into())
    }

    /// Remove a blocked requirement, returning whether it was present.
    pub fn remove_block(&mut self, reference: &str) -> bool {
        self.blocks.remove(reference)
    }

    /// The value of a validation taxonomy flag. Absent flags read as `false`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Set a validation taxonomy flag.
    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    /// A pass-through column value, if the column was present.
    #[must_use]
    pub fn extra(&self, column: &str) -> Option<&str> {
        self.extra.get(column).map(String::as_str)
    }

    /// Whether any dependency of this requirement is unsatisfied.
    ///
    /// - A local dependency blocks if it exists in `db` and is not complete.
    ///   Dependencies on identifiers missing from `db` do not block; schema
    ///   validation reports them.
    /// - A cross-repo dependency never blocks without a resolver. With one,
    ///   it blocks if the remote requirement is incomplete or missing from an
    ///   available remote. Unavailable or unconfigured remotes do not block.
    pub fn is_blocked(&self, db: &Database, mut remotes: Option<&mut RemoteResolver<'_>>) -> bool {
        self.dependencies.iter().any(|dep| match parse_requirement_ref(dep) {
            Ok(reference) if reference.is_cross_repo() => remotes
                .as_deref_mut()
                .is_some_and(|resolver| remote_blocks(resolver, &reference)),
            Ok(reference) => local_blocks(db, reference.req_id()),
            Err(_) => local_blocks(db, dep),
        })
    }
}

fn local_blocks(db: &Database, req_id: &str) -> bool {
    db.find(req_id).is_some_and(|dep| !dep.is_complete())
}

fn remote_blocks(resolver: &mut RemoteResolver<'_>, reference: &RequirementRef) -> bool {
    match resolver.resolve(reference) {
        Resolution::Found { requirement, .. } => !requirement.is_complete(),
        Resolution::Missing { .. } => true,
        Resolution::Local
        | Resolution::UnknownAlias(_)
        | Resolution::UnknownRepo(_)
        | Resolution::NoLocalPath(_)
        | Resolution::Unavailable(_) => false,
    }
}

/// Whether a relation entry refers to the local database.
///
/// Entries that fail to parse are treated as (malformed) local identifiers.
pub(crate) fn is_local_reference(reference: &str) -> bool {
    parse_requirement_ref(reference).map_or(true, |parsed| parsed.is_local())
}
