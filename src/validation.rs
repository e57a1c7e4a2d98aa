//! Validation of requirements databases.
//!
//! Findings are returned as data. Schema problems are errors; cycles are
//! warnings; reciprocity problems are reported separately because they can
//! be repaired automatically with [`fix_reciprocity`].

use std::collections::HashSet;

use serde::Serialize;
use tracing::instrument;

use crate::{Database, domain::requirement::is_local_reference};

mod cross_repo;
mod reciprocity;

pub use cross_repo::{CrossRepoReport, validate_cross_repo_deps, validate_cross_repo_deps_with};
pub use reciprocity::{ReciprocityViolation, check_reciprocity, fix_reciprocity};

/// The number of cycles listed individually by [`validate_cycles`].
const CYCLES_SHOWN: usize = 5;

/// Combined results of [`validate_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    /// Schema errors.
    pub errors: Vec<String>,
    /// Non-blocking problems, such as circular dependencies.
    pub warnings: Vec<String>,
    /// Reciprocity violations, formatted for display.
    pub reciprocity: Vec<String>,
}

impl ValidationSummary {
    /// Whether nothing at all was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty() && self.reciprocity.is_empty()
    }
}

/// Check each requirement's fields and local references.
///
/// Reports duplicate identifiers, blank required fields (`req_id`,
/// `category`, `requirement_text`), unrecognised status or priority, phases
/// below 1, and local `dependencies`/`blocks` entries that name no
/// requirement. Cross-repo references are checked by
/// [`validate_cross_repo_deps`] instead.
#[must_use]
#[instrument(level = "debug", skip(db))]
pub fn validate_schema(db: &Database) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::with_capacity(db.len());

    for (row, req) in (1..).zip(db) {
        let id = req.req_id();
        let prefix = format!("Row {row} ({id})");

        if !seen.insert(id) {
            errors.push(format!("{prefix}: Duplicate requirement ID"));
        }

        if id.trim().is_empty() {
            errors.push(format!("Row {row}: Missing required field 'req_id'"));
        }
        if req.category.trim().is_empty() {
            errors.push(format!("{prefix}: Missing required field 'category'"));
        }
        if req.requirement_text.trim().is_empty() {
            errors.push(format!(
                "{prefix}: Missing required field 'requirement_text'"
            ));
        }

        if !req.status.is_known() {
            errors.push(format!("{prefix}: Invalid status '{}'", req.status));
        }
        if !req.priority.is_known() {
            errors.push(format!("{prefix}: Invalid priority '{}'", req.priority));
        }

        if let Some(phase) = req.phase.filter(|&phase| phase < 1) {
            errors.push(format!(
                "{prefix}: Invalid phase '{phase}' (must be >= 1)"
            ));
        }
    }

    for req in db {
        let id = req.req_id();
        for dep in req.dependencies().iter().filter(|dep| is_local_reference(dep)) {
            if !seen.contains(dep.as_str()) {
                errors.push(format!(
                    "{id}: Dependency '{dep}' references non-existent requirement"
                ));
            }
        }
        for block in req.blocks().iter().filter(|block| is_local_reference(block)) {
            if !seen.contains(block.as_str()) {
                errors.push(format!(
                    "{id}: Blocks '{block}' references non-existent requirement"
                ));
            }
        }
    }

    errors
}

/// Describe the circular dependencies in the database.
///
/// Returns nothing for an acyclic database. Otherwise the first line counts
/// the cycles, and at most five cycles follow, one per line.
#[must_use]
pub fn validate_cycles(db: &Database) -> Vec<String> {
    let cycles = db.find_cycles();
    if cycles.is_empty() {
        return Vec::new();
    }

    let mut warnings = vec![format!(
        "Found {} circular dependency group(s)",
        cycles.len()
    )];

    for (i, cycle) in (1..).zip(cycles.iter().take(CYCLES_SHOWN)) {
        let path = if cycle.len() <= CYCLES_SHOWN {
            cycle.join(" -> ")
        } else {
            let members = cycle.iter().collect::<HashSet<_>>().len();
            format!("{} ... ({members} total)", cycle[..3].join(" -> "))
        };
        warnings.push(format!("  Cycle {i}: {path}"));
    }

    if cycles.len() > CYCLES_SHOWN {
        warnings.push(format!(
            "  ... and {} more cycles",
            cycles.len() - CYCLES_SHOWN
        ));
    }

    warnings
}

/// Run schema, cycle and reciprocity validation.
#[must_use]
pub fn validate_all(db: &Database) -> ValidationSummary {
    ValidationSummary {
        errors: validate_schema(db),
        warnings: validate_cycles(db),
        reciprocity: check_reciprocity(db)
            .iter()
            .map(ToString::to_string)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::{
        Requirement,
        domain::{Recognised, Status},
    };

    fn valid(id: &str) -> Requirement {
        let mut req = Requirement::new(id);
        req.category = "CORE".to_string();
        req.requirement_text = "Do the thing".to_string();
        req.phase = Some(1);
        req
    }

    fn with_deps(id: &str, deps: &[&str]) -> Requirement {
        let mut req = valid(id);
        for dep in deps {
            req.add_dependency(*dep);
        }
        req
    }

    #[test]
    fn valid_database_has_no_schema_errors() {
        let db = Database::from_iter([valid("REQ-A"), with_deps("REQ-B", &["REQ-A"])]);
        assert!(validate_schema(&db).is_empty());
    }

    #[test]
    fn duplicate_ids_are_reported() {
        let db = Database::from_iter([valid("REQ-A"), valid("REQ-A")]);
        assert_eq!(
            validate_schema(&db),
            ["Row 2 (REQ-A): Duplicate requirement ID"]
        );
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let db = Database::from_iter([Requirement::new("REQ-A"), Requirement::new("")]);
        let errors = validate_schema(&db);
        assert!(errors.contains(&"Row 1 (REQ-A): Missing required field 'category'".to_string()));
        assert!(
            errors.contains(
                &"Row 1 (REQ-A): Missing required field 'requirement_text'".to_string()
            )
        );
        assert!(errors.contains(&"Row 2: Missing required field 'req_id'".to_string()));
    }

    #[test_case(|r: &mut Requirement| r.status = Recognised::Unknown("DONE".into()), "Invalid status 'DONE'"; "status")]
    #[test_case(|r: &mut Requirement| r.priority = Recognised::Unknown("URGENT".into()), "Invalid priority 'URGENT'"; "priority")]
    #[test_case(|r: &mut Requirement| r.phase = Some(0), "Invalid phase '0' (must be >= 1)"; "phase")]
    fn invalid_values_are_reported(mutate: fn(&mut Requirement), expected: &str) {
        let mut req = valid("REQ-A");
        mutate(&mut req);
        let db = Database::from_iter([req]);
        assert_eq!(validate_schema(&db), [format!("Row 1 (REQ-A): {expected}")]);
    }

    #[test]
    fn dangling_local_references_are_reported() {
        let mut req = with_deps("REQ-A", &["REQ-GONE", "sync:REQ-REMOTE"]);
        req.add_block("REQ-ALSO-GONE");
        let db = Database::from_iter([req]);

        assert_eq!(
            validate_schema(&db),
            [
                "REQ-A: Dependency 'REQ-GONE' references non-existent requirement",
                "REQ-A: Blocks 'REQ-ALSO-GONE' references non-existent requirement",
            ]
        );
    }

    #[test]
    fn acyclic_database_has_no_cycle_warnings() {
        let db = Database::from_iter([valid("REQ-A"), with_deps("REQ-B", &["REQ-A"])]);
        assert!(validate_cycles(&db).is_empty());
    }

    #[test]
    fn cycles_are_described() {
        let db = Database::from_iter([
            with_deps("REQ-A", &["REQ-B"]),
            with_deps("REQ-B", &["REQ-A"]),
        ]);
        assert_eq!(
            validate_cycles(&db),
            [
                "Found 1 circular dependency group(s)",
                "  Cycle 1: REQ-A -> REQ-B"
            ]
        );
    }

    #[test]
    fn long_cycles_are_abbreviated() {
        let ids: Vec<String> = (0..7).map(|i| format!("REQ-{i}")).collect();
        let db = Database::from_iter((0..7).map(|i| {
            let next = ids[(i + 1) % 7].as_str();
            with_deps(&ids[i], &[next])
        }));

        let warnings = validate_cycles(&db);

        assert_eq!(
            warnings[1],
            "  Cycle 1: REQ-0 -> REQ-1 -> REQ-2 ... (7 total)"
        );
    }

    #[test]
    fn excess_cycles_are_summarised() {
        let db = Database::from_iter((0..7).map(|i| {
            let id = format!("REQ-{i}");
            with_deps(&id, &[id.as_str()])
        }));

        let warnings = validate_cycles(&db);

        assert_eq!(warnings[0], "Found 7 circular dependency group(s)");
        assert_eq!(warnings.len(), 1 + 5 + 1);
        assert_eq!(warnings[6], "  ... and 2 more cycles");
    }

    #[test]
    fn validate_all_collects_everything() {
        let mut a = with_deps("REQ-A", &["REQ-B"]);
        a.status = Status::Complete.into();
        let b = with_deps("REQ-B", &["REQ-A"]);
        let db = Database::from_iter([a, b]);

        let summary = validate_all(&db);

        assert!(summary.errors.is_empty());
        assert_eq!(summary.warnings.len(), 2);
        assert_eq!(summary.reciprocity.len(), 2);
        assert!(summary.reciprocity[0].contains("doesn't block"));
        assert!(!summary.is_clean());
    }
}
