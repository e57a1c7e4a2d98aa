//! The CSV database format.
//!
//! One row per requirement. Headers are snake case (`req_id`, `category`,
//! ...) or the legacy PascalCase form (`Req_ID`, `Category`, ...); the latter
//! is normalized on load and always written back as snake case. Columns this
//! crate does not interpret are passed through verbatim.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, instrument};

use crate::{
    Database, Requirement,
    domain::{Recognised, format_dependencies, parse_dependencies},
};

/// The interpreted columns, in canonical order.
pub const CORE_COLUMNS: [&str; 20] = [
    "req_id",
    "category",
    "subcategory",
    "requirement_text",
    "target_value",
    "test_module",
    "test_function",
    "validation_method",
    "status",
    "priority",
    "phase",
    "notes",
    "effort_weeks",
    "dependencies",
    "blocks",
    "assignee",
    "sprint",
    "started_date",
    "completed_date",
    "requirement_file",
];

/// Boolean validation taxonomy columns.
pub const VALIDATION_FLAGS: [&str; 17] = [
    "unit_test",
    "integration_test",
    "parametric_test",
    "monte_carlo_test",
    "stress_test",
    "env_simulation",
    "env_hil",
    "env_anechoic",
    "env_static_field",
    "env_dynamic_field",
    "scope_unit",
    "scope_integration",
    "scope_system",
    "technique_nominal",
    "technique_parametric",
    "technique_monte_carlo",
    "technique_stress",
];

const PASCAL_CASE_COLUMNS: [(&str, &str); 20] = [
    ("Req_ID", "req_id"),
    ("Category", "category"),
    ("Subcategory", "subcategory"),
    ("Requirement_Text", "requirement_text"),
    ("Target_Value", "target_value"),
    ("Test_Module", "test_module"),
    ("Test_Function", "test_function"),
    ("Validation_Method", "validation_method"),
    ("Status", "status"),
    ("Priority", "priority"),
    ("Phase", "phase"),
    ("Notes", "notes"),
    ("Effort_Weeks", "effort_weeks"),
    ("Dependencies", "dependencies"),
    ("Blocks", "blocks"),
    ("Assignee", "assignee"),
    ("Sprint", "sprint"),
    ("Started_Date", "started_date"),
    ("Completed_Date", "completed_date"),
    ("Requirement_File", "requirement_file"),
];

/// Header naming convention of a database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFormat {
    /// `req_id`, `requirement_text`, ...
    SnakeCase,
    /// `Req_ID`, `Requirement_Text`, ...
    PascalCase,
}

/// Errors that can occur when loading a database file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The database file does not exist.
    #[error("RTM database not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An I/O error occurred.
    #[error("failed to load RTM database: {0}")]
    Io(#[from] io::Error),

    /// The file is not well-formed CSV.
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] ::csv::Error),

    /// The file has no header row.
    #[error("CSV file has no header")]
    NoHeader,

    /// A phase cell is not an integer.
    #[error("row {row}: invalid phase '{value}'")]
    InvalidPhase {
        /// One-based data row number.
        row: usize,
        /// The offending cell.
        value: String,
    },

    /// The file has a header but no rows.
    #[error("RTM database is empty")]
    Empty,
}

/// Errors that can occur when saving a database file.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// Refusing to write a database with no requirements.
    #[error("cannot save empty RTM database")]
    Empty,

    /// An I/O error occurred.
    #[error("failed to save RTM database: {0}")]
    Io(#[from] io::Error),

    /// The CSV writer failed.
    #[error("failed to write CSV: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Detect the header naming convention.
#[must_use]
pub fn detect_column_format<S: AsRef<str>>(names: &[S]) -> ColumnFormat {
    let names = || names.iter().map(AsRef::as_ref);

    if names().any(|name| name == "req_id") {
        ColumnFormat::SnakeCase
    } else if names().any(|name| name == "Req_ID") {
        ColumnFormat::PascalCase
    } else if names().any(|name| name.contains('_') && is_lowercase(name)) {
        ColumnFormat::SnakeCase
    } else {
        ColumnFormat::PascalCase
    }
}

fn is_lowercase(name: &str) -> bool {
    name.chars().any(char::is_lowercase) && !name.chars().any(char::is_uppercase)
}

/// Normalize a PascalCase column name to snake case.
///
/// Known columns use a fixed mapping; anything else is lower-cased.
#[must_use]
pub fn normalize_column_name(name: &str) -> String {
    PASCAL_CASE_COLUMNS
        .iter()
        .find(|(pascal, _)| *pascal == name)
        .map_or_else(|| name.to_lowercase(), |(_, snake)| (*snake).to_string())
}

/// Load a database from a CSV file.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed, if a phase is not an
/// integer, or if the file contains no requirements.
#[instrument(level = "debug")]
pub fn load(path: &Path) -> Result<Database, LoadError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io(e),
    })?;

    let db = read(BufReader::new(file))?;
    debug!(requirements = db.len(), "loaded database");
    Ok(db)
}

/// Save a database to a CSV file, creating parent directories.
///
/// # Errors
///
/// Returns an error if the database is empty or the file cannot be written.
#[instrument(level = "debug", skip(db), fields(requirements = db.len()))]
pub fn save(db: &Database, path: &Path) -> Result<(), SaveError> {
    if db.is_empty() {
        return Err(SaveError::Empty);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write(db, BufWriter::new(file))
}

pub(crate) fn read<R: Read>(reader: R) -> Result<Database, LoadError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(LoadError::NoHeader);
    }

    let names: Vec<&str> = headers.iter().collect();
    let columns: Vec<String> = match detect_column_format(&names) {
        ColumnFormat::SnakeCase => names.iter().map(|name| (*name).to_string()).collect(),
        ColumnFormat::PascalCase => names.iter().map(|name| normalize_column_name(name)).collect(),
    };

    let mut db = Database::with_columns(columns.clone());
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let mut requirement = Requirement::default();
        for (column, value) in columns.iter().zip(record.iter()) {
            set_field(&mut requirement, column, value)
                .map_err(|value| LoadError::InvalidPhase { row: i + 1, value })?;
        }
        db.push(requirement);
    }

    if db.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(db)
}

pub(crate) fn write<W: Write>(db: &Database, writer: W) -> Result<(), SaveError> {
    if db.is_empty() {
        return Err(SaveError::Empty);
    }

    let columns = output_columns(db);
    let mut writer = ::csv::Writer::from_writer(writer);
    writer.write_record(&columns)?;
    for requirement in db {
        writer.write_record(columns.iter().map(|column| field_value(requirement, column)))?;
    }
    writer.flush()?;
    Ok(())
}

/// Loaded columns first, then any core column, flag or extra not yet seen.
fn output_columns(db: &Database) -> Vec<String> {
    let mut columns = db.columns().to_vec();
    let mut add = |column: &str| {
        if !columns.iter().any(|c| c == column) {
            columns.push(column.to_string());
        }
    };

    for column in CORE_COLUMNS {
        add(column);
    }
    for requirement in db {
        for flag in requirement.flags.keys() {
            add(flag);
        }
        for column in requirement.extra.keys() {
            add(column);
        }
    }
    columns
}

/// Assigns one cell. Returns the cell text if it is an invalid phase.
fn set_field(requirement: &mut Requirement, column: &str, value: &str) -> Result<(), String> {
    match column {
        "req_id" => value.trim().clone_into(&mut requirement.req_id),
        "status" => requirement.status = Recognised::parse(value),
        "priority" => requirement.priority = Recognised::parse(value),
        "phase" => requirement.phase = parse_phase(value)?,
        "dependencies" => requirement.dependencies = parse_dependencies(value),
        "blocks" => requirement.blocks = parse_dependencies(value),
        flag if VALIDATION_FLAGS.contains(&flag) => {
            requirement.set_flag(flag, value.trim().eq_ignore_ascii_case("true"));
        }
        other => match text_field_mut(requirement, other) {
            Some(field) => value.clone_into(field),
            None => {
                requirement
                    .extra
                    .insert(other.to_string(), value.to_string());
            }
        },
    }
    Ok(())
}

fn parse_phase(value: &str) -> Result<Option<i64>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| value.to_string())
}

fn field_value(requirement: &Requirement, column: &str) -> String {
    match column {
        "req_id" => requirement.req_id.clone(),
        "status" => requirement.status.to_string(),
        "priority" => requirement.priority.to_string(),
        "phase" => requirement
            .phase
            .map(|phase| phase.to_string())
            .unwrap_or_default(),
        "dependencies" => format_dependencies(&requirement.dependencies),
        "blocks" => format_dependencies(&requirement.blocks),
        flag if VALIDATION_FLAGS.contains(&flag) => {
            let text = if requirement.flag(flag) { "True" } else { "False" };
            text.to_string()
        }
        other => text_field(requirement, other)
            .or_else(|| requirement.extra(other))
            .unwrap_or_default()
            .to_string(),
    }
}

fn text_field<'a>(requirement: &'a Requirement, column: &str) -> Option<&'a str> {
    let field = match column {
        "category" => &requirement.category,
        "subcategory" => &requirement.subcategory,
        "requirement_text" => &requirement.requirement_text,
        "target_value" => &requirement.target_value,
        "test_module" => &requirement.test_module,
        "test_function" => &requirement.test_function,
        "validation_method" => &requirement.validation_method,
        "notes" => &requirement.notes,
        "effort_weeks" => &requirement.effort_weeks,
        "assignee" => &requirement.assignee,
        "sprint" => &requirement.sprint,
        "started_date" => &requirement.started_date,
        "completed_date" => &requirement.completed_date,
        "requirement_file" => &requirement.requirement_file,
        _ => return None,
    };
    Some(field)
}

fn text_field_mut<'a>(requirement: &'a mut Requirement, column: &str) -> Option<&'a mut String> {
    let field = match column {
        "category" => &mut requirement.category,
        "subcategory" => &mut requirement.subcategory,
        "requirement_text" => &mut requirement.requirement_text,
        "target_value" => &mut requirement.target_value,
        "test_module" => &mut requirement.test_module,
        "test_function" => &mut requirement.test_function,
        "validation_method" => &mut requirement.validation_method,
        "notes" => &mut requirement.notes,
        "effort_weeks" => &mut requirement.effort_weeks,
        "assignee" => &mut requirement.assignee,
        "sprint" => &mut requirement.sprint,
        "started_date" => &mut requirement.started_date,
        "completed_date" => &mut requirement.completed_date,
        "requirement_file" => &mut requirement.requirement_file,
        _ => return None,
    };
    Some(field)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tempfile::TempDir;
    use test_case::test_case;

    use super::*;
    use crate::domain::{Priority, Status};

    const SNAKE: &str = "\
req_id,category,requirement_text,status,priority,phase,dependencies,blocks,unit_test,owner
REQ-A,CORE,First,COMPLETE,HIGH,1,,REQ-B,True,alice
REQ-B,CORE,Second,IN_PROGRESS,P0,2,REQ-A,,false,bob
";

    const PASCAL: &str = "\
Req_ID,Category,Requirement_Text,Status,Priority,Phase,Dependencies,Blocks,Unit_Test,Owner
REQ-A,CORE,First,COMPLETE,HIGH,1,,REQ-B,True,alice
REQ-B,CORE,Second,IN_PROGRESS,P0,2,REQ-A,,false,bob
";

    fn to_string(db: &Database) -> String {
        let mut out = Vec::new();
        write(db, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn reads_typed_fields() {
        let db = read(Cursor::new(SNAKE)).unwrap();

        assert_eq!(db.len(), 2);
        let a = db.get("REQ-A").unwrap();
        assert_eq!(a.category, "CORE");
        assert_eq!(a.status, Recognised::Known(Status::Complete));
        assert_eq!(a.priority, Recognised::Known(Priority::High));
        assert_eq!(a.phase, Some(1));
        assert!(a.blocks().contains("REQ-B"));
        assert!(a.flag("unit_test"));
        assert_eq!(a.extra("owner"), Some("alice"));

        let b = db.get("REQ-B").unwrap();
        assert_eq!(b.priority, Recognised::Known(Priority::Critical));
        assert!(!b.flag("unit_test"));
    }

    #[test]
    fn pascal_case_headers_load_like_snake_case() {
        let snake = read(Cursor::new(SNAKE)).unwrap();
        let pascal = read(Cursor::new(PASCAL)).unwrap();

        assert_eq!(pascal.columns(), snake.columns());
        assert!(snake.iter().eq(pascal.iter()));
    }

    #[test_case(&["req_id", "Category"], ColumnFormat::SnakeCase; "snake id wins")]
    #[test_case(&["Req_ID", "category"], ColumnFormat::PascalCase; "pascal id")]
    #[test_case(&["id", "test_module"], ColumnFormat::SnakeCase; "lowercase underscore")]
    #[test_case(&["Id", "Name"], ColumnFormat::PascalCase; "fallback")]
    fn detects_column_format(names: &[&str], expected: ColumnFormat) {
        assert_eq!(detect_column_format(names), expected);
    }

    #[test_case("Req_ID", "req_id")]
    #[test_case("Requirement_File", "requirement_file")]
    #[test_case("Unit_Test", "unit_test")]
    #[test_case("Owner", "owner")]
    fn normalizes_column_names(name: &str, expected: &str) {
        assert_eq!(normalize_column_name(name), expected);
    }

    #[test]
    fn round_trip_preserves_rows_columns_and_extras() {
        let db = read(Cursor::new(SNAKE)).unwrap();
        let written = to_string(&db);

        let header = written.lines().next().unwrap();
        assert!(header.starts_with(
            "req_id,category,requirement_text,status,priority,phase,dependencies,blocks,unit_test,owner,"
        ));

        let reloaded = read(Cursor::new(written.as_bytes())).unwrap();
        assert!(db.iter().eq(reloaded.iter()));
        assert_eq!(to_string(&reloaded), written);
    }

    #[test]
    fn booleans_are_written_capitalised() {
        let db = read(Cursor::new(SNAKE)).unwrap();
        let written = to_string(&db);
        let mut rows = written.lines().skip(1);
        assert!(rows.next().unwrap().contains(",True,alice"));
        assert!(rows.next().unwrap().contains(",False,bob"));
    }

    #[test]
    fn space_separated_dependencies_are_written_with_pipes() {
        let csv = "req_id,dependencies\nREQ-A,REQ-C REQ-B\n";
        let db = read(Cursor::new(csv)).unwrap();
        assert!(to_string(&db).contains("REQ-A,REQ-B|REQ-C"));
    }

    #[test]
    fn unknown_status_survives_round_trip() {
        let csv = "req_id,status\nREQ-A,DONE\n";
        let db = read(Cursor::new(csv)).unwrap();
        assert_eq!(
            db.get("REQ-A").unwrap().status,
            Recognised::Unknown("DONE".to_string())
        );
        assert!(to_string(&db).contains("REQ-A,DONE,"));
    }

    #[test]
    fn invalid_phase_is_rejected() {
        let csv = "req_id,phase\nREQ-A,1\nREQ-B,two\n";
        match read(Cursor::new(csv)) {
            Err(LoadError::InvalidPhase { row, value }) => {
                assert_eq!(row, 2);
                assert_eq!(value, "two");
            }
            other => panic!("expected invalid phase, got {other:?}"),
        }
    }

    #[test]
    fn header_without_rows_is_empty() {
        assert!(matches!(
            read(Cursor::new("req_id,category\n")),
            Err(LoadError::Empty)
        ));
        assert!(matches!(read(Cursor::new("")), Err(LoadError::NoHeader)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.csv");
        assert!(matches!(load(&path), Err(LoadError::NotFound(p)) if p == path));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".rtmx").join("database.csv");

        let db = read(Cursor::new(SNAKE)).unwrap();
        save(&db, &path).unwrap();

        let reloaded = load(&path).unwrap();
        assert!(db.iter().eq(reloaded.iter()));
    }

    #[test]
    fn empty_database_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.csv");
        assert!(matches!(
            save(&Database::new(), &path),
            Err(SaveError::Empty)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn in_memory_database_uses_canonical_columns() {
        let db = Database::from_iter([Requirement::new("REQ-A")]);
        let written = to_string(&db);
        assert_eq!(written.lines().next().unwrap(), CORE_COLUMNS.join(","));
    }
}
