//! Domain models for requirements traceability.
//!
//! This module contains the core domain types: requirements and their
//! references, the in-memory database and its dependency graph, and
//! configuration.

/// Requirement domain model.
pub mod requirement;
pub use requirement::Requirement;

mod config;
pub use config::{Config, ConfigError, ConflictResolution, RemoteConfig, SyncConfig};

mod database;
pub use database::{Database, NotFoundError};

/// Requirement references and dependency-set strings.
pub mod reference;
pub use reference::{
    ParseError, RequirementRef, format_dependencies, parse_dependencies, parse_requirement_ref,
};

/// Status and priority values.
pub mod status;
pub use status::{Priority, Recognised, Status, UnknownValue};
