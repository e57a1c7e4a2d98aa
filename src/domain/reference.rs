//! Requirement references and dependency-set strings.
//!
//! A reference names a requirement either in the local database or in a
//! remote one:
//!
//! - Local: `REQ-SW-001`
//! - Aliased: `sync:REQ-SYNC-001`
//! - Full repository: `rtmx-ai/rtmx-sync:REQ-SYNC-001`

use std::{collections::BTreeSet, fmt, str::FromStr, sync::OnceLock};

use regex::Regex;

/// A parsed reference to a requirement, either local or cross-repo.
///
/// At most one of [`remote_alias`](Self::remote_alias) and
/// [`full_repo`](Self::full_repo) is set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequirementRef {
    req_id: String,
    remote: Option<Remote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Remote {
    Alias(String),
    Repo(String),
}

impl RequirementRef {
    /// A reference to a requirement in the local database.
    #[must_use]
    pub fn local(req_id: impl Into<String>) -> Self {
        Self {
            req_id: req_id.into(),
            remote: None,
        }
    }

    /// A reference through a configured remote alias, e.g. `sync:REQ-001`.
    #[must_use]
    pub fn aliased(alias: impl Into<String>, req_id: impl Into<String>) -> Self {
        Self {
            req_id: req_id.into(),
            remote: Some(Remote::Alias(alias.into())),
        }
    }

    /// A reference through a fully-qualified repository, e.g.
    /// `org/repo:REQ-001`.
    #[must_use]
    pub fn in_repo(repo: impl Into<String>, req_id: impl Into<String>) -> Self {
        Self {
            req_id: req_id.into(),
            remote: Some(Remote::Repo(repo.into())),
        }
    }

    /// The requirement identifier, without any remote qualifier.
    #[must_use]
    pub fn req_id(&self) -> &str {
        &self.req_id
    }

    /// The remote alias, if the reference uses the `alias:id` form.
    #[must_use]
    pub fn remote_alias(&self) -> Option<&str> {
        match &self.remote {
            Some(Remote::Alias(alias)) => Some(alias),
            _ => None,
        }
    }

    /// The repository identity, if the reference uses the `org/repo:id` form.
    #[must_use]
    pub fn full_repo(&self) -> Option<&str> {
        match &self.remote {
            Some(Remote::Repo(repo)) => Some(repo),
            _ => None,
        }
    }

    /// Whether this reference points into the local database.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.remote.is_none()
    }

    /// Whether this reference points into another repository.
    #[must_use]
    pub const fn is_cross_repo(&self) -> bool {
        !self.is_local()
    }
}

impl fmt::Display for RequirementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.remote {
            None => write!(f, "{}", self.req_id),
            Some(Remote::Alias(qualifier) | Remote::Repo(qualifier)) => {
                write!(f, "{qualifier}:{}", self.req_id)
            }
        }
    }
}

impl FromStr for RequirementRef {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_requirement_ref(s)
    }
}

/// Errors that can occur when parsing a requirement reference.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    /// The reference was empty or contained only whitespace.
    #[error("Requirement reference cannot be empty")]
    Empty,

    /// The reference contained more than one colon.
    #[error("Invalid requirement reference format: {0}")]
    Syntax(String),
}

fn full_repo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_-]+/[A-Za-z0-9._-]+):(.+)$")
            .expect("full repository regex must compile")
    })
}

fn alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*):(.+)$").expect("alias regex must compile")
    })
}

/// Parse a requirement reference string.
///
/// Surrounding whitespace is ignored. A reference with a single colon that
/// matches neither the repository nor the alias form is kept as a local id
/// containing a colon.
///
/// # Errors
///
/// Returns [`ParseError::Empty`] for blank input and [`ParseError::Syntax`]
/// if the reference contains two or more colons.
pub fn parse_requirement_ref(s: &str) -> Result<RequirementRef, ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseError::Empty);
    }

    match s.matches(':').count() {
        0 => Ok(RequirementRef::local(s)),
        1 => {
            if let Some(caps) = full_repo_re().captures(s) {
                return Ok(RequirementRef::in_repo(&caps[1], &caps[2]));
            }
            if let Some(caps) = alias_re().captures(s) {
                return Ok(RequirementRef::aliased(&caps[1], &caps[2]));
            }
            Ok(RequirementRef::local(s))
        }
        _ => Err(ParseError::Syntax(s.to_string())),
    }
}

/// Parse a dependency-set string into its reference tokens.
///
/// Accepts both pipe-separated (`REQ-A|REQ-B`) and whitespace-separated
/// (`REQ-A REQ-B`) forms. Tokens are kept as raw reference strings.
#[must_use]
pub fn parse_dependencies(s: &str) -> BTreeSet<String> {
    let s = s.trim();
    if s.is_empty() {
        return BTreeSet::new();
    }

    let tokens: Box<dyn Iterator<Item = &str>> = if s.contains('|') {
        Box::new(s.split('|'))
    } else {
        Box::new(s.split_whitespace())
    };

    tokens
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// Format a dependency set as a sorted, pipe-separated string.
#[must_use]
pub fn format_dependencies<I, S>(deps: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tokens: Vec<S> = deps.into_iter().collect();
    tokens.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
    tokens
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("|")
}
