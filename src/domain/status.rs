//! Enumerated status and priority values.

use std::{fmt, str::FromStr};

/// Implementation status of a requirement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    /// Fully implemented and verified.
    Complete,
    /// Partially implemented.
    Partial,
    /// Work is under way.
    InProgress,
    /// Not implemented.
    #[default]
    Missing,
    /// Not scheduled yet.
    NotStarted,
}

impl Status {
    /// All recognised statuses, in reporting order.
    pub const ALL: [Self; 5] = [
        Self::Complete,
        Self::Partial,
        Self::InProgress,
        Self::Missing,
        Self::NotStarted,
    ];

    /// The canonical text form, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "COMPLETE",
            Self::Partial => "PARTIAL",
            Self::InProgress => "IN_PROGRESS",
            Self::Missing => "MISSING",
            Self::NotStarted => "NOT_STARTED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Status {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownValue(s.to_string()))
    }
}

/// Priority of a requirement.
///
/// Variants are declared from most to least urgent, so the derived ordering
/// sorts critical work first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Must be addressed before anything else.
    Critical,
    /// High priority.
    High,
    /// Normal priority.
    #[default]
    Medium,
    /// Low priority.
    Low,
}

impl Priority {
    /// All recognised priorities, most urgent first.
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// The canonical text form, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "P0" {
            return Ok(Self::Critical);
        }
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| UnknownValue(s.to_string()))
    }
}

/// Error returned when text does not name a recognised value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unrecognised value '{0}'")]
pub struct UnknownValue(pub String);

/// A value read from the database that may or may not be recognised.
///
/// Unrecognised text is kept verbatim so that it survives a load/save cycle
/// and can be reported by schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Recognised<T> {
    /// A recognised value.
    Known(T),
    /// Text that did not parse as a known value.
    Unknown(String),
}

impl<T> Recognised<T> {
    /// The recognised value, if any.
    #[must_use]
    pub const fn known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown(_) => None,
        }
    }

    /// Whether the value was recognised.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl<T: FromStr + Default> Recognised<T> {
    /// Parse database text, falling back to the default for blank input.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::Known(T::default());
        }
        text.parse()
            .map_or_else(|_| Self::Unknown(text.to_string()), Self::Known)
    }
}

impl<T: Default> Default for Recognised<T> {
    fn default() -> Self {
        Self::Known(T::default())
    }
}

impl<T> From<T> for Recognised<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

impl<T: fmt::Display> fmt::Display for Recognised<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(value) => value.fmt(f),
            Self::Unknown(text) => f.pad(text),
        }
    }
}
