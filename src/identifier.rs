//! Show identifier parsing and validation
//!
//! A show is addressed by the positive integer id the remote catalog assigns
//! to it. The numeric ordering of ids is the canonical ordering of a backup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key identifying one show in the remote catalog.
///
/// # Examples
///
/// ```
/// use myshows_backup::identifier::ShowIdentifier;
///
/// let id = ShowIdentifier::parse("42").unwrap();
/// assert_eq!(id.get(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowIdentifier(u64);

impl ShowIdentifier {
    /// Create an identifier from a raw id.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is zero; the catalog never assigns it.
    pub fn new(raw: u64) -> Result<Self, IdentifierError> {
        if raw == 0 {
            return Err(IdentifierError::Zero);
        }
        Ok(Self(raw))
    }

    /// Parse an identifier from its decimal representation.
    ///
    /// Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let raw = trimmed
            .parse::<u64>()
            .map_err(|_| IdentifierError::NotNumeric(trimmed.to_string()))?;

        Self::new(raw)
    }

    /// Extract an identifier from a JSON value that may be a number or a numeric string.
    ///
    /// Both forms appear in remote responses.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, IdentifierError> {
        match value {
            serde_json::Value::Number(n) => {
                let raw = n
                    .as_u64()
                    .ok_or_else(|| IdentifierError::NotNumeric(n.to_string()))?;
                Self::new(raw)
            }
            serde_json::Value::String(s) => Self::parse(s),
            other => Err(IdentifierError::NotNumeric(other.to_string())),
        }
    }

    /// The raw numeric id.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ShowIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ShowIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<u64> for ShowIdentifier {
    type Error = IdentifierError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

/// Identifier validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// Input was blank
    #[error("show identifier cannot be empty")]
    Empty,

    /// Input was not a non-negative integer
    #[error("show identifier must be a positive integer, got '{0}'")]
    NotNumeric(String),

    /// Zero is not a valid catalog id
    #[error("show identifier must be greater than zero")]
    Zero,
}
