//! Document version state enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The state a document version occupies.
///
/// ```text
/// (none) -> Pending -> Active -> Archived -> Active
///                         \-> Deleted
/// ```
///
/// `Deleted` is terminal and logical only: a deleted version's record is
/// removed from the store, so the value is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "version_state", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum VersionState {
    /// Write credential issued; bytes not yet verified.
    Pending,
    /// The current version of its lineage.
    Active,
    /// Superseded by a replace; kept until restored.
    Archived,
    /// Removed by a restore.
    Deleted,
}

impl VersionState {
    /// Return the state as a lowercase string for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    /// Whether the state machine allows `self -> next`.
    pub fn can_transition_to(&self, next: VersionState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::Active, Self::Archived)
                | (Self::Active, Self::Deleted)
                | (Self::Archived, Self::Active)
        )
    }

    /// Whether no transition leaves this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl fmt::Display for VersionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VersionState {
    type Err = sophub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            "deleted" => Ok(Self::Deleted),
            _ => Err(sophub_core::AppError::validation(format!(
                "Invalid version state: '{s}'. Expected one of: pending, active, archived"
            ))),
        }
    }
}
