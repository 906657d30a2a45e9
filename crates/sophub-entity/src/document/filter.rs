//! Version listing filter.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::DocumentVersion;
use super::state::VersionState;

/// Selection criteria for listing versions. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionFilter {
    /// Only versions in this state.
    pub state: Option<VersionState>,
    /// Only versions attached to this machine.
    pub machine_name: Option<String>,
    /// Only versions owned by this department.
    pub department: Option<String>,
    /// Only versions of this lineage.
    pub lineage_id: Option<Uuid>,
}

impl VersionFilter {
    /// Current versions only; the default listing.
    pub fn active() -> Self {
        Self {
            state: Some(VersionState::Active),
            ..Self::default()
        }
    }

    /// Every version of one lineage.
    pub fn lineage(lineage_id: Uuid) -> Self {
        Self {
            lineage_id: Some(lineage_id),
            ..Self::default()
        }
    }

    /// Evaluate the filter against a record.
    pub fn matches(&self, version: &DocumentVersion) -> bool {
        self.state.is_none_or(|s| s == version.state)
            && self
                .machine_name
                .as_deref()
                .is_none_or(|m| m == version.machine_name)
            && self
                .department
                .as_deref()
                .is_none_or(|d| d == version.department)
            && self.lineage_id.is_none_or(|l| l == version.lineage_id)
    }
}
