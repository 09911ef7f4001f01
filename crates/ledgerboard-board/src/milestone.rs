//! Milestone: a paid unit of work with a review lifecycle.
//!
//! ```text
//! Draft → Open → Assigned → InProgress → Submitted → Approved → Completed
//!                               ↑            │
//!                               └─ Rejected ←┘ ──→ Completed
//!
//! Cancelled is reachable from every state except Completed and Cancelled.
//! ```

use chrono::{DateTime, Utc};
use ledgerboard_store::{Entity, IndexSpec};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

pub const PROJECT_INDEX: &str = "project_id";
pub const STATUS_INDEX: &str = "status";
pub const ASSIGNEE_INDEX: &str = "assignee_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Draft,
    Open,
    Assigned,
    InProgress,
    Submitted,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Draft => "draft",
            MilestoneStatus::Open => "open",
            MilestoneStatus::Assigned => "assigned",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Submitted => "submitted",
            MilestoneStatus::Approved => "approved",
            MilestoneStatus::Rejected => "rejected",
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MilestoneStatus::Completed | MilestoneStatus::Cancelled)
    }
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MilestoneStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(MilestoneStatus::Draft),
            "open" => Ok(MilestoneStatus::Open),
            "assigned" => Ok(MilestoneStatus::Assigned),
            "in_progress" => Ok(MilestoneStatus::InProgress),
            "submitted" => Ok(MilestoneStatus::Submitted),
            "approved" => Ok(MilestoneStatus::Approved),
            "rejected" => Ok(MilestoneStatus::Rejected),
            "completed" => Ok(MilestoneStatus::Completed),
            "cancelled" => Ok(MilestoneStatus::Cancelled),
            other => Err(format!("unknown milestone status: {other}")),
        }
    }
}

/// A requested lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MilestoneCommand {
    Open,
    Assign { assignee_id: String },
    Start,
    Submit,
    Approve,
    Reject { reason: String },
    Complete,
    Cancel,
}

impl MilestoneCommand {
    pub fn name(&self) -> &'static str {
        match self {
            MilestoneCommand::Open => "open",
            MilestoneCommand::Assign { .. } => "assign",
            MilestoneCommand::Start => "start",
            MilestoneCommand::Submit => "submit",
            MilestoneCommand::Approve => "approve",
            MilestoneCommand::Reject { .. } => "reject",
            MilestoneCommand::Complete => "complete",
            MilestoneCommand::Cancel => "cancel",
        }
    }

    /// The status this command leads to from `from`, if it is allowed.
    pub fn target(&self, from: MilestoneStatus) -> Option<MilestoneStatus> {
        use MilestoneStatus as S;
        match (from, self) {
            (S::Draft, MilestoneCommand::Open) => Some(S::Open),
            (S::Open, MilestoneCommand::Assign { .. }) => Some(S::Assigned),
            (S::Assigned | S::Rejected, MilestoneCommand::Start) => Some(S::InProgress),
            (S::InProgress, MilestoneCommand::Submit) => Some(S::Submitted),
            (S::Submitted, MilestoneCommand::Approve) => Some(S::Approved),
            (S::Submitted, MilestoneCommand::Reject { .. }) => Some(S::Rejected),
            (S::Approved | S::Rejected, MilestoneCommand::Complete) => Some(S::Completed),
            (status, MilestoneCommand::Cancel) if !status.is_terminal() => Some(S::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub amount_cents: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    pub status: MilestoneStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct MilestonePatch {
    pub status: Option<MilestoneStatus>,
    pub assignee_id: Option<Option<String>>,
    pub rejection_reason: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Milestone {
    type Patch = MilestonePatch;
    const KIND: &'static str = "Milestone";
    const INDEXES: &'static [IndexSpec] = &[
        IndexSpec::unordered(PROJECT_INDEX),
        IndexSpec::unordered(STATUS_INDEX),
        IndexSpec::unordered(ASSIGNEE_INDEX),
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, index: &str) -> Option<Cow<'_, str>> {
        match index {
            PROJECT_INDEX => Some(self.project_id.as_str().into()),
            STATUS_INDEX => Some(self.status.as_str().into()),
            ASSIGNEE_INDEX => self.assignee_id.as_deref().map(Cow::from),
            _ => None,
        }
    }

    fn apply_patch(&mut self, patch: MilestonePatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(assignee_id) = patch.assignee_id {
            self.assignee_id = assignee_id;
        }
        if let Some(reason) = patch.rejection_reason {
            self.rejection_reason = reason;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

/// Input to [`crate::Board::create_milestone`].
#[derive(Debug, Clone, Default)]
pub struct NewMilestone {
    /// Generated as `milestone-N` when absent.
    pub id: Option<String>,
    pub project_id: String,
    pub title: String,
    pub amount_cents: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use MilestoneStatus as S;

    fn assign() -> MilestoneCommand {
        MilestoneCommand::Assign {
            assignee_id: "dev-1".to_string(),
        }
    }

    fn reject() -> MilestoneCommand {
        MilestoneCommand::Reject {
            reason: "missing tests".to_string(),
        }
    }

    #[test]
    fn happy_path_reaches_completed() {
        let steps = [
            (MilestoneCommand::Open, S::Open),
            (assign(), S::Assigned),
            (MilestoneCommand::Start, S::InProgress),
            (MilestoneCommand::Submit, S::Submitted),
            (MilestoneCommand::Approve, S::Approved),
            (MilestoneCommand::Complete, S::Completed),
        ];
        let mut status = S::Draft;
        for (command, expected) in steps {
            status = command.target(status).expect("step should be allowed");
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn rejected_work_can_restart_or_close() {
        assert_eq!(reject().target(S::Submitted), Some(S::Rejected));
        assert_eq!(MilestoneCommand::Start.target(S::Rejected), Some(S::InProgress));
        assert_eq!(MilestoneCommand::Complete.target(S::Rejected), Some(S::Completed));
    }

    #[test]
    fn approval_requires_submission() {
        for status in [S::Draft, S::Open, S::Assigned, S::InProgress, S::Approved, S::Rejected] {
            assert_eq!(MilestoneCommand::Approve.target(status), None, "{status}");
        }
    }

    #[test]
    fn cancel_from_any_non_terminal_state() {
        for status in [
            S::Draft,
            S::Open,
            S::Assigned,
            S::InProgress,
            S::Submitted,
            S::Approved,
            S::Rejected,
        ] {
            assert_eq!(MilestoneCommand::Cancel.target(status), Some(S::Cancelled));
        }
        assert_eq!(MilestoneCommand::Cancel.target(S::Completed), None);
        assert_eq!(MilestoneCommand::Cancel.target(S::Cancelled), None);
    }

    #[test]
    fn status_strings_roundtrip() {
        for status in [S::Draft, S::InProgress, S::Cancelled] {
            assert_eq!(status.as_str().parse::<MilestoneStatus>(), Ok(status));
        }
        assert!("paused".parse::<MilestoneStatus>().is_err());
    }
}
