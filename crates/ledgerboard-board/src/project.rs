//! Project: the container cards and milestones belong to.

use chrono::{DateTime, Utc};
use ledgerboard_store::{Entity, IndexSpec};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

pub const OWNER_INDEX: &str = "owner_id";
pub const STATUS_INDEX: &str = "status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    Published,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Published => "published",
            ProjectStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Project {
    type Patch = ProjectPatch;
    const KIND: &'static str = "Project";
    const INDEXES: &'static [IndexSpec] = &[
        IndexSpec::unordered(OWNER_INDEX),
        IndexSpec::unordered(STATUS_INDEX),
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, index: &str) -> Option<Cow<'_, str>> {
        match index {
            OWNER_INDEX => Some(self.owner_id.as_str().into()),
            STATUS_INDEX => Some(self.status.as_str().into()),
            _ => None,
        }
    }

    fn apply_patch(&mut self, patch: ProjectPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

/// Input to [`crate::Board::create_project`].
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    /// Generated as `project-N` when absent.
    pub id: Option<String>,
    pub owner_id: String,
    pub title: String,
    pub description: String,
}

/// Input to [`crate::Board::update_project`]; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ProjectEdit {
    pub title: Option<String>,
    pub description: Option<String>,
}
