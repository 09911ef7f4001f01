//! Card: a kanban work item, ordered within its project's column.

use chrono::{DateTime, Utc};
use ledgerboard_store::{Entity, IndexSpec};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub const PROJECT_INDEX: &str = "project_id";
/// Index of cards by column id, across projects.
pub const COLUMN_INDEX: &str = "column_id";
/// Positional index of cards within one project's column.
pub const LANE_INDEX: &str = "lane";
pub const ASSIGNEE_INDEX: &str = "assignee_id";
pub const PARENT_INDEX: &str = "parent_id";

/// Key of the positional bucket a card sits in.
///
/// The project id is length-prefixed, so distinct `(project, column)`
/// pairs never share a key whatever characters the ids contain.
pub fn lane_key(project_id: &str, column_id: &str) -> String {
    format!("{}:{project_id}/{column_id}", project_id.len())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub project_id: String,
    pub column_id: String,
    /// Zero-based position within the project's column.
    #[serde(default)]
    pub position: usize,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CardPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_id: Option<Option<String>>,
    pub column_id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Card {
    type Patch = CardPatch;
    const KIND: &'static str = "Card";
    const INDEXES: &'static [IndexSpec] = &[
        IndexSpec::unordered(PROJECT_INDEX),
        IndexSpec::unordered(COLUMN_INDEX),
        IndexSpec::positional(LANE_INDEX),
        IndexSpec::unordered(ASSIGNEE_INDEX),
        IndexSpec::unordered(PARENT_INDEX),
    ];
    const PARENT_INDEX: Option<&'static str> = Some(PARENT_INDEX);

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, index: &str) -> Option<Cow<'_, str>> {
        match index {
            PROJECT_INDEX => Some(self.project_id.as_str().into()),
            COLUMN_INDEX => Some(self.column_id.as_str().into()),
            LANE_INDEX => Some(lane_key(&self.project_id, &self.column_id).into()),
            ASSIGNEE_INDEX => self.assignee_id.as_deref().map(Cow::from),
            PARENT_INDEX => self.parent_id.as_deref().map(Cow::from),
            _ => None,
        }
    }

    fn position(&self, _index: &str) -> usize {
        self.position
    }

    fn set_position(&mut self, index: &str, position: usize) {
        if index == LANE_INDEX {
            self.position = position;
        }
    }

    fn apply_patch(&mut self, patch: CardPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(assignee_id) = patch.assignee_id {
            self.assignee_id = assignee_id;
        }
        if let Some(column_id) = patch.column_id {
            self.column_id = column_id;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

/// Input to [`crate::Board::create_card`].
#[derive(Debug, Clone, Default)]
pub struct NewCard {
    /// Generated as `card-N` when absent.
    pub id: Option<String>,
    pub project_id: String,
    pub column_id: String,
    pub title: String,
    pub description: String,
    pub assignee_id: Option<String>,
    pub parent_id: Option<String>,
}

/// Input to [`crate::Board::update_card`]; `None` keeps the current value.
///
/// `assignee_id: Some(None)` clears the assignee.
#[derive(Debug, Clone, Default)]
pub struct CardEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_id: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_keys_do_not_collide_across_projects() {
        assert_ne!(lane_key("a", "b/c"), lane_key("a/b", "c"));
        assert_ne!(lane_key("1:a", "b"), lane_key("1", "a/b"));
        assert_eq!(lane_key("web", "todo"), lane_key("web", "todo"));
    }
}
