//! Typed board events: the payload contract of every chain record the
//! board appends.
//!
//! A record's `action` is the event tag and its `payload` is the rest of
//! the event. Update events carry resulting values rather than deltas, so
//! folding a subject's records left to right rebuilds the entity without
//! consulting any other subject.

use chrono::{DateTime, Utc};
use ledgerboard_chain::{GENESIS_SUBJECT_KIND, HashRecord};
use ledgerboard_store::{Entity, IndexedStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::card::{Card, CardPatch};
use crate::error::BoardError;
use crate::milestone::{Milestone, MilestonePatch, MilestoneStatus};
use crate::project::{Project, ProjectPatch, ProjectStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardEvent {
    CreateProject {
        project: Project,
    },
    UpdateProject {
        title: String,
        #[serde(default)]
        description: String,
        updated_at: DateTime<Utc>,
    },
    PublishProject {
        updated_at: DateTime<Utc>,
    },
    ArchiveProject {
        updated_at: DateTime<Utc>,
    },
    CreateCard {
        card: Card,
    },
    UpdateCard {
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        assignee_id: Option<String>,
        updated_at: DateTime<Utc>,
    },
    /// The card lands at the end of `to_column`; `position` is where it
    /// landed.
    MoveCard {
        from_column: String,
        to_column: String,
        position: usize,
        updated_at: DateTime<Utc>,
    },
    DeleteCard {
        column_id: String,
        position: usize,
    },
    CreateMilestone {
        milestone: Milestone,
    },
    TransitionMilestone {
        from: MilestoneStatus,
        to: MilestoneStatus,
        #[serde(default)]
        assignee_id: Option<String>,
        #[serde(default)]
        rejection_reason: Option<String>,
        updated_at: DateTime<Utc>,
    },
}

impl BoardEvent {
    /// The record action string for this event.
    pub fn action(&self) -> &'static str {
        match self {
            BoardEvent::CreateProject { .. } => "CREATE_PROJECT",
            BoardEvent::UpdateProject { .. } => "UPDATE_PROJECT",
            BoardEvent::PublishProject { .. } => "PUBLISH_PROJECT",
            BoardEvent::ArchiveProject { .. } => "ARCHIVE_PROJECT",
            BoardEvent::CreateCard { .. } => "CREATE_CARD",
            BoardEvent::UpdateCard { .. } => "UPDATE_CARD",
            BoardEvent::MoveCard { .. } => "MOVE_CARD",
            BoardEvent::DeleteCard { .. } => "DELETE_CARD",
            BoardEvent::CreateMilestone { .. } => "CREATE_MILESTONE",
            BoardEvent::TransitionMilestone { .. } => "TRANSITION_MILESTONE",
        }
    }

    /// The entity kind whose subject this event describes.
    pub fn subject_kind(&self) -> &'static str {
        match self {
            BoardEvent::CreateProject { .. }
            | BoardEvent::UpdateProject { .. }
            | BoardEvent::PublishProject { .. }
            | BoardEvent::ArchiveProject { .. } => Project::KIND,
            BoardEvent::CreateCard { .. }
            | BoardEvent::UpdateCard { .. }
            | BoardEvent::MoveCard { .. }
            | BoardEvent::DeleteCard { .. } => Card::KIND,
            BoardEvent::CreateMilestone { .. } | BoardEvent::TransitionMilestone { .. } => {
                Milestone::KIND
            }
        }
    }

    /// The event without its tag, as stored in a record payload.
    pub fn to_payload(&self) -> Result<Value, BoardError> {
        let mut value =
            serde_json::to_value(self).map_err(|e| BoardError::Encode(e.to_string()))?;
        match value.as_object_mut() {
            Some(fields) => {
                fields.remove("action");
                Ok(value)
            }
            None => Err(BoardError::Encode(format!(
                "{} did not encode as an object",
                self.action()
            ))),
        }
    }

    /// Rebuild the event a record was appended for.
    pub fn decode(record: &HashRecord) -> Result<Self, BoardError> {
        let fail = |message: String| BoardError::Decode {
            sequence: record.sequence_number(),
            message,
        };
        let mut payload = record.payload().clone();
        let fields = payload
            .as_object_mut()
            .ok_or_else(|| fail("payload is not an object".to_string()))?;
        fields.insert("action".to_string(), Value::from(record.action()));

        let event: BoardEvent = serde_json::from_value(payload).map_err(|e| fail(e.to_string()))?;
        if event.subject_kind() != record.subject_kind() {
            return Err(fail(format!(
                "{} is not a {} action",
                record.action(),
                record.subject_kind()
            )));
        }
        Ok(event)
    }

    fn project_patch(&self) -> Option<ProjectPatch> {
        match self {
            BoardEvent::UpdateProject {
                title,
                description,
                updated_at,
            } => Some(ProjectPatch {
                title: Some(title.clone()),
                description: Some(description.clone()),
                status: None,
                updated_at: Some(*updated_at),
            }),
            BoardEvent::PublishProject { updated_at } => Some(ProjectPatch {
                status: Some(ProjectStatus::Published),
                updated_at: Some(*updated_at),
                ..ProjectPatch::default()
            }),
            BoardEvent::ArchiveProject { updated_at } => Some(ProjectPatch {
                status: Some(ProjectStatus::Archived),
                updated_at: Some(*updated_at),
                ..ProjectPatch::default()
            }),
            _ => None,
        }
    }

    fn card_patch(&self) -> Option<CardPatch> {
        match self {
            BoardEvent::UpdateCard {
                title,
                description,
                assignee_id,
                updated_at,
            } => Some(CardPatch {
                title: Some(title.clone()),
                description: Some(description.clone()),
                assignee_id: Some(assignee_id.clone()),
                column_id: None,
                updated_at: Some(*updated_at),
            }),
            BoardEvent::MoveCard {
                to_column,
                updated_at,
                ..
            } => Some(CardPatch {
                column_id: Some(to_column.clone()),
                updated_at: Some(*updated_at),
                ..CardPatch::default()
            }),
            _ => None,
        }
    }

    fn milestone_patch(&self) -> Option<MilestonePatch> {
        match self {
            BoardEvent::TransitionMilestone {
                to,
                assignee_id,
                rejection_reason,
                updated_at,
                ..
            } => Some(MilestonePatch {
                status: Some(*to),
                assignee_id: Some(assignee_id.clone()),
                rejection_reason: Some(rejection_reason.clone()),
                updated_at: Some(*updated_at),
            }),
            _ => None,
        }
    }
}

/// Current state of every board entity.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    projects: IndexedStore<Project>,
    cards: IndexedStore<Card>,
    milestones: IndexedStore<Milestone>,
}

impl BoardState {
    pub fn from_stores(
        projects: IndexedStore<Project>,
        cards: IndexedStore<Card>,
        milestones: IndexedStore<Milestone>,
    ) -> Self {
        Self {
            projects,
            cards,
            milestones,
        }
    }

    /// Fold records left to right into a fresh state.
    ///
    /// The genesis record is skipped. Because store operations run in the
    /// original order, card positions match the live board exactly.
    pub fn replay<'a>(
        records: impl IntoIterator<Item = &'a HashRecord>,
    ) -> Result<Self, BoardError> {
        let mut state = Self::default();
        for record in records {
            if record.subject_kind() == GENESIS_SUBJECT_KIND {
                continue;
            }
            let event = BoardEvent::decode(record)?;
            state.apply(record.subject_id(), event)?;
        }
        Ok(state)
    }

    pub fn projects(&self) -> &IndexedStore<Project> {
        &self.projects
    }

    pub fn cards(&self) -> &IndexedStore<Card> {
        &self.cards
    }

    pub fn milestones(&self) -> &IndexedStore<Milestone> {
        &self.milestones
    }

    /// Apply one event's store mutation. No domain rules are checked here.
    pub(crate) fn apply(&mut self, subject_id: &str, event: BoardEvent) -> Result<(), BoardError> {
        if let Some(patch) = event.project_patch() {
            self.projects.update(subject_id, patch)?;
            return Ok(());
        }
        if let Some(patch) = event.card_patch() {
            self.cards.update(subject_id, patch)?;
            return Ok(());
        }
        if let Some(patch) = event.milestone_patch() {
            self.milestones.update(subject_id, patch)?;
            return Ok(());
        }
        match event {
            BoardEvent::CreateProject { project } => {
                self.projects.create(project)?;
            }
            BoardEvent::CreateCard { card } => {
                self.cards.create(card)?;
            }
            BoardEvent::DeleteCard { .. } => {
                self.cards.delete(subject_id)?;
            }
            BoardEvent::CreateMilestone { milestone } => {
                self.milestones.create(milestone)?;
            }
            // Every other variant produced a patch above.
            _ => {}
        }
        Ok(())
    }
}

fn subject_events<'a>(
    records: impl IntoIterator<Item = &'a HashRecord>,
    kind: &'static str,
) -> impl Iterator<Item = Result<BoardEvent, BoardError>> {
    records
        .into_iter()
        .filter(move |record| record.subject_kind() == kind)
        .map(BoardEvent::decode)
}

/// Rebuild one project from its own records.
pub fn fold_project<'a>(
    records: impl IntoIterator<Item = &'a HashRecord>,
) -> Result<Option<Project>, BoardError> {
    let mut project: Option<Project> = None;
    for event in subject_events(records, Project::KIND) {
        match event? {
            BoardEvent::CreateProject { project: created } => project = Some(created),
            other => {
                if let (Some(current), Some(patch)) = (project.as_mut(), other.project_patch()) {
                    current.apply_patch(patch);
                }
            }
        }
    }
    Ok(project)
}

/// Rebuild one card from its own records.
///
/// `position` is the one recorded by the card's latest create or move;
/// later removals from the same column are other subjects' records and
/// are not seen here. Use [`BoardState::replay`] for exact positions.
pub fn fold_card<'a>(
    records: impl IntoIterator<Item = &'a HashRecord>,
) -> Result<Option<Card>, BoardError> {
    let mut card: Option<Card> = None;
    for event in subject_events(records, Card::KIND) {
        match event? {
            BoardEvent::CreateCard { card: created } => card = Some(created),
            BoardEvent::DeleteCard { .. } => card = None,
            other => {
                if let (Some(current), Some(patch)) = (card.as_mut(), other.card_patch()) {
                    current.apply_patch(patch);
                    if let BoardEvent::MoveCard { position, .. } = other {
                        current.position = position;
                    }
                }
            }
        }
    }
    Ok(card)
}

/// Rebuild one milestone from its own records.
pub fn fold_milestone<'a>(
    records: impl IntoIterator<Item = &'a HashRecord>,
) -> Result<Option<Milestone>, BoardError> {
    let mut milestone: Option<Milestone> = None;
    for event in subject_events(records, Milestone::KIND) {
        match event? {
            BoardEvent::CreateMilestone { milestone: created } => milestone = Some(created),
            other => {
                if let (Some(current), Some(patch)) = (milestone.as_mut(), other.milestone_patch())
                {
                    current.apply_patch(patch);
                }
            }
        }
    }
    Ok(milestone)
}
