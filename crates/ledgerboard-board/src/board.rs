//! `Board`: the only entry point for board mutations.
//!
//! Every operation runs in three phases:
//! 1. validate against current state, returning an error with nothing changed
//! 2. apply the event to the stores
//! 3. append one chain record for the same subject and notify subscribers
//!
//! so `history(id)` and the current entity always describe the same thing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ledgerboard_chain::{Chain, Clock, HashRecord};
use ledgerboard_store::Entity;
use tracing::info;

use crate::card::{self, Card, CardEdit, LANE_INDEX, NewCard, lane_key};
use crate::error::BoardError;
use crate::events::{BoardEvent, BoardState, fold_card, fold_milestone, fold_project};
use crate::milestone::{self, Milestone, MilestoneCommand, MilestoneStatus, NewMilestone};
use crate::project::{self, NewProject, Project, ProjectEdit, ProjectStatus};
use crate::subscribers::{SubscriptionId, Subscribers};

#[derive(Debug, Default)]
pub struct Board {
    chain: Chain,
    state: BoardState,
    subscribers: Subscribers,
}

fn require(value: &str, field: &'static str) -> Result<(), BoardError> {
    if value.trim().is_empty() {
        return Err(BoardError::MissingField(field));
    }
    Ok(())
}

fn not_found(kind: &'static str, id: &str) -> BoardError {
    BoardError::NotFound {
        kind,
        id: id.to_string(),
    }
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(Chain::with_clock(clock), BoardState::default())
    }

    /// Rebuild current state by replaying every record of `chain`.
    pub fn from_chain(chain: Chain) -> Result<Self, BoardError> {
        let state = BoardState::replay(chain.records())?;
        Ok(Self::from_parts(chain, state))
    }

    /// Pair a chain with state loaded from elsewhere, e.g. snapshots.
    pub fn from_parts(chain: Chain, state: BoardState) -> Self {
        Self {
            chain,
            state,
            subscribers: Subscribers::default(),
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn history(&self, subject_id: &str) -> Vec<&HashRecord> {
        self.chain.history(subject_id)
    }

    pub fn subscribe(
        &mut self,
        callback: impl Fn(&HashRecord) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    // ---- queries ----

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.state.projects().find_by_id(id)
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.state.cards().find_by_id(id)
    }

    pub fn milestone(&self, id: &str) -> Option<&Milestone> {
        self.state.milestones().find_by_id(id)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.state.projects().iter()
    }

    pub fn projects_of_owner(&self, owner_id: &str) -> Vec<&Project> {
        self.state
            .projects()
            .find_by_index(project::OWNER_INDEX, owner_id)
            .unwrap_or_default()
    }

    /// Cards of one project's column, in position order.
    pub fn cards_in_column(&self, project_id: &str, column_id: &str) -> Vec<&Card> {
        self.state
            .cards()
            .find_by_index(LANE_INDEX, &lane_key(project_id, column_id))
            .unwrap_or_default()
    }

    /// Cards in `column_id` across every project, in id order.
    pub fn cards_by_column(&self, column_id: &str) -> Vec<&Card> {
        self.state
            .cards()
            .find_by_index(card::COLUMN_INDEX, column_id)
            .unwrap_or_default()
    }

    pub fn cards_of_project(&self, project_id: &str) -> Vec<&Card> {
        self.state
            .cards()
            .find_by_index(card::PROJECT_INDEX, project_id)
            .unwrap_or_default()
    }

    pub fn cards_of_assignee(&self, assignee_id: &str) -> Vec<&Card> {
        self.state
            .cards()
            .find_by_index(card::ASSIGNEE_INDEX, assignee_id)
            .unwrap_or_default()
    }

    pub fn card_children(&self, id: &str) -> Vec<&Card> {
        self.state.cards().find_children(id)
    }

    /// Every card below `id` in the parent tree.
    pub fn card_subtree(&self, id: &str) -> Vec<&Card> {
        self.state.cards().find_all_descendants(id)
    }

    pub fn milestones_of_project(&self, project_id: &str) -> Vec<&Milestone> {
        self.state
            .milestones()
            .find_by_index(milestone::PROJECT_INDEX, project_id)
            .unwrap_or_default()
    }

    pub fn milestones_by_status(&self, status: MilestoneStatus) -> Vec<&Milestone> {
        self.state
            .milestones()
            .find_by_index(milestone::STATUS_INDEX, status.as_str())
            .unwrap_or_default()
    }

    // ---- point-in-time views ----

    /// The whole board as it stood at `as_of`.
    pub fn state_as_of(&self, as_of: DateTime<Utc>) -> Result<BoardState, BoardError> {
        BoardState::replay(self.chain.replay(None, Some(as_of)))
    }

    pub fn project_as_of(
        &self,
        id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Option<Project>, BoardError> {
        fold_project(self.chain.replay(Some(id), Some(as_of)))
    }

    pub fn card_as_of(&self, id: &str, as_of: DateTime<Utc>) -> Result<Option<Card>, BoardError> {
        fold_card(self.chain.replay(Some(id), Some(as_of)))
    }

    pub fn milestone_as_of(
        &self,
        id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Option<Milestone>, BoardError> {
        fold_milestone(self.chain.replay(Some(id), Some(as_of)))
    }

    // ---- projects ----

    pub fn create_project(
        &mut self,
        author: &str,
        new: NewProject,
    ) -> Result<&Project, BoardError> {
        require(&new.owner_id, "owner_id")?;
        require(&new.title, "title")?;
        let id = self.claim_id(new.id, "project", self.state.projects().len())?;

        let now = self.chain.next_timestamp();
        let project = Project {
            id: id.clone(),
            owner_id: new.owner_id,
            title: new.title,
            description: new.description,
            status: ProjectStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        self.record(author, &id, BoardEvent::CreateProject { project })?;
        self.project(&id).ok_or_else(|| not_found(Project::KIND, &id))
    }

    pub fn update_project(
        &mut self,
        author: &str,
        id: &str,
        edit: ProjectEdit,
    ) -> Result<&Project, BoardError> {
        let project = self.open_project(id, "update")?;
        if let Some(title) = &edit.title {
            require(title, "title")?;
        }
        let event = BoardEvent::UpdateProject {
            title: edit.title.unwrap_or_else(|| project.title.clone()),
            description: edit
                .description
                .unwrap_or_else(|| project.description.clone()),
            updated_at: self.chain.next_timestamp(),
        };
        self.record(author, id, event)?;
        self.project(id).ok_or_else(|| not_found(Project::KIND, id))
    }

    pub fn publish_project(&mut self, author: &str, id: &str) -> Result<&Project, BoardError> {
        self.project_in(id, ProjectStatus::Draft, "publish")?;
        let event = BoardEvent::PublishProject {
            updated_at: self.chain.next_timestamp(),
        };
        self.record(author, id, event)?;
        self.project(id).ok_or_else(|| not_found(Project::KIND, id))
    }

    pub fn archive_project(&mut self, author: &str, id: &str) -> Result<&Project, BoardError> {
        self.project_in(id, ProjectStatus::Published, "archive")?;
        let event = BoardEvent::ArchiveProject {
            updated_at: self.chain.next_timestamp(),
        };
        self.record(author, id, event)?;
        self.project(id).ok_or_else(|| not_found(Project::KIND, id))
    }

    // ---- cards ----

    pub fn create_card(&mut self, author: &str, new: NewCard) -> Result<&Card, BoardError> {
        require(&new.title, "title")?;
        require(&new.column_id, "column_id")?;
        if let Some(assignee) = &new.assignee_id {
            require(assignee, "assignee_id")?;
        }
        self.open_project(&new.project_id, "add cards")?;
        if let Some(parent_id) = &new.parent_id {
            let parent = self
                .card(parent_id)
                .ok_or_else(|| not_found(Card::KIND, parent_id))?;
            if parent.project_id != new.project_id {
                return Err(BoardError::CrossProject {
                    kind: Card::KIND,
                    id: parent_id.clone(),
                    expected: new.project_id.clone(),
                    actual: parent.project_id.clone(),
                });
            }
        }
        let id = self.claim_id(new.id, "card", self.state.cards().len())?;

        let now = self.chain.next_timestamp();
        let position = self.cards_in_column(&new.project_id, &new.column_id).len();
        let card = Card {
            id: id.clone(),
            project_id: new.project_id,
            column_id: new.column_id,
            position,
            title: new.title,
            description: new.description,
            assignee_id: new.assignee_id,
            parent_id: new.parent_id,
            created_at: now,
            updated_at: now,
        };
        self.record(author, &id, BoardEvent::CreateCard { card })?;
        self.card(&id).ok_or_else(|| not_found(Card::KIND, &id))
    }

    pub fn update_card(
        &mut self,
        author: &str,
        id: &str,
        edit: CardEdit,
    ) -> Result<&Card, BoardError> {
        let card = self.card(id).ok_or_else(|| not_found(Card::KIND, id))?;
        self.open_project(&card.project_id, "update cards")?;
        if let Some(title) = &edit.title {
            require(title, "title")?;
        }
        if let Some(Some(assignee)) = &edit.assignee_id {
            require(assignee, "assignee_id")?;
        }
        let event = BoardEvent::UpdateCard {
            title: edit.title.unwrap_or_else(|| card.title.clone()),
            description: edit.description.unwrap_or_else(|| card.description.clone()),
            assignee_id: edit.assignee_id.unwrap_or_else(|| card.assignee_id.clone()),
            updated_at: self.chain.next_timestamp(),
        };
        self.record(author, id, event)?;
        self.card(id).ok_or_else(|| not_found(Card::KIND, id))
    }

    /// Move a card to the end of another column of its project.
    pub fn move_card(
        &mut self,
        author: &str,
        id: &str,
        to_column: &str,
    ) -> Result<&Card, BoardError> {
        require(to_column, "column_id")?;
        let card = self.card(id).ok_or_else(|| not_found(Card::KIND, id))?;
        self.open_project(&card.project_id, "move cards")?;
        if card.column_id == to_column {
            return Err(BoardError::InvalidTransition {
                kind: Card::KIND,
                id: id.to_string(),
                from: card.column_id.clone(),
                action: "move to its own column",
            });
        }
        let event = BoardEvent::MoveCard {
            from_column: card.column_id.clone(),
            to_column: to_column.to_string(),
            position: self.cards_in_column(&card.project_id, to_column).len(),
            updated_at: self.chain.next_timestamp(),
        };
        self.record(author, id, event)?;
        self.card(id).ok_or_else(|| not_found(Card::KIND, id))
    }

    /// Remove a leaf card. Cards with children must be emptied first.
    pub fn delete_card(&mut self, author: &str, id: &str) -> Result<Card, BoardError> {
        let card = self
            .card(id)
            .cloned()
            .ok_or_else(|| not_found(Card::KIND, id))?;
        self.open_project(&card.project_id, "delete cards")?;
        if !self.card_children(id).is_empty() {
            return Err(BoardError::HasChildren(id.to_string()));
        }
        let event = BoardEvent::DeleteCard {
            column_id: card.column_id.clone(),
            position: card.position,
        };
        self.record(author, id, event)?;
        Ok(card)
    }

    // ---- milestones ----

    pub fn create_milestone(
        &mut self,
        author: &str,
        new: NewMilestone,
    ) -> Result<&Milestone, BoardError> {
        require(&new.title, "title")?;
        self.open_project(&new.project_id, "add milestones")?;
        let id = self.claim_id(new.id, "milestone", self.state.milestones().len())?;

        let now = self.chain.next_timestamp();
        let milestone = Milestone {
            id: id.clone(),
            project_id: new.project_id,
            title: new.title,
            amount_cents: new.amount_cents,
            assignee_id: None,
            status: MilestoneStatus::Draft,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.record(author, &id, BoardEvent::CreateMilestone { milestone })?;
        self.milestone(&id)
            .ok_or_else(|| not_found(Milestone::KIND, &id))
    }

    /// Advance a milestone through its lifecycle.
    ///
    /// Assigning sets the assignee, rejecting records the reason, and
    /// restarting rejected work clears it.
    pub fn transition_milestone(
        &mut self,
        author: &str,
        id: &str,
        command: MilestoneCommand,
    ) -> Result<&Milestone, BoardError> {
        let milestone = self
            .milestone(id)
            .ok_or_else(|| not_found(Milestone::KIND, id))?;
        let from = milestone.status;
        let to = command
            .target(from)
            .ok_or_else(|| BoardError::InvalidTransition {
                kind: Milestone::KIND,
                id: id.to_string(),
                from: from.as_str().to_string(),
                action: command.name(),
            })?;

        let mut assignee_id = milestone.assignee_id.clone();
        let mut rejection_reason = milestone.rejection_reason.clone();
        match &command {
            MilestoneCommand::Assign { assignee_id: assignee } => {
                require(assignee, "assignee_id")?;
                assignee_id = Some(assignee.clone());
            }
            MilestoneCommand::Reject { reason } => {
                require(reason, "reason")?;
                rejection_reason = Some(reason.clone());
            }
            MilestoneCommand::Start => rejection_reason = None,
            _ => {}
        }

        let event = BoardEvent::TransitionMilestone {
            from,
            to,
            assignee_id,
            rejection_reason,
            updated_at: self.chain.next_timestamp(),
        };
        self.record(author, id, event)?;
        self.milestone(id)
            .ok_or_else(|| not_found(Milestone::KIND, id))
    }

    // ---- internals ----

    /// The project, if it still accepts changes.
    fn open_project(&self, id: &str, action: &'static str) -> Result<&Project, BoardError> {
        let project = self
            .project(id)
            .ok_or_else(|| not_found(Project::KIND, id))?;
        if project.status == ProjectStatus::Archived {
            return Err(BoardError::InvalidTransition {
                kind: Project::KIND,
                id: id.to_string(),
                from: project.status.as_str().to_string(),
                action,
            });
        }
        Ok(project)
    }

    fn project_in(
        &self,
        id: &str,
        expected: ProjectStatus,
        action: &'static str,
    ) -> Result<&Project, BoardError> {
        let project = self
            .project(id)
            .ok_or_else(|| not_found(Project::KIND, id))?;
        if project.status != expected {
            return Err(BoardError::InvalidTransition {
                kind: Project::KIND,
                id: id.to_string(),
                from: project.status.as_str().to_string(),
                action,
            });
        }
        Ok(project)
    }

    /// A subject id is taken once any entity or chain record has used it,
    /// including deleted cards.
    fn subject_in_use(&self, id: &str) -> bool {
        self.state.projects().contains(id)
            || self.state.cards().contains(id)
            || self.state.milestones().contains(id)
            || !self.chain.history(id).is_empty()
    }

    fn claim_id(
        &self,
        requested: Option<String>,
        prefix: &str,
        live: usize,
    ) -> Result<String, BoardError> {
        match requested {
            Some(id) => {
                require(&id, "id")?;
                if self.subject_in_use(&id) {
                    return Err(BoardError::SubjectTaken(id));
                }
                Ok(id)
            }
            None => {
                let mut seq = live + 1;
                loop {
                    let candidate = format!("{prefix}-{seq}");
                    if !self.subject_in_use(&candidate) {
                        return Ok(candidate);
                    }
                    seq += 1;
                }
            }
        }
    }

    fn record(
        &mut self,
        author: &str,
        subject_id: &str,
        event: BoardEvent,
    ) -> Result<(), BoardError> {
        require(author, "author")?;
        let action = event.action();
        let kind = event.subject_kind();
        let payload = event.to_payload()?;

        self.state.apply(subject_id, event)?;
        let record = self.chain.append(action, kind, subject_id, payload, author);
        self.subscribers.publish(record);
        info!(
            seq = record.sequence_number(),
            action,
            subject = subject_id,
            author,
            "board event recorded"
        );
        Ok(())
    }
}
