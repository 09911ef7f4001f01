//! # ledgerboard-board
//!
//! Projects, kanban cards and paid milestones, kept in an indexed store
//! with every change recorded on a hash chain.
//!
//! ```text
//! Board::<operation>
//!     │ validate (NotFound, InvalidTransition, ...)
//!     ▼
//! BoardState.apply(event)   ← IndexedStore<Project | Card | Milestone>
//!     │
//!     ▼
//! Chain.append(record)      ← same subject id, payload = event fields
//!     │
//!     ▼
//! Subscribers.publish(record)
//! ```
//!
//! `BoardState::replay` and the `fold_*` functions read the chain back
//! into state, for the whole board or for one subject at a point in time.

pub mod board;
pub mod card;
pub mod error;
pub mod events;
pub mod milestone;
pub mod project;
pub mod shared;
pub mod subscribers;

pub use board::Board;
pub use card::{COLUMN_INDEX, Card, CardEdit, CardPatch, LANE_INDEX, NewCard, lane_key};
pub use error::BoardError;
pub use events::{BoardEvent, BoardState, fold_card, fold_milestone, fold_project};
pub use milestone::{Milestone, MilestoneCommand, MilestonePatch, MilestoneStatus, NewMilestone};
pub use project::{NewProject, Project, ProjectEdit, ProjectPatch, ProjectStatus};
pub use shared::SharedBoard;
pub use subscribers::{SubscriptionId, Subscribers};
