use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use ledgerboard_board::{
    Board, BoardError, BoardState, CardEdit, MilestoneCommand, MilestoneStatus, NewCard,
    NewMilestone, NewProject, ProjectEdit, ProjectStatus,
};
use ledgerboard_chain::{Chain, ManualClock, read_records, write_records};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

struct Fixture {
    board: Board,
    clock: ManualClock,
    project_id: String,
}

impl Fixture {
    fn new() -> Self {
        let clock = ManualClock::new(start());
        let mut board = Board::with_clock(Arc::new(clock.clone()));
        let project_id = board
            .create_project(
                "alice",
                NewProject {
                    owner_id: "alice".to_string(),
                    title: "Website relaunch".to_string(),
                    ..NewProject::default()
                },
            )
            .unwrap()
            .id
            .clone();
        Self {
            board,
            clock,
            project_id,
        }
    }

    fn tick(&self) {
        self.clock.advance(Duration::seconds(1));
    }

    fn card(&mut self, column: &str, parent: Option<&str>) -> String {
        self.tick();
        self.board
            .create_card(
                "alice",
                NewCard {
                    project_id: self.project_id.clone(),
                    column_id: column.to_string(),
                    title: format!("in {column}"),
                    parent_id: parent.map(str::to_string),
                    ..NewCard::default()
                },
            )
            .unwrap()
            .id
            .clone()
    }

    fn milestone(&mut self) -> String {
        self.tick();
        self.board
            .create_milestone(
                "alice",
                NewMilestone {
                    project_id: self.project_id.clone(),
                    title: "Design handoff".to_string(),
                    amount_cents: 120_000,
                    ..NewMilestone::default()
                },
            )
            .unwrap()
            .id
            .clone()
    }

    fn step(&mut self, id: &str, command: MilestoneCommand) -> Result<MilestoneStatus, BoardError> {
        self.tick();
        self.board
            .transition_milestone("alice", id, command)
            .map(|milestone| milestone.status)
    }
}

fn column_ids(board: &Board, project_id: &str, column: &str) -> Vec<(String, usize)> {
    board
        .cards_in_column(project_id, column)
        .into_iter()
        .map(|card| (card.id.clone(), card.position))
        .collect()
}

fn assert_same_state(left: &BoardState, right: &BoardState) {
    assert_eq!(
        left.projects().iter().collect::<Vec<_>>(),
        right.projects().iter().collect::<Vec<_>>()
    );
    assert_eq!(
        left.cards().iter().collect::<Vec<_>>(),
        right.cards().iter().collect::<Vec<_>>()
    );
    assert_eq!(
        left.milestones().iter().collect::<Vec<_>>(),
        right.milestones().iter().collect::<Vec<_>>()
    );
}

#[test]
fn every_operation_appends_one_record_for_its_subject() {
    let mut fx = Fixture::new();
    let card = fx.card("backlog", None);
    fx.tick();
    fx.board.move_card("alice", &card, "doing").unwrap();
    fx.tick();
    fx.board
        .update_card(
            "bob",
            &card,
            CardEdit {
                assignee_id: Some(Some("bob".to_string())),
                ..CardEdit::default()
            },
        )
        .unwrap();

    let actions: Vec<_> = fx
        .board
        .history(&card)
        .iter()
        .map(|record| (record.action().to_string(), record.author_id().to_string()))
        .collect();
    assert_eq!(
        actions,
        vec![
            ("CREATE_CARD".to_string(), "alice".to_string()),
            ("MOVE_CARD".to_string(), "alice".to_string()),
            ("UPDATE_CARD".to_string(), "bob".to_string()),
        ]
    );

    let current = fx.board.card(&card).unwrap();
    assert_eq!(current.column_id, "doing");
    assert_eq!(current.assignee_id.as_deref(), Some("bob"));
    assert_eq!(fx.board.cards_of_assignee("bob").len(), 1);
    assert!(fx.board.chain().validate().valid);
}

#[test]
fn milestone_walks_the_full_lifecycle() {
    let mut fx = Fixture::new();
    let id = fx.milestone();

    assert_eq!(fx.step(&id, MilestoneCommand::Open).unwrap(), MilestoneStatus::Open);
    let assigned = fx
        .step(
            &id,
            MilestoneCommand::Assign {
                assignee_id: "dev-7".to_string(),
            },
        )
        .unwrap();
    assert_eq!(assigned, MilestoneStatus::Assigned);
    for (command, expected) in [
        (MilestoneCommand::Start, MilestoneStatus::InProgress),
        (MilestoneCommand::Submit, MilestoneStatus::Submitted),
        (MilestoneCommand::Approve, MilestoneStatus::Approved),
        (MilestoneCommand::Complete, MilestoneStatus::Completed),
    ] {
        assert_eq!(fx.step(&id, command).unwrap(), expected);
    }

    assert_eq!(fx.board.history(&id).len(), 7);
    assert_eq!(fx.board.milestones_by_status(MilestoneStatus::Completed).len(), 1);
    assert!(fx.board.milestones_by_status(MilestoneStatus::Draft).is_empty());

    let err = fx.step(&id, MilestoneCommand::Cancel).unwrap_err();
    assert!(matches!(err, BoardError::InvalidTransition { .. }), "{err}");
}

#[test]
fn illegal_transition_leaves_store_and_chain_untouched() {
    let mut fx = Fixture::new();
    let id = fx.milestone();
    fx.step(&id, MilestoneCommand::Open).unwrap();
    let before = fx.board.milestone(&id).unwrap().clone();
    let chain_len = fx.board.chain().len();

    let err = fx.step(&id, MilestoneCommand::Approve).unwrap_err();
    match err {
        BoardError::InvalidTransition { from, action, .. } => {
            assert_eq!(from, "open");
            assert_eq!(action, "approve");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fx.board.milestone(&id).unwrap(), &before);
    assert_eq!(fx.board.chain().len(), chain_len);
    assert_eq!(fx.board.history(&id).len(), 2);
}

#[test]
fn referential_checks_fail_before_any_effect() {
    let mut fx = Fixture::new();
    let parent = fx.card("backlog", None);
    let chain_len = fx.board.chain().len();

    let missing = fx.board.create_card(
        "alice",
        NewCard {
            project_id: "project-404".to_string(),
            column_id: "backlog".to_string(),
            title: "Orphan".to_string(),
            ..NewCard::default()
        },
    );
    assert!(matches!(missing, Err(BoardError::NotFound { kind: "Project", .. })));

    let other_project = fx
        .board
        .create_project(
            "alice",
            NewProject {
                owner_id: "alice".to_string(),
                title: "Side project".to_string(),
                ..NewProject::default()
            },
        )
        .unwrap()
        .id
        .clone();
    let cross = fx.board.create_card(
        "alice",
        NewCard {
            project_id: other_project,
            column_id: "backlog".to_string(),
            title: "Wrong parent".to_string(),
            parent_id: Some(parent.clone()),
            ..NewCard::default()
        },
    );
    assert!(matches!(cross, Err(BoardError::CrossProject { .. })));

    let untitled = fx.board.create_card(
        "alice",
        NewCard {
            project_id: fx.project_id.clone(),
            column_id: "backlog".to_string(),
            ..NewCard::default()
        },
    );
    assert!(matches!(untitled, Err(BoardError::MissingField("title"))));

    // Only the side project was recorded.
    assert_eq!(fx.board.chain().len(), chain_len + 1);
    assert_eq!(fx.board.cards_of_project(&fx.project_id).len(), 1);
}

#[test]
fn same_column_move_is_rejected() {
    let mut fx = Fixture::new();
    let card = fx.card("backlog", None);
    let err = fx.board.move_card("alice", &card, "backlog").unwrap_err();
    assert!(matches!(err, BoardError::InvalidTransition { .. }));
    assert_eq!(fx.board.history(&card).len(), 1);
}

#[test]
fn parent_cards_cannot_be_deleted_before_children() {
    let mut fx = Fixture::new();
    let root = fx.card("backlog", None);
    let child = fx.card("backlog", Some(&root));
    let grandchild = fx.card("backlog", Some(&child));

    let mut subtree: Vec<_> = fx
        .board
        .card_subtree(&root)
        .into_iter()
        .map(|card| card.id.clone())
        .collect();
    subtree.sort();
    assert_eq!(subtree, vec![child.clone(), grandchild.clone()]);

    let err = fx.board.delete_card("alice", &root).unwrap_err();
    assert!(matches!(err, BoardError::HasChildren(id) if id == root));

    fx.tick();
    fx.board.delete_card("alice", &grandchild).unwrap();
    fx.tick();
    fx.board.delete_card("alice", &child).unwrap();
    fx.tick();
    let removed = fx.board.delete_card("alice", &root).unwrap();
    assert_eq!(removed.id, root);
    assert!(fx.board.cards_of_project(&fx.project_id).is_empty());

    // History outlives the entity.
    let last = fx.board.history(&root);
    assert_eq!(last.len(), 2);
    assert_eq!(last[1].action(), "DELETE_CARD");
}

#[test]
fn project_lifecycle_and_archive_freeze() {
    let mut fx = Fixture::new();
    let id = fx.project_id.clone();
    let card = fx.card("backlog", None);

    let err = fx.board.archive_project("alice", &id).unwrap_err();
    assert!(matches!(err, BoardError::InvalidTransition { action: "archive", .. }));

    fx.tick();
    fx.board
        .update_project(
            "alice",
            &id,
            ProjectEdit {
                description: Some("Q3 relaunch".to_string()),
                ..ProjectEdit::default()
            },
        )
        .unwrap();
    fx.tick();
    assert_eq!(
        fx.board.publish_project("alice", &id).unwrap().status,
        ProjectStatus::Published
    );
    assert!(fx.board.publish_project("alice", &id).is_err());
    fx.tick();
    fx.board.archive_project("alice", &id).unwrap();

    assert!(fx.board.move_card("alice", &card, "done").is_err());
    assert!(fx.board.update_project("alice", &id, ProjectEdit::default()).is_err());
    let project = fx.board.project(&id).unwrap();
    assert_eq!(project.title, "Website relaunch");
    assert_eq!(project.description, "Q3 relaunch");
    assert_eq!(fx.board.projects_of_owner("alice").len(), 1);
}

#[test]
fn state_as_of_reproduces_past_positions() {
    let mut fx = Fixture::new();
    let a = fx.card("todo", None);
    let b = fx.card("todo", None);
    let c = fx.card("todo", None);
    let before_move = fx.clock_now();

    fx.tick();
    fx.board.move_card("alice", &a, "done").unwrap();

    let then = fx.board.state_as_of(before_move).unwrap();
    let then_board = Board::from_parts(Chain::new(), then);
    assert_eq!(
        column_ids(&then_board, &fx.project_id, "todo"),
        vec![(a.clone(), 0), (b.clone(), 1), (c.clone(), 2)]
    );
    assert_eq!(
        column_ids(&fx.board, &fx.project_id, "todo"),
        vec![(b.clone(), 0), (c.clone(), 1)]
    );

    let folded = fx.board.card_as_of(&a, before_move).unwrap().unwrap();
    assert_eq!(folded.column_id, "todo");
    let now = fx.board.card_as_of(&a, fx.clock_now()).unwrap().unwrap();
    assert_eq!(now.column_id, "done");
    assert_eq!(
        fx.board.project_as_of(&fx.project_id, start()).unwrap().unwrap().status,
        ProjectStatus::Draft
    );
    assert_eq!(fx.board.milestone_as_of("milestone-1", start()).unwrap(), None);
}

impl Fixture {
    fn clock_now(&self) -> DateTime<Utc> {
        self.board.chain().latest().timestamp()
    }
}

#[test]
fn replaying_the_chain_reproduces_live_state() {
    let mut fx = Fixture::new();
    let root = fx.card("todo", None);
    let child = fx.card("todo", Some(&root));
    fx.card("doing", None);
    fx.tick();
    fx.board.move_card("alice", &child, "doing").unwrap();
    let doomed = fx.card("todo", None);
    fx.tick();
    fx.board.delete_card("alice", &doomed).unwrap();
    let milestone = fx.milestone();
    fx.step(&milestone, MilestoneCommand::Open).unwrap();
    fx.step(&milestone, MilestoneCommand::Cancel).unwrap();

    let replayed = BoardState::replay(fx.board.chain().records()).unwrap();
    assert_same_state(fx.board.state(), &replayed);

    // Through JSONL and back, as the CLI persists it.
    let mut buffer = Vec::new();
    write_records(&mut buffer, fx.board.chain().records()).unwrap();
    let records = read_records(std::str::from_utf8(&buffer).unwrap()).unwrap();
    let chain = Chain::from_records(records, Arc::new(fx.clock.clone())).unwrap();
    assert!(chain.validate().valid);
    let reloaded = Board::from_chain(chain).unwrap();
    assert_same_state(fx.board.state(), reloaded.state());
}

#[test]
fn subscribers_see_each_record_after_it_is_appended() {
    let mut fx = Fixture::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let subscription = {
        let seen = Arc::clone(&seen);
        fx.board.subscribe(move |record| {
            seen.lock()
                .unwrap()
                .push((record.sequence_number(), record.action().to_string()));
        })
    };

    let card = fx.card("todo", None);
    assert!(
        fx.board
            .move_card("alice", &card, "todo")
            .is_err()
    );
    fx.tick();
    fx.board.move_card("alice", &card, "done").unwrap();
    assert!(fx.board.unsubscribe(subscription));
    fx.card("todo", None);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(2, "CREATE_CARD".to_string()), (3, "MOVE_CARD".to_string())]
    );
}

#[test]
fn chain_stats_snapshot() {
    let mut fx = Fixture::new();
    let card = fx.card("todo", None);
    fx.tick();
    fx.board.move_card("bob", &card, "done").unwrap();
    let milestone = fx.milestone();
    fx.step(&milestone, MilestoneCommand::Open).unwrap();

    insta::assert_json_snapshot!(fx.board.chain().stats(), @r###"
    {
      "totalRecords": 6,
      "uniqueSubjects": 4,
      "countsByAction": {
        "CREATE_CARD": 1,
        "CREATE_MILESTONE": 1,
        "CREATE_PROJECT": 1,
        "GENESIS": 1,
        "MOVE_CARD": 1,
        "TRANSITION_MILESTONE": 1
      },
      "countsByAuthor": {
        "alice": 4,
        "bob": 1,
        "system": 1
      },
      "latestTimestamp": "2024-06-01T08:00:04Z"
    }
    "###);
}
