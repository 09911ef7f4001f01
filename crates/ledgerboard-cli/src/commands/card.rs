use crate::cli::CardCommands;
use crate::support::{Context, exit_with, print_json};
use ledgerboard_board::{Board, BoardError, Card, CardEdit, NewCard};
use serde_json::json;

pub fn run(ctx: &Context, command: CardCommands) {
    match command {
        CardCommands::Add {
            project_id,
            title,
            id,
            column,
            description,
            assignee,
            parent,
        } => {
            let new = NewCard {
                id,
                project_id,
                column_id: column,
                title,
                description,
                assignee_id: assignee,
                parent_id: parent,
            };
            mutate(ctx, "card.add", |board, author| {
                board.create_card(author, new).cloned()
            });
        }
        CardCommands::Move { id, column } => mutate(ctx, "card.move", |board, author| {
            board.move_card(author, &id, &column).cloned()
        }),
        CardCommands::Update {
            id,
            title,
            description,
            assignee,
            unassign,
        } => {
            let assignee_id = if unassign {
                Some(None)
            } else {
                assignee.map(Some)
            };
            let edit = CardEdit {
                title,
                description,
                assignee_id,
            };
            mutate(ctx, "card.update", |board, author| {
                board.update_card(author, &id, edit).cloned()
            });
        }
        CardCommands::Delete { id } => mutate(ctx, "card.delete", |board, author| {
            board.delete_card(author, &id)
        }),
        CardCommands::List { project_id, column } => run_list(ctx, project_id, column),
        CardCommands::Tree { id } => run_tree(ctx, id),
    }
}

fn mutate(
    ctx: &Context,
    action: &str,
    operation: impl FnOnce(&mut Board, &str) -> Result<Card, BoardError>,
) {
    let mut board = ctx.load_board_or_exit();
    let card = operation(&mut board, &ctx.author)
        .unwrap_or_else(|e| exit_with(format!("{action} failed: {e}")));
    ctx.save_board_or_exit(&board);

    if ctx.json {
        print_json(&json!({
            "action": action,
            "card": card,
        }));
    } else {
        println!("ledgerboard {}", action.replace('.', " "));
        println!("  Card: {} {}", card.id, card.title);
        println!(
            "  Column: {}/{} #{}",
            card.project_id, card.column_id, card.position
        );
    }
}

fn run_list(ctx: &Context, project_id: String, column: Option<String>) {
    let board = ctx.load_board_or_exit();
    if board.project(&project_id).is_none() {
        exit_with(format!("project not found: {project_id}"));
    }
    let cards = match &column {
        Some(column) => board.cards_in_column(&project_id, column),
        None => board.cards_of_project(&project_id),
    };

    if ctx.json {
        print_json(&json!({
            "action": "card.list",
            "projectId": project_id,
            "columnId": column,
            "count": cards.len(),
            "cards": cards,
        }));
    } else {
        println!("ledgerboard card list ({})", cards.len());
        for card in cards {
            println!(
                "  {} [{} #{}] {}",
                card.id, card.column_id, card.position, card.title
            );
        }
    }
}

fn run_tree(ctx: &Context, id: String) {
    let board = ctx.load_board_or_exit();
    if board.card(&id).is_none() {
        exit_with(format!("card not found: {id}"));
    }
    let mut descendants = board.card_subtree(&id);
    descendants.sort_by(|a, b| a.id.cmp(&b.id));

    if ctx.json {
        let ids: Vec<&str> = descendants.iter().map(|card| card.id.as_str()).collect();
        print_json(&json!({
            "action": "card.tree",
            "rootId": id,
            "count": descendants.len(),
            "descendantIds": ids,
            "descendants": descendants,
        }));
    } else {
        println!("ledgerboard card tree {id} ({})", descendants.len());
        for card in descendants {
            let parent = card.parent_id.as_deref().unwrap_or("-");
            println!("  {} (parent {parent}) {}", card.id, card.title);
        }
    }
}
