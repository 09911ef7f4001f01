use crate::cli::ProjectCommands;
use crate::support::{Context, exit_with, print_json};
use ledgerboard_board::{Board, BoardError, NewProject, Project, ProjectEdit};
use serde_json::json;

pub fn run(ctx: &Context, command: ProjectCommands) {
    match command {
        ProjectCommands::Add {
            title,
            id,
            owner,
            description,
        } => {
            let new = NewProject {
                id,
                owner_id: owner.unwrap_or_else(|| ctx.author.clone()),
                title,
                description,
            };
            mutate(ctx, "project.add", |board, author| {
                board.create_project(author, new).cloned()
            });
        }
        ProjectCommands::Update {
            id,
            title,
            description,
        } => mutate(ctx, "project.update", |board, author| {
            board
                .update_project(author, &id, ProjectEdit { title, description })
                .cloned()
        }),
        ProjectCommands::Publish { id } => mutate(ctx, "project.publish", |board, author| {
            board.publish_project(author, &id).cloned()
        }),
        ProjectCommands::Archive { id } => mutate(ctx, "project.archive", |board, author| {
            board.archive_project(author, &id).cloned()
        }),
        ProjectCommands::List { owner } => run_list(ctx, owner),
    }
}

fn mutate(
    ctx: &Context,
    action: &str,
    operation: impl FnOnce(&mut Board, &str) -> Result<Project, BoardError>,
) {
    let mut board = ctx.load_board_or_exit();
    let project = operation(&mut board, &ctx.author)
        .unwrap_or_else(|e| exit_with(format!("{action} failed: {e}")));
    ctx.save_board_or_exit(&board);

    if ctx.json {
        print_json(&json!({
            "action": action,
            "project": project,
        }));
    } else {
        println!("ledgerboard {}", action.replace('.', " "));
        println!("  Project: {} [{}] {}", project.id, project.status, project.title);
        println!("  Owner: {}", project.owner_id);
    }
}

fn run_list(ctx: &Context, owner: Option<String>) {
    let board = ctx.load_board_or_exit();
    let projects: Vec<&Project> = match &owner {
        Some(owner) => board.projects_of_owner(owner),
        None => board.projects().collect(),
    };

    if ctx.json {
        print_json(&json!({
            "action": "project.list",
            "count": projects.len(),
            "projects": projects,
        }));
    } else {
        println!("ledgerboard project list ({})", projects.len());
        for project in projects {
            println!("  {} [{}] {}", project.id, project.status, project.title);
        }
    }
}
