use crate::cli::{MilestoneCommands, StatusArg};
use crate::support::{Context, exit_with, print_json};
use ledgerboard_board::{Milestone, MilestoneCommand, MilestoneStatus, NewMilestone};
use serde_json::json;

pub fn run(ctx: &Context, command: MilestoneCommands) {
    let (id, step) = match command {
        MilestoneCommands::Add {
            project_id,
            title,
            id,
            amount_cents,
        } => {
            return run_add(
                ctx,
                NewMilestone {
                    id,
                    project_id,
                    title,
                    amount_cents,
                },
            );
        }
        MilestoneCommands::List { project_id, status } => {
            return run_list(ctx, project_id, status.map(map_status));
        }
        MilestoneCommands::Open { id } => (id, MilestoneCommand::Open),
        MilestoneCommands::Assign { id, assignee } => (
            id,
            MilestoneCommand::Assign {
                assignee_id: assignee,
            },
        ),
        MilestoneCommands::Start { id } => (id, MilestoneCommand::Start),
        MilestoneCommands::Submit { id } => (id, MilestoneCommand::Submit),
        MilestoneCommands::Approve { id } => (id, MilestoneCommand::Approve),
        MilestoneCommands::Reject { id, reason } => (id, MilestoneCommand::Reject { reason }),
        MilestoneCommands::Complete { id } => (id, MilestoneCommand::Complete),
        MilestoneCommands::Cancel { id } => (id, MilestoneCommand::Cancel),
    };
    run_transition(ctx, &id, step);
}

fn run_add(ctx: &Context, new: NewMilestone) {
    let mut board = ctx.load_board_or_exit();
    let milestone = board
        .create_milestone(&ctx.author, new)
        .cloned()
        .unwrap_or_else(|e| exit_with(format!("milestone.add failed: {e}")));
    ctx.save_board_or_exit(&board);
    report(ctx, "milestone.add", None, &milestone);
}

fn run_transition(ctx: &Context, id: &str, step: MilestoneCommand) {
    let mut board = ctx.load_board_or_exit();
    let name = step.name();
    let action = format!("milestone.{name}");
    let from = board.milestone(id).map(|milestone| milestone.status);
    let milestone = board
        .transition_milestone(&ctx.author, id, step)
        .cloned()
        .unwrap_or_else(|e| exit_with(format!("{action} failed: {e}")));
    ctx.save_board_or_exit(&board);
    report(ctx, &action, from, &milestone);
}

fn report(ctx: &Context, action: &str, from: Option<MilestoneStatus>, milestone: &Milestone) {
    if ctx.json {
        print_json(&json!({
            "action": action,
            "from": from,
            "milestone": milestone,
        }));
    } else {
        println!("ledgerboard {}", action.replace('.', " "));
        println!("  Milestone: {} {}", milestone.id, milestone.title);
        match from {
            Some(from) => println!("  Status: {from} -> {}", milestone.status),
            None => println!("  Status: {}", milestone.status),
        }
        if let Some(assignee) = &milestone.assignee_id {
            println!("  Assignee: {assignee}");
        }
        if let Some(reason) = &milestone.rejection_reason {
            println!("  Rejected: {reason}");
        }
    }
}

fn run_list(ctx: &Context, project_id: String, status: Option<MilestoneStatus>) {
    let board = ctx.load_board_or_exit();
    if board.project(&project_id).is_none() {
        exit_with(format!("project not found: {project_id}"));
    }
    let milestones: Vec<&Milestone> = board
        .milestones_of_project(&project_id)
        .into_iter()
        .filter(|milestone| status.is_none_or(|status| milestone.status == status))
        .collect();
    let total_cents: u64 = milestones.iter().map(|milestone| milestone.amount_cents).sum();

    if ctx.json {
        print_json(&json!({
            "action": "milestone.list",
            "projectId": project_id,
            "count": milestones.len(),
            "totalCents": total_cents,
            "milestones": milestones,
        }));
    } else {
        println!("ledgerboard milestone list ({})", milestones.len());
        for milestone in milestones {
            println!(
                "  {} [{}] {} ({} cents)",
                milestone.id, milestone.status, milestone.title, milestone.amount_cents
            );
        }
    }
}

fn map_status(arg: StatusArg) -> MilestoneStatus {
    match arg {
        StatusArg::Draft => MilestoneStatus::Draft,
        StatusArg::Open => MilestoneStatus::Open,
        StatusArg::Assigned => MilestoneStatus::Assigned,
        StatusArg::InProgress => MilestoneStatus::InProgress,
        StatusArg::Submitted => MilestoneStatus::Submitted,
        StatusArg::Approved => MilestoneStatus::Approved,
        StatusArg::Rejected => MilestoneStatus::Rejected,
        StatusArg::Completed => MilestoneStatus::Completed,
        StatusArg::Cancelled => MilestoneStatus::Cancelled,
    }
}
