use crate::cli::ChainCommands;
use crate::support::{Context, exit_with, parse_instant_or_exit, print_json};
use chrono::Utc;
use ledgerboard_board::{fold_card, fold_milestone, fold_project};
use ledgerboard_chain::{Chain, HashRecord, canonical_timestamp};
use serde_json::{Value, json};

pub fn run(ctx: &Context, command: ChainCommands) {
    let chain = ctx.load_chain_or_exit();
    match command {
        ChainCommands::History { subject } => run_history(ctx, &chain, &subject),
        ChainCommands::Validate => run_validate(ctx, &chain),
        ChainCommands::Replay { subject, until } => {
            let until = until.as_deref().map(parse_instant_or_exit);
            let records = chain.replay(subject.as_deref(), until);
            list_records(ctx, "chain.replay", subject.as_deref(), &records);
        }
        ChainCommands::Stats => run_stats(ctx, &chain),
        ChainCommands::Show { subject, as_of } => run_show(ctx, &chain, &subject, as_of),
    }
}

fn run_history(ctx: &Context, chain: &Chain, subject: &str) {
    let records = chain.history(subject);
    if records.is_empty() {
        exit_with(format!("no records for subject: {subject}"));
    }
    list_records(ctx, "chain.history", Some(subject), &records);
}

fn list_records(ctx: &Context, action: &str, subject: Option<&str>, records: &[&HashRecord]) {
    if ctx.json {
        print_json(&json!({
            "action": action,
            "subject": subject,
            "count": records.len(),
            "records": records,
        }));
    } else {
        println!("ledgerboard {} ({})", action.replace('.', " "), records.len());
        for record in records {
            println!(
                "  #{} {} {} {}/{} by {}",
                record.sequence_number(),
                canonical_timestamp(&record.timestamp()),
                record.action(),
                record.subject_kind(),
                record.subject_id(),
                record.author_id()
            );
        }
    }
}

fn run_validate(ctx: &Context, chain: &Chain) {
    let validation = chain.validate();
    if ctx.json {
        print_json(&validation);
    } else if validation.valid {
        println!("ledgerboard chain validate\n  Valid: {} records", chain.len());
    } else {
        println!("ledgerboard chain validate\n  Invalid");
        if let Some(at) = validation.broken_at {
            println!("  Broken at: #{at}");
        }
        if let Some(reason) = validation.reason {
            println!("  Reason: {reason}");
        }
    }
    if !validation.valid {
        std::process::exit(1);
    }
}

fn run_stats(ctx: &Context, chain: &Chain) {
    let stats = chain.stats();
    if ctx.json {
        print_json(&stats);
        return;
    }
    println!("ledgerboard chain stats");
    println!("  Records: {}", stats.total_records);
    println!("  Subjects: {}", stats.unique_subjects);
    println!(
        "  Latest: {}",
        canonical_timestamp(&stats.latest_timestamp)
    );
    for (action, count) in &stats.counts_by_action {
        println!("  {action}: {count}");
    }
}

fn run_show(ctx: &Context, chain: &Chain, subject: &str, as_of: Option<String>) {
    let history = chain.history(subject);
    let Some(first) = history.first() else {
        exit_with(format!("no records for subject: {subject}"));
    };
    let kind = first.subject_kind().to_string();
    let as_of = as_of
        .as_deref()
        .map(parse_instant_or_exit)
        .unwrap_or_else(Utc::now);
    let records = chain.replay(Some(subject), Some(as_of));

    let entity = match kind.as_str() {
        "Project" => fold_project(records).map(|e| to_value(e.as_ref())),
        "Card" => fold_card(records).map(|e| to_value(e.as_ref())),
        "Milestone" => fold_milestone(records).map(|e| to_value(e.as_ref())),
        other => exit_with(format!("subject {subject} is a {other}, not a board entity")),
    }
    .unwrap_or_else(|e| exit_with(format!("chain.show failed: {e}")));

    if ctx.json {
        print_json(&json!({
            "action": "chain.show",
            "subject": subject,
            "kind": kind,
            "asOf": canonical_timestamp(&as_of),
            "entity": entity,
        }));
    } else {
        println!("ledgerboard chain show {subject} @ {}", canonical_timestamp(&as_of));
        match entity {
            Value::Null => println!("  (does not exist at this time)"),
            value => {
                let text = serde_json::to_string_pretty(&value)
                    .unwrap_or_else(|e| exit_with(format!("failed to render json: {e}")));
                for line in text.lines() {
                    println!("  {line}");
                }
            }
        }
    }
}

fn to_value(entity: Option<&impl serde::Serialize>) -> Value {
    entity
        .map(|entity| serde_json::to_value(entity).unwrap_or(Value::Null))
        .unwrap_or(Value::Null)
}
