use crate::config::Config;
use crate::support::{Context, exit_with, print_json, yes_no};
use ledgerboard_board::Board;
use serde_json::json;
use std::fs;
use tracing::info;

pub fn run(ctx: &Context) {
    let created_dir = !ctx.dir.exists();
    if created_dir {
        fs::create_dir_all(&ctx.dir).unwrap_or_else(|e| {
            exit_with(format!("failed to create {}: {e}", ctx.dir.display()))
        });
    }
    if !ctx.dir.is_dir() {
        exit_with(format!("not a directory: {}", ctx.dir.display()));
    }

    let config_path = Config::path(&ctx.dir);
    let created_config = !config_path.exists();
    if created_config {
        let body = ctx.config.to_toml().unwrap_or_else(|e| exit_with(e));
        fs::write(&config_path, body).unwrap_or_else(|e| {
            exit_with(format!("failed to write {}: {e}", config_path.display()))
        });
    }

    let chain_path = ctx.chain_path();
    let created_chain = !chain_path.exists();
    if created_chain {
        ctx.save_board_or_exit(&Board::new());
        info!(path = %chain_path.display(), "initialized chain");
    }

    if ctx.json {
        print_json(&json!({
            "action": "init",
            "dir": ctx.dir.display().to_string(),
            "chainPath": chain_path.display().to_string(),
            "createdDir": created_dir,
            "createdConfig": created_config,
            "createdChain": created_chain,
        }));
    } else {
        println!("ledgerboard init");
        println!("  Dir: {} (created: {})", ctx.dir.display(), yes_no(created_dir));
        println!(
            "  Config: {} (created: {})",
            config_path.display(),
            yes_no(created_config)
        );
        println!(
            "  Chain: {} (created: {})",
            chain_path.display(),
            yes_no(created_chain)
        );
    }
}
