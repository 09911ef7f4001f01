//! Ledgerboard CLI: the `ledgerboard` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use std::path::PathBuf;
use support::Context;
use tracing_subscriber::EnvFilter;

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let dir = PathBuf::from(&cli.dir);
    let config = Config::load(&dir).unwrap_or_else(|e| support::exit_with(e));
    init_tracing(&config.log_filter);
    let ctx = Context::new(dir, config, cli.author, cli.json);

    match cli.command {
        Commands::Init => commands::init::run(&ctx),
        Commands::Project { command } => commands::project::run(&ctx, command),
        Commands::Card { command } => commands::card::run(&ctx, command),
        Commands::Milestone { command } => commands::milestone::run(&ctx, command),
        Commands::Chain { command } => commands::chain::run(&ctx, command),
    }
}
