use chrono::{DateTime, Utc};
use ledgerboard_board::{Board, BoardState};
use ledgerboard_chain::{
    Chain, ChainHead, SystemClock, read_chain_from_path, write_chain_to_path,
};
use ledgerboard_store::{IndexedStore, Snapshot, read_snapshot_from_path, write_snapshot_to_path};
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;

/// Resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub dir: PathBuf,
    pub config: Config,
    pub author: String,
    pub json: bool,
}

impl Context {
    pub fn new(dir: PathBuf, config: Config, author: Option<String>, json: bool) -> Self {
        let author = author.unwrap_or_else(|| config.author.clone());
        Self {
            dir,
            config,
            author,
            json,
        }
    }

    pub fn chain_path(&self) -> PathBuf {
        self.dir.join(&self.config.chain_file)
    }

    fn snapshot_paths(&self) -> [PathBuf; 3] {
        [
            self.dir.join(&self.config.projects_file),
            self.dir.join(&self.config.cards_file),
            self.dir.join(&self.config.milestones_file),
        ]
    }

    pub fn load_chain_or_exit(&self) -> Chain {
        let path = self.chain_path();
        if !path.exists() {
            exit_with(format!(
                "chain not found: {} (run `ledgerboard init` first)",
                path.display()
            ));
        }
        read_chain_from_path(&path, Arc::new(SystemClock))
            .unwrap_or_else(|e| exit_with(format!("failed to load {}: {e}", path.display())))
    }

    /// Chain plus snapshots.
    ///
    /// Snapshots are used only when all three were taken at the chain's
    /// current head; otherwise state is replayed from the chain.
    pub fn load_board_or_exit(&self) -> Board {
        let chain = self.load_chain_or_exit();
        let head = chain.head();
        let [projects, cards, milestones] = self.snapshot_paths();
        let snapshots = (
            load_snapshot_at(&projects, &head),
            load_snapshot_at(&cards, &head),
            load_snapshot_at(&milestones, &head),
        );
        let (Some(projects), Some(cards), Some(milestones)) = snapshots else {
            warn!(
                dir = %self.dir.display(),
                head = head.sequence_number,
                "snapshots missing or stale, replaying chain"
            );
            return Board::from_chain(chain)
                .unwrap_or_else(|e| exit_with(format!("failed to replay chain: {e}")));
        };

        let state = BoardState::from_stores(
            IndexedStore::from_entities(projects),
            IndexedStore::from_entities(cards),
            IndexedStore::from_entities(milestones),
        );
        debug!(records = chain.len(), "board loaded from snapshots");
        Board::from_parts(chain, state)
    }

    pub fn save_board_or_exit(&self, board: &Board) {
        let chain_path = self.chain_path();
        write_chain_to_path(&chain_path, board.chain())
            .unwrap_or_else(|e| exit_with(format!("failed to save {}: {e}", chain_path.display())));

        let head = board.chain().head();
        let [projects, cards, milestones] = self.snapshot_paths();
        let state = board.state();
        save_snapshot_or_exit(&projects, &head, state.projects().iter());
        save_snapshot_or_exit(&cards, &head, state.cards().iter());
        save_snapshot_or_exit(&milestones, &head, state.milestones().iter());
    }
}

/// The snapshot's entities, if it exists and was taken at `head`.
fn load_snapshot_at<E: serde::de::DeserializeOwned>(
    path: &Path,
    head: &ChainHead,
) -> Option<Vec<E>> {
    if !path.exists() {
        return None;
    }
    let snapshot: Snapshot<E> = read_snapshot_from_path(path)
        .unwrap_or_else(|e| exit_with(format!("failed to load {}: {e}", path.display())));
    if !snapshot.is_at(head) {
        debug!(path = %path.display(), saved = ?snapshot.head, "stale snapshot");
        return None;
    }
    Some(snapshot.entities)
}

fn save_snapshot_or_exit<'a, E: Serialize + 'a>(
    path: &Path,
    head: &ChainHead,
    entities: impl Iterator<Item = &'a E>,
) {
    write_snapshot_to_path(path, Some(head), entities)
        .unwrap_or_else(|e| exit_with(format!("failed to save {}: {e}", path.display())));
}

pub fn exit_with(message: impl Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => exit_with(format!("failed to render json: {e}")),
    }
}

pub fn parse_instant_or_exit(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc))
        .unwrap_or_else(|e| exit_with(format!("invalid timestamp `{raw}`: {e}")))
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
