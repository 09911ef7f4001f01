//! Error types for chain loading and persistence.

use std::io;
use std::path::PathBuf;

/// Errors from reading, writing or rebuilding a chain.
///
/// Integrity breaks are not errors: they are reported by
/// [`crate::Chain::validate`] as a [`crate::ChainValidation`].
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file cannot hold JSONL text at all.
    #[error("{}: {problem} at byte {offset}", path.display())]
    Substrate {
        path: PathBuf,
        offset: usize,
        problem: &'static str,
    },

    #[error("line {line}: malformed record: {message}")]
    Malformed { line: usize, message: String },

    /// The line decodes, but not to the bytes its record encodes to.
    #[error("line {line}: record #{sequence} is not in canonical form")]
    NonCanonical { line: usize, sequence: u64 },

    #[error("record #{sequence}: cannot encode: {message}")]
    Encode { sequence: u64, message: String },

    #[error("record #{sequence}: write failed: {source}")]
    Write {
        sequence: u64,
        #[source]
        source: io::Error,
    },

    #[error("chain has no genesis record")]
    MissingGenesis,
}
