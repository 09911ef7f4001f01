use ledgerboard_chain::ChainError;

/// Errors raised by indexed store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("{kind} has no index named {index}")]
    UnknownIndex { kind: &'static str, index: String },

    #[error("snapshot line {line}: {message}")]
    Snapshot { line: usize, message: String },

    #[error("cannot encode snapshot entity: {0}")]
    Encode(String),

    #[error(transparent)]
    Persist(#[from] ChainError),
}
