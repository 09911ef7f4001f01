use ledgerboard_store::StoreError;

/// Errors raised by board operations.
///
/// Every variant except `Store` and `Encode` is detected before the board
/// mutates anything.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("subject id already in use: {0}")]
    SubjectTaken(String),

    #[error("{kind} {id}: cannot {action} from {from}")]
    InvalidTransition {
        kind: &'static str,
        id: String,
        from: String,
        action: &'static str,
    },

    #[error("card {0} still has child cards")]
    HasChildren(String),

    #[error("{kind} {id} belongs to project {actual}, expected {expected}")]
    CrossProject {
        kind: &'static str,
        id: String,
        expected: String,
        actual: String,
    },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("record {sequence}: cannot decode board event: {message}")]
    Decode { sequence: u64, message: String },

    #[error("cannot encode board event: {0}")]
    Encode(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("board lock poisoned")]
    Poisoned,
}
