//! # ledgerboard-chain
//!
//! Append-only, hash-linked audit log.
//!
//! Every record stores the hash of its predecessor and a digest of its own
//! fields, so editing any historical record is detectable by
//! [`Chain::validate`]. This is tamper-evidence only: there are no
//! signatures and no distribution.
//!
//! ## Architecture
//!
//! ```text
//! ContentHash        ← SHA-256 over framed fields
//!     │
//! HashRecord         ← one immutable entry (action, subject, payload, links)
//!     │
//! Chain              ← ordered log + subject index, validate / replay / stats
//!     │
//! jsonl              ← one canonical line per record, atomic file replacement
//! ```

pub mod chain;
pub mod clock;
pub mod error;
pub mod hash;
pub mod jsonl;
pub mod record;

pub use chain::{Chain, ChainBreak, ChainHead, ChainStats, ChainValidation};
pub use clock::{Clock, ManualClock, SystemClock, canonical_instant, canonical_timestamp};
pub use error::ChainError;
pub use hash::{ContentHash, ContentHashBuilder};
pub use jsonl::{
    decode_line, encode_line, read_chain_from_path, read_records, substrate_text,
    write_atomically, write_chain_to_path, write_records,
};
pub use record::{
    GENESIS_ACTION, GENESIS_PREVIOUS_HASH, GENESIS_SUBJECT_ID, GENESIS_SUBJECT_KIND, HashRecord,
    SYSTEM_AUTHOR,
};
