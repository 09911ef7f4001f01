//! HashRecord: one immutable, self-verifying chain entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::{canonical_timestamp, deserialize_canonical};
use crate::hash::ContentHash;

/// `previous_hash` of the genesis record.
pub const GENESIS_PREVIOUS_HASH: &str = "0";
/// Author id for records the chain writes on its own behalf.
pub const SYSTEM_AUTHOR: &str = "system";
pub const GENESIS_ACTION: &str = "GENESIS";
pub const GENESIS_SUBJECT_KIND: &str = "Chain";
pub const GENESIS_SUBJECT_ID: &str = "genesis";

/// A single hash-linked entry.
///
/// Fields are private: records are built by [`crate::Chain::append`] (or
/// decoded from persisted JSONL) and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashRecord {
    sequence_number: u64,
    #[serde(deserialize_with = "deserialize_canonical")]
    timestamp: DateTime<Utc>,
    action: String,
    subject_kind: String,
    subject_id: String,
    #[serde(default)]
    payload: Value,
    author_id: String,
    previous_hash: ContentHash,
    hash: ContentHash,
}

/// Field values of a record before its hash is computed.
pub(crate) struct RecordDraft {
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub subject_kind: String,
    pub subject_id: String,
    pub payload: Value,
    pub author_id: String,
    pub previous_hash: ContentHash,
}

impl HashRecord {
    pub(crate) fn seal(draft: RecordDraft) -> Self {
        let mut record = Self {
            sequence_number: draft.sequence_number,
            timestamp: draft.timestamp,
            action: draft.action,
            subject_kind: draft.subject_kind,
            subject_id: draft.subject_id,
            payload: draft.payload,
            author_id: draft.author_id,
            previous_hash: draft.previous_hash,
            hash: ContentHash(String::new()),
        };
        record.hash = record.compute_hash();
        record
    }

    pub(crate) fn genesis(timestamp: DateTime<Utc>) -> Self {
        Self::seal(RecordDraft {
            sequence_number: 0,
            timestamp,
            action: GENESIS_ACTION.to_string(),
            subject_kind: GENESIS_SUBJECT_KIND.to_string(),
            subject_id: GENESIS_SUBJECT_ID.to_string(),
            payload: Value::Object(serde_json::Map::new()),
            author_id: SYSTEM_AUTHOR.to_string(),
            previous_hash: ContentHash::from(GENESIS_PREVIOUS_HASH),
        })
    }

    /// Digest over every field except `hash`.
    pub fn compute_hash(&self) -> ContentHash {
        ContentHash::builder()
            .field_u64("sequence_number", self.sequence_number)
            .field("timestamp", &canonical_timestamp(&self.timestamp))
            .field("action", &self.action)
            .field("subject_kind", &self.subject_kind)
            .field("subject_id", &self.subject_id)
            .field_json("payload", &self.payload)
            .field("author_id", &self.author_id)
            .field("previous_hash", self.previous_hash.as_str())
            .finish()
    }

    /// Whether the stored hash matches the recomputed one.
    pub fn is_valid(&self) -> bool {
        self.compute_hash() == self.hash
    }

    pub fn is_genesis(&self) -> bool {
        self.sequence_number == 0 && self.previous_hash == *GENESIS_PREVIOUS_HASH
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn subject_kind(&self) -> &str {
        &self.subject_kind
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    pub fn previous_hash(&self) -> &ContentHash {
        &self.previous_hash
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }
}
