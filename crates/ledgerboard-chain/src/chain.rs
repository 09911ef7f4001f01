//! Chain: the ordered, append-only record log and its subject index.
//!
//! ```text
//! genesis ── r1 ── r2 ── r3 ...        (records, by sequence number)
//!             │           │
//!   subjects: "card-1" → [1, 3]        (positions into records)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock, canonical_instant};
use crate::error::ChainError;
use crate::hash::ContentHash;
use crate::record::{HashRecord, RecordDraft};

/// Why a chain failed validation at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainBreak {
    /// The record's stored hash does not match its fields.
    HashMismatch,
    /// `previous_hash` does not equal the preceding record's hash.
    BrokenLink,
    /// `sequence_number` does not equal the record's position.
    SequenceGap,
}

impl ChainBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainBreak::HashMismatch => "hash_mismatch",
            ChainBreak::BrokenLink => "broken_link",
            ChainBreak::SequenceGap => "sequence_gap",
        }
    }
}

impl fmt::Display for ChainBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`Chain::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broken_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ChainBreak>,
}

impl ChainValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            broken_at: None,
            reason: None,
        }
    }

    fn broken(at: u64, reason: ChainBreak) -> Self {
        Self {
            valid: false,
            broken_at: Some(at),
            reason: Some(reason),
        }
    }
}

/// Aggregate view over the whole log, recomputed on each call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStats {
    pub total_records: usize,
    pub unique_subjects: usize,
    pub counts_by_action: BTreeMap<String, usize>,
    pub counts_by_author: BTreeMap<String, usize>,
    pub latest_timestamp: DateTime<Utc>,
}

/// Position and hash of a chain's latest record.
///
/// Anything derived from a chain can carry the head it was derived at and
/// be recognised as stale once the chain moves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    pub sequence_number: u64,
    pub hash: ContentHash,
}

/// Append-only sequence of [`HashRecord`]s, seeded with a genesis record.
pub struct Chain {
    records: Vec<HashRecord>,
    subjects: HashMap<String, Vec<usize>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("len", &self.records.len())
            .field("subjects", &self.subjects.len())
            .finish()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// A fresh chain stamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// A fresh chain whose records are stamped by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let genesis = HashRecord::genesis(canonical_instant(clock.now()));
        let mut chain = Self {
            records: Vec::new(),
            subjects: HashMap::new(),
            clock,
        };
        chain.push(genesis);
        chain
    }

    /// Rebuild a chain from persisted records.
    ///
    /// Records are taken as-is; call [`Chain::validate`] to check them.
    pub fn from_records(
        records: Vec<HashRecord>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ChainError> {
        if records.is_empty() {
            return Err(ChainError::MissingGenesis);
        }
        let mut chain = Self {
            records: Vec::with_capacity(records.len()),
            subjects: HashMap::new(),
            clock,
        };
        for record in records {
            chain.push(record);
        }
        Ok(chain)
    }

    fn push(&mut self, record: HashRecord) {
        let position = self.records.len();
        self.subjects
            .entry(record.subject_id().to_string())
            .or_default()
            .push(position);
        self.records.push(record);
    }

    /// Append one record and return it.
    ///
    /// The payload is not inspected. The timestamp never precedes the
    /// latest record's, even if the clock steps backwards.
    pub fn append(
        &mut self,
        action: impl Into<String>,
        subject_kind: impl Into<String>,
        subject_id: impl Into<String>,
        payload: Value,
        author_id: impl Into<String>,
    ) -> &HashRecord {
        let timestamp = self.next_timestamp();
        let latest = self.latest();
        let record = HashRecord::seal(RecordDraft {
            sequence_number: self.records.len() as u64,
            timestamp,
            action: action.into(),
            subject_kind: subject_kind.into(),
            subject_id: subject_id.into(),
            payload,
            author_id: author_id.into(),
            previous_hash: latest.hash().clone(),
        });
        debug!(
            seq = record.sequence_number(),
            action = record.action(),
            subject = record.subject_id(),
            "chain append"
        );
        self.push(record);
        &self.records[self.records.len() - 1]
    }

    /// The timestamp the next appended record would carry.
    pub fn next_timestamp(&self) -> DateTime<Utc> {
        canonical_instant(self.clock.now()).max(self.latest().timestamp())
    }

    /// The most recently appended record (genesis on a fresh chain).
    pub fn head(&self) -> ChainHead {
        let latest = self.latest();
        ChainHead {
            sequence_number: latest.sequence_number(),
            hash: latest.hash().clone(),
        }
    }

    pub fn latest(&self) -> &HashRecord {
        // `records` always holds at least the genesis record.
        &self.records[self.records.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false: a chain holds at least its genesis record.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[HashRecord] {
        &self.records
    }

    pub fn get(&self, sequence_number: u64) -> Option<&HashRecord> {
        usize::try_from(sequence_number)
            .ok()
            .and_then(|position| self.records.get(position))
    }

    /// All records for `subject_id`, in append order.
    pub fn history(&self, subject_id: &str) -> Vec<&HashRecord> {
        self.subjects
            .get(subject_id)
            .map(|positions| positions.iter().map(|&p| &self.records[p]).collect())
            .unwrap_or_default()
    }

    /// Walk the log from record 1 and report the first break.
    ///
    /// Genesis is not checked.
    pub fn validate(&self) -> ChainValidation {
        for (position, pair) in self.records.windows(2).enumerate() {
            let (previous, record) = (&pair[0], &pair[1]);
            let at = (position + 1) as u64;

            let reason = if !record.is_valid() {
                Some(ChainBreak::HashMismatch)
            } else if record.previous_hash() != previous.hash() {
                Some(ChainBreak::BrokenLink)
            } else if record.sequence_number() != at {
                Some(ChainBreak::SequenceGap)
            } else {
                None
            };

            if let Some(reason) = reason {
                warn!(broken_at = at, %reason, "chain validation failed");
                return ChainValidation::broken(at, reason);
            }
        }
        ChainValidation::ok()
    }

    /// Records for one subject (or the whole log) up to `up_to`, inclusive.
    ///
    /// Callers fold the result left to right to rebuild a point-in-time view.
    pub fn replay(
        &self,
        subject_id: Option<&str>,
        up_to: Option<DateTime<Utc>>,
    ) -> Vec<&HashRecord> {
        let records: Vec<&HashRecord> = match subject_id {
            Some(subject) => self.history(subject),
            None => self.records.iter().collect(),
        };
        match up_to {
            Some(limit) => records
                .into_iter()
                .filter(|record| record.timestamp() <= limit)
                .collect(),
            None => records,
        }
    }

    pub fn stats(&self) -> ChainStats {
        let mut counts_by_action = BTreeMap::new();
        let mut counts_by_author = BTreeMap::new();
        for record in &self.records {
            *counts_by_action
                .entry(record.action().to_string())
                .or_insert(0) += 1;
            *counts_by_author
                .entry(record.author_id().to_string())
                .or_insert(0) += 1;
        }
        ChainStats {
            total_records: self.records.len(),
            unique_subjects: self.subjects.len(),
            counts_by_action,
            counts_by_author,
            latest_timestamp: self.latest().timestamp(),
        }
    }
}
