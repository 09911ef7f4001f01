//! JSONL snapshots of store contents, one entity per line.
//!
//! A snapshot may open with a header naming the chain head it was taken
//! at:
//!
//! ```text
//! {"chain_head":{"sequence_number":7,"hash":"9f2c..."}}
//! {"id":"card-1","project_id":"project-1",...}
//! ```
//!
//! A reader holding the chain compares heads and treats a snapshot taken
//! at any other head as stale.

use std::fs;
use std::path::Path;

use ledgerboard_chain::{ChainError, ChainHead, substrate_text, write_atomically};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Header {
    chain_head: ChainHead,
}

/// Entities read back from a snapshot, with the head it was taken at.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<E> {
    pub head: Option<ChainHead>,
    pub entities: Vec<E>,
}

impl<E> Snapshot<E> {
    /// Whether the snapshot was taken at exactly `head`.
    pub fn is_at(&self, head: &ChainHead) -> bool {
        self.head.as_ref() == Some(head)
    }
}

/// Parse snapshot text. Blank lines are skipped.
pub fn parse_snapshot<E: DeserializeOwned>(text: &str) -> Result<Snapshot<E>, StoreError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .peekable();
    let head = lines
        .peek()
        .and_then(|(_, first)| serde_json::from_str::<Header>(first).ok())
        .map(|header| header.chain_head);
    if head.is_some() {
        lines.next();
    }

    let entities = lines
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| StoreError::Snapshot {
                line: index + 1,
                message: e.to_string(),
            })
        })
        .collect::<Result<Vec<E>, StoreError>>()?;
    Ok(Snapshot { head, entities })
}

pub fn read_snapshot_from_path<E: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<Snapshot<E>, StoreError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| ChainError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_snapshot(substrate_text(path, &bytes)?)
}

/// Encode a snapshot, header first when `head` is given.
pub fn encode_snapshot<'a, E: Serialize + 'a>(
    head: Option<&ChainHead>,
    entities: impl IntoIterator<Item = &'a E>,
) -> Result<String, StoreError> {
    let mut text = String::new();
    if let Some(head) = head {
        let header = Header {
            chain_head: head.clone(),
        };
        push_line(&mut text, &header)?;
    }
    for entity in entities {
        push_line(&mut text, entity)?;
    }
    Ok(text)
}

/// Write a snapshot, replacing the file atomically.
pub fn write_snapshot_to_path<'a, E: Serialize + 'a>(
    path: impl AsRef<Path>,
    head: Option<&ChainHead>,
    entities: impl IntoIterator<Item = &'a E>,
) -> Result<(), StoreError> {
    let path = path.as_ref();
    let text = encode_snapshot(head, entities)?;
    write_atomically(path, |writer| {
        writer
            .write_all(text.as_bytes())
            .map_err(|source| ChainError::Io {
                path: path.to_path_buf(),
                source,
            })
    })?;
    Ok(())
}

fn push_line(text: &mut String, value: &impl Serialize) -> Result<(), StoreError> {
    let line = serde_json::to_string(value).map_err(|e| StoreError::Encode(e.to_string()))?;
    text.push_str(&line);
    text.push('\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerboard_chain::ContentHash;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: String,
        n: u32,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                id: "a".to_string(),
                n: 1,
            },
            Row {
                id: "b".to_string(),
                n: 2,
            },
        ]
    }

    fn head(sequence_number: u64) -> ChainHead {
        ChainHead {
            sequence_number,
            hash: ContentHash::from("5e1f"),
        }
    }

    #[test]
    fn snapshot_roundtrip_keeps_its_head() {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "ledgerboard-snapshot-{}-{unique}.jsonl",
            std::process::id()
        ));
        write_snapshot_to_path(&path, Some(&head(4)), &rows()).expect("snapshot should write");

        let parsed: Snapshot<Row> = read_snapshot_from_path(&path).expect("snapshot should read");
        assert_eq!(parsed.entities, rows());
        assert!(parsed.is_at(&head(4)));
        assert!(!parsed.is_at(&head(5)));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn headerless_snapshot_is_at_no_head() {
        let text = encode_snapshot(None, &rows()).expect("encode");
        let parsed: Snapshot<Row> = parse_snapshot(&text).expect("parse");
        assert_eq!(parsed.head, None);
        assert_eq!(parsed.entities.len(), 2);
        assert!(!parsed.is_at(&head(0)));
    }

    #[test]
    fn parse_errors_carry_line_numbers() {
        let text = format!(
            "{}{{\"id\":\"a\",\"n\":1}}\nnope\n",
            encode_snapshot::<Row>(Some(&head(1)), []).expect("encode")
        );
        let err = parse_snapshot::<Row>(&text).expect_err("must fail");
        assert!(matches!(err, StoreError::Snapshot { line: 3, .. }), "{err}");
    }
}
