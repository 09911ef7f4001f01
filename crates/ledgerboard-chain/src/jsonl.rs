//! JSONL storage: one canonical line per chain record.
//!
//! A stored line must be exactly the bytes its record encodes to. Reading
//! decodes each line, re-encodes the record and compares, so an edit that
//! survives decoding but changes the encoding (whitespace, escapes, field
//! order, sub-microsecond timestamps) is reported with its line number
//! instead of being silently normalised.

use crate::chain::Chain;
use crate::clock::Clock;
use crate::error::ChainError;
use crate::record::HashRecord;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// The line `record` is stored as, without the trailing newline.
pub fn encode_line(record: &HashRecord) -> Result<String, ChainError> {
    serde_json::to_string(record).map_err(|e| ChainError::Encode {
        sequence: record.sequence_number(),
        message: e.to_string(),
    })
}

/// Decode one stored line. `line` is 1-based and only used in errors.
pub fn decode_line(line: usize, text: &str) -> Result<HashRecord, ChainError> {
    let record: HashRecord = serde_json::from_str(text).map_err(|e| ChainError::Malformed {
        line,
        message: e.to_string(),
    })?;
    if encode_line(&record)? != text {
        return Err(ChainError::NonCanonical {
            line,
            sequence: record.sequence_number(),
        });
    }
    Ok(record)
}

/// Parse every record in `text`. Blank lines are skipped.
pub fn read_records(text: &str) -> Result<Vec<HashRecord>, ChainError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| decode_line(index + 1, line))
        .collect()
}

pub fn write_records<'a>(
    writer: &mut dyn Write,
    records: impl IntoIterator<Item = &'a HashRecord>,
) -> Result<(), ChainError> {
    for record in records {
        let line = encode_line(record)?;
        writeln!(writer, "{line}").map_err(|source| ChainError::Write {
            sequence: record.sequence_number(),
            source,
        })?;
    }
    Ok(())
}

pub fn read_chain_from_path(
    path: impl AsRef<Path>,
    clock: Arc<dyn Clock>,
) -> Result<Chain, ChainError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(io_error(path))?;
    let records = read_records(substrate_text(path, &bytes)?)?;
    Chain::from_records(records, clock)
}

/// Persist a chain, replacing the file atomically.
pub fn write_chain_to_path(path: impl AsRef<Path>, chain: &Chain) -> Result<(), ChainError> {
    write_atomically(path.as_ref(), |writer| {
        write_records(writer, chain.records())
    })
}

/// Check that `bytes` can hold JSONL text and view them as `&str`.
///
/// NUL bytes and invalid UTF-8 are reported with the offset of the first
/// offending byte.
pub fn substrate_text<'a>(path: &Path, bytes: &'a [u8]) -> Result<&'a str, ChainError> {
    if let Some(offset) = bytes.iter().position(|&byte| byte == 0) {
        return Err(ChainError::Substrate {
            path: path.to_path_buf(),
            offset,
            problem: "NUL byte",
        });
    }
    std::str::from_utf8(bytes).map_err(|e| ChainError::Substrate {
        path: path.to_path_buf(),
        offset: e.valid_up_to(),
        problem: "invalid UTF-8",
    })
}

/// Replace `path` with what `body` writes.
///
/// The content is staged in a sibling file and fsynced, then renamed over
/// `path`, then the directory is fsynced. A failed write leaves `path`
/// untouched and removes the staged file.
pub fn write_atomically(
    path: &Path,
    body: impl FnOnce(&mut dyn Write) -> Result<(), ChainError>,
) -> Result<(), ChainError> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(io_error(dir))?;

    let staged = staging_path(path);
    let outcome = stage(&staged, body)
        .and_then(|()| fs::rename(&staged, path).map_err(io_error(path)));
    if outcome.is_err() {
        let _ = fs::remove_file(&staged);
    }
    outcome?;

    File::open(dir)
        .and_then(|handle| handle.sync_all())
        .map_err(io_error(dir))
}

fn stage(
    staged: &Path,
    body: impl FnOnce(&mut dyn Write) -> Result<(), ChainError>,
) -> Result<(), ChainError> {
    let mut writer = BufWriter::new(File::create(staged).map_err(io_error(staged))?);
    body(&mut writer)?;
    let file = writer
        .into_inner()
        .map_err(|e| io_error(staged)(e.into_error()))?;
    file.sync_all().map_err(io_error(staged))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

static STAGED_WRITES: AtomicU64 = AtomicU64::new(0);

/// `dir/.name.<pid>-<n>.staged`, unique within the process.
fn staging_path(path: &Path) -> PathBuf {
    let n = STAGED_WRITES.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}-{n}.staged", std::process::id()))
}

fn io_error(path: &Path) -> impl Fn(io::Error) -> ChainError + '_ {
    move |source| ChainError::Io {
        path: path.to_path_buf(),
        source,
    }
}
