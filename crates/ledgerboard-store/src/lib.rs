//! # ledgerboard-store
//!
//! Current-state layer: generic in-memory stores with declared secondary
//! indices.
//!
//! This crate provides:
//! - the `Entity` contract (kind, declared indices, partial patches)
//! - `IndexedStore` (primary map + index buckets, tree traversal)
//! - JSONL snapshots for persisting store contents, stamped with the
//!   chain head they were taken at
//!
//! It holds no chain history. Snapshots only record the chain head they
//! were taken at; callers that need both keep them in step themselves.

pub mod entity;
pub mod error;
pub mod snapshot;
pub mod store;

pub use entity::{Entity, IndexOrder, IndexSpec};
pub use error::StoreError;
pub use snapshot::{
    Snapshot, encode_snapshot, parse_snapshot, read_snapshot_from_path, write_snapshot_to_path,
};
pub use store::IndexedStore;
