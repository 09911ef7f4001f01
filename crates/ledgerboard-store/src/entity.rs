//! Entity contract: what a type declares to live in an [`crate::IndexedStore`].

use std::borrow::Cow;

/// How members of one index bucket are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrder {
    /// Set membership, iterated in id order.
    Unordered,
    /// Position order. The store assigns `0..n` positions and keeps them
    /// dense when members leave.
    Positional,
}

/// A declared secondary index: a foreign-key field name and its ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub order: IndexOrder,
}

impl IndexSpec {
    pub const fn unordered(name: &'static str) -> Self {
        Self {
            name,
            order: IndexOrder::Unordered,
        }
    }

    pub const fn positional(name: &'static str) -> Self {
        Self {
            name,
            order: IndexOrder::Positional,
        }
    }
}

/// A record owned by an indexed store.
///
/// `index_value` must return the current value of every index named in
/// `INDEXES`; `None` means the entity is in no bucket of that index.
/// Values may be computed (e.g. a composite key) rather than stored.
pub trait Entity: Clone {
    /// Partial update applied by [`crate::IndexedStore::update`].
    type Patch;

    /// Coarse type tag, e.g. `"Card"`.
    const KIND: &'static str;

    const INDEXES: &'static [IndexSpec];

    /// Index whose value is this entity's parent id, for tree-shaped kinds.
    const PARENT_INDEX: Option<&'static str> = None;

    fn id(&self) -> &str;

    fn index_value(&self, index: &str) -> Option<Cow<'_, str>>;

    /// Current position within a positional index.
    fn position(&self, _index: &str) -> usize {
        0
    }

    /// Called by the store when the entity's position in `index` changes.
    fn set_position(&mut self, _index: &str, _position: usize) {}

    fn apply_patch(&mut self, patch: Self::Patch);
}
