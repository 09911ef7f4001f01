//! IndexedStore: primary map plus declared secondary indices.
//!
//! Every mutation updates the primary map and every index bucket the
//! entity belongs to before returning, so `find_by_index` never sees a
//! stale or missing member.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::entity::{Entity, IndexOrder, IndexSpec};
use crate::error::StoreError;
use crate::snapshot::{read_snapshot_from_path, write_snapshot_to_path};

#[derive(Debug, Clone)]
enum Bucket {
    Ordered(Vec<String>),
    Unordered(BTreeSet<String>),
}

impl Bucket {
    fn new(order: IndexOrder) -> Self {
        match order {
            IndexOrder::Positional => Bucket::Ordered(Vec::new()),
            IndexOrder::Unordered => Bucket::Unordered(BTreeSet::new()),
        }
    }

    fn ids(&self) -> Vec<&str> {
        match self {
            Bucket::Ordered(list) => list.iter().map(String::as_str).collect(),
            Bucket::Unordered(set) => set.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct Index {
    spec: IndexSpec,
    buckets: HashMap<String, Bucket>,
}

impl Index {
    fn new(spec: IndexSpec) -> Self {
        Self {
            spec,
            buckets: HashMap::new(),
        }
    }

    fn link<E: Entity>(&mut self, entities: &mut BTreeMap<String, E>, id: &str, value: &str) {
        let IndexSpec { name, order } = self.spec;
        let bucket = self
            .buckets
            .entry(value.to_string())
            .or_insert_with(|| Bucket::new(order));
        match bucket {
            Bucket::Unordered(set) => {
                set.insert(id.to_string());
            }
            Bucket::Ordered(list) => {
                let position = list.len();
                list.push(id.to_string());
                if let Some(entity) = entities.get_mut(id) {
                    entity.set_position(name, position);
                }
            }
        }
    }

    fn unlink<E: Entity>(&mut self, entities: &mut BTreeMap<String, E>, id: &str, value: &str) {
        let name = self.spec.name;
        let Some(bucket) = self.buckets.get_mut(value) else {
            return;
        };
        let empty = match bucket {
            Bucket::Unordered(set) => {
                set.remove(id);
                set.is_empty()
            }
            Bucket::Ordered(list) => {
                if let Some(at) = list.iter().position(|member| member == id) {
                    list.remove(at);
                    for (position, member) in list.iter().enumerate().skip(at) {
                        if let Some(entity) = entities.get_mut(member) {
                            entity.set_position(name, position);
                        }
                    }
                }
                list.is_empty()
            }
        };
        if empty {
            self.buckets.remove(value);
        }
    }
}

fn index_values<E: Entity>(entity: &E) -> Vec<Option<String>> {
    E::INDEXES
        .iter()
        .map(|spec| entity.index_value(spec.name).map(Cow::into_owned))
        .collect()
}

/// In-memory keyed store with O(1) point lookups and bucketed filters.
#[derive(Debug, Clone)]
pub struct IndexedStore<E: Entity> {
    entities: BTreeMap<String, E>,
    indices: Vec<Index>,
}

impl<E: Entity> Default for IndexedStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> IndexedStore<E> {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            indices: E::INDEXES.iter().copied().map(Index::new).collect(),
        }
    }

    /// Build a store from fully-materialized entities.
    ///
    /// Duplicate ids resolve last-write-wins. Positional buckets are
    /// ordered by each entity's stored position, then renumbered densely.
    pub fn from_entities(entities: impl IntoIterator<Item = E>) -> Self {
        let mut store = Self::new();
        for entity in entities {
            store.entities.insert(entity.id().to_string(), entity);
        }

        for (slot, spec) in E::INDEXES.iter().enumerate() {
            let mut grouped: BTreeMap<String, Vec<(usize, String)>> = BTreeMap::new();
            for entity in store.entities.values() {
                if let Some(value) = entity.index_value(spec.name) {
                    grouped
                        .entry(value.into_owned())
                        .or_default()
                        .push((entity.position(spec.name), entity.id().to_string()));
                }
            }
            for (value, mut members) in grouped {
                members.sort();
                for (_, id) in members {
                    store.indices[slot].link(&mut store.entities, &id, &value);
                }
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Iterate all entities in deterministic id order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entities.values()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&E> {
        self.entities.get(id)
    }

    /// First free id of the form `{prefix}-{n}`, counting from 1.
    pub fn next_id(&self, prefix: &str) -> String {
        let mut seq = self.entities.len() + 1;
        loop {
            let candidate = format!("{prefix}-{seq}");
            if !self.entities.contains_key(&candidate) {
                return candidate;
            }
            seq += 1;
        }
    }

    fn not_found(id: &str) -> StoreError {
        StoreError::NotFound {
            kind: E::KIND,
            id: id.to_string(),
        }
    }

    /// Insert a new entity and add it to every index it has a value for.
    ///
    /// Positional indices place it at the end of its bucket.
    pub fn create(&mut self, entity: E) -> Result<&E, StoreError> {
        let id = entity.id().to_string();
        if self.entities.contains_key(&id) {
            return Err(StoreError::AlreadyExists { kind: E::KIND, id });
        }

        let values = index_values(&entity);
        self.entities.insert(id.clone(), entity);
        for (slot, value) in values.into_iter().enumerate() {
            if let Some(value) = value {
                self.indices[slot].link(&mut self.entities, &id, &value);
            }
        }
        debug!(kind = E::KIND, id = %id, "store create");
        Ok(&self.entities[&id])
    }

    /// Apply `patch` and move the entity between buckets of any index
    /// whose value changed.
    pub fn update(&mut self, id: &str, patch: E::Patch) -> Result<&E, StoreError> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or_else(|| Self::not_found(id))?;
        let before = index_values(entity);
        entity.apply_patch(patch);
        let after = index_values(entity);

        for (slot, (old, new)) in before.iter().zip(after.iter()).enumerate() {
            if old == new {
                continue;
            }
            if let Some(old) = old {
                self.indices[slot].unlink(&mut self.entities, id, old);
            }
            if let Some(new) = new {
                self.indices[slot].link(&mut self.entities, id, new);
            }
            debug!(
                kind = E::KIND,
                id,
                index = self.indices[slot].spec.name,
                from = old.as_deref().unwrap_or(""),
                to = new.as_deref().unwrap_or(""),
                "store index move"
            );
        }
        Ok(&self.entities[id])
    }

    /// Remove an entity from the primary map and every index bucket.
    pub fn delete(&mut self, id: &str) -> Result<E, StoreError> {
        let values = index_values(
            self.entities
                .get(id)
                .ok_or_else(|| Self::not_found(id))?,
        );
        for (slot, value) in values.iter().enumerate() {
            if let Some(value) = value {
                self.indices[slot].unlink(&mut self.entities, id, value);
            }
        }
        debug!(kind = E::KIND, id, "store delete");
        self.entities.remove(id).ok_or_else(|| Self::not_found(id))
    }

    fn slot(&self, index: &str) -> Result<usize, StoreError> {
        self.indices
            .iter()
            .position(|i| i.spec.name == index)
            .ok_or_else(|| StoreError::UnknownIndex {
                kind: E::KIND,
                index: index.to_string(),
            })
    }

    /// Members of one bucket.
    ///
    /// Positional indices return members in position order; unordered
    /// indices return them in id order.
    pub fn find_by_index(&self, index: &str, value: &str) -> Result<Vec<&E>, StoreError> {
        let slot = self.slot(index)?;
        let Some(bucket) = self.indices[slot].buckets.get(value) else {
            return Ok(Vec::new());
        };
        Ok(bucket
            .ids()
            .into_iter()
            .filter_map(|id| self.entities.get(id))
            .collect())
    }

    /// Direct children through `E::PARENT_INDEX`.
    pub fn find_children(&self, parent_id: &str) -> Vec<&E> {
        match E::PARENT_INDEX {
            Some(index) => self.find_by_index(index, parent_id).unwrap_or_else(|e| {
                warn!(kind = E::KIND, error = %e, "parent index is not declared");
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    /// Every entity below `root_id`, found with an explicit stack.
    ///
    /// Order is depth-first but otherwise unspecified. Each entity
    /// appears once.
    pub fn find_all_descendants(&self, root_id: &str) -> Vec<&E> {
        let mut descendants = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(root_id);
        let mut stack = vec![root_id];

        while let Some(parent) = stack.pop() {
            for child in self.find_children(parent) {
                if seen.insert(child.id()) {
                    stack.push(child.id());
                    descendants.push(child);
                }
            }
        }
        descendants
    }
}

impl<E: Entity + DeserializeOwned> IndexedStore<E> {
    /// Load store state from a JSONL snapshot.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let snapshot = read_snapshot_from_path(path)?;
        Ok(Self::from_entities(snapshot.entities))
    }
}

impl<E: Entity + Serialize> IndexedStore<E> {
    /// Persist store state to a JSONL snapshot.
    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        write_snapshot_to_path(path, None, self.entities.values())
    }
}
