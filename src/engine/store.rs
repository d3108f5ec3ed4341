// SYNOID Quantum Bounded State Store
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Sole owner of a subsystem's entities. Every write goes through a
// clamp, so attribute values never leave their declared bounds.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, info};

use crate::engine::entity::{Attribute, Bound, Entity, EntityKind};
use crate::error::{StateError, StateResult};

/// What `create` does once the store has reached its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Refuse new entities when full.
    #[default]
    None,
    /// Drop the oldest-inserted entity to make room.
    Fifo,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of entities; `None` means unbounded.
    pub capacity: Option<usize>,
    pub eviction: EvictionPolicy,
}

/// Owned copy of a store's entities, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot<K> {
    pub entities: Vec<Entity<K>>,
}

impl<K: EntityKind> StoreSnapshot<K> {
    pub fn get(&self, id: &str) -> Option<&Entity<K>> {
        self.entities.iter().find(|e| e.id == id)
    }
}

#[derive(Debug, Clone)]
pub struct BoundedStateStore<K> {
    entities: HashMap<String, Entity<K>>,
    order: VecDeque<String>,
    config: StoreConfig,
}

impl<K: EntityKind> Default for BoundedStateStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityKind> BoundedStateStore<K> {
    /// Unbounded store with no eviction.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            entities: HashMap::new(),
            order: VecDeque::new(),
            config,
        }
    }

    pub fn config(&self) -> StoreConfig {
        self.config
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

    fn is_full(&self) -> bool {
        self.config
            .capacity
            .map(|cap| self.entities.len() >= cap)
            .unwrap_or(false)
    }

    /// Insert a new entity. A full store either rejects the insert or
    /// evicts, depending on its [`EvictionPolicy`].
    pub fn create(
        &mut self,
        id: &str,
        kind: K,
        initial: BTreeMap<String, Attribute>,
    ) -> StateResult<&Entity<K>> {
        if self.contains(id) {
            return Err(StateError::DuplicateEntity(id.to_string()));
        }
        if self.is_full() {
            match self.config.eviction {
                EvictionPolicy::Fifo => {
                    self.make_room()?;
                }
                EvictionPolicy::None => return Err(self.store_full()),
            }
        }
        Ok(self.insert(id, kind, initial))
    }

    /// Insert a new entity, dropping the oldest one first if the store is
    /// at capacity. Returns the id of the evicted entity, if any.
    pub fn create_with_eviction(
        &mut self,
        id: &str,
        kind: K,
        initial: BTreeMap<String, Attribute>,
    ) -> StateResult<Option<String>> {
        if self.contains(id) {
            return Err(StateError::DuplicateEntity(id.to_string()));
        }
        let evicted = if self.is_full() { self.make_room()? } else { None };
        self.insert(id, kind, initial);
        Ok(evicted)
    }

    /// Evict the oldest entity; fails when that still leaves no space,
    /// which only a zero-capacity store can hit.
    fn make_room(&mut self) -> StateResult<Option<String>> {
        let evicted = self.evict_oldest();
        if self.is_full() {
            return Err(self.store_full());
        }
        Ok(evicted)
    }

    fn store_full(&self) -> StateError {
        StateError::StoreFull {
            capacity: self.config.capacity.unwrap_or_default(),
        }
    }

    fn insert(&mut self, id: &str, kind: K, initial: BTreeMap<String, Attribute>) -> &Entity<K> {
        debug!(
            "[STORE] Created '{}' ({}) with {} attributes",
            id,
            kind.label(),
            initial.len()
        );
        self.order.push_back(id.to_string());
        self.entities
            .entry(id.to_string())
            .or_insert_with(|| Entity::new(id, kind, initial))
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let oldest = self.order.pop_front()?;
        self.entities.remove(&oldest);
        info!(
            "[STORE] ♻️ Capacity {:?} reached, evicted oldest entity '{}'",
            self.config.capacity, oldest
        );
        Some(oldest)
    }

    pub fn get(&self, id: &str) -> StateResult<&Entity<K>> {
        self.entities
            .get(id)
            .ok_or_else(|| StateError::UnknownEntity(id.to_string()))
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> StateResult<&mut Entity<K>> {
        self.entities
            .get_mut(id)
            .ok_or_else(|| StateError::UnknownEntity(id.to_string()))
    }

    /// Store `value` clamped into the attribute's bound and return what was
    /// kept. Unknown attributes are created on first reference with the
    /// unit bound.
    pub fn set_attribute(&mut self, id: &str, attribute: &str, value: f64) -> StateResult<f64> {
        if !value.is_finite() {
            return Err(StateError::invalid(attribute, "value must be finite"));
        }
        let entity = self.get_mut(id)?;
        let kept = entity
            .attributes
            .entry(attribute.to_string())
            .or_insert_with(|| Attribute::new(Bound::UNIT.lower(), Bound::UNIT, false))
            .set(value);
        Ok(kept)
    }

    /// Iterate entities in insertion order. The borrow keeps the store
    /// frozen for the duration, and calling again restarts from the front.
    pub fn all(&self) -> impl Iterator<Item = &Entity<K>> + '_ {
        self.order.iter().filter_map(move |id| self.entities.get(id))
    }

    /// Visit every entity mutably, in insertion order.
    pub(crate) fn for_each_mut<F: FnMut(&mut Entity<K>)>(&mut self, mut f: F) {
        for id in &self.order {
            if let Some(entity) = self.entities.get_mut(id) {
                f(entity);
            }
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }

    pub fn snapshot(&self) -> StoreSnapshot<K> {
        StoreSnapshot {
            entities: self.all().cloned().collect(),
        }
    }
}
