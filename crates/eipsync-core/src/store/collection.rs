// ── Entity collections ──
//
// One loader pass fills a collection; the reconciliation engine then
// borrows it read-only. Keyed by natural key, insertion-ordered so diff
// output follows load order.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::warn;

use crate::model::{Address, Prefix, PrefixKey, SyncModel};

/// All entities of one type from one side of a sync, indexed by key.
#[derive(Debug, Clone)]
pub struct EntityCollection<T: SyncModel> {
    by_key: IndexMap<T::Key, T>,
    duplicates: usize,
}

impl<T: SyncModel> Default for EntityCollection<T> {
    fn default() -> Self {
        Self {
            by_key: IndexMap::new(),
            duplicates: 0,
        }
    }
}

impl<T: SyncModel> EntityCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity. The first occurrence of a key wins; later ones are
    /// dropped with a warning. Returns `true` if the key was new.
    pub fn insert(&mut self, entity: T) -> bool {
        let key = entity.key();
        if self.by_key.contains_key(&key) {
            warn!(kind = %T::KIND, key = %key, "duplicate record dropped");
            self.duplicates += 1;
            return false;
        }
        self.by_key.insert(key, entity);
        true
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.by_key.get(key)
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.by_key.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &T::Key> {
        self.by_key.keys()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Number of duplicate keys dropped so far.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

impl<T: SyncModel> FromIterator<T> for EntityCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = Self::new();
        for entity in iter {
            collection.insert(entity);
        }
        collection
    }
}

impl<T: SyncModel> Extend<T> for EntityCollection<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for entity in iter {
            self.insert(entity);
        }
    }
}

/// Both entity collections loaded from one side of a sync.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub addresses: EntityCollection<Address>,
    pub prefixes: EntityCollection<Prefix>,
    /// Prefixes the source holds but does not sync, such as container
    /// blocks. Never deleted from the other side.
    pub excluded_prefixes: BTreeSet<PrefixKey>,
}
