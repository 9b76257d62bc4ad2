//! Identifier-keyed cache of backend rows.
//!
//! Dashboards keep the rows they fetched in an `EntityCache` and, once the
//! backend acknowledges a write, replace the affected row by its ID instead of
//! rebuilding the whole list. Fetch order is preserved so lists render in the
//! order the backend returned them.

use std::collections::HashMap;
use std::hash::Hash;

use crate::entities::{Product, Profile};
use crate::types::{ProductId, ProfileId};

/// A row with a stable primary key.
pub trait Keyed {
    type Key: Copy + Eq + Hash + std::fmt::Debug;

    fn key(&self) -> Self::Key;
}

impl Keyed for Profile {
    type Key = ProfileId;

    fn key(&self) -> ProfileId {
        self.id
    }
}

impl Keyed for Product {
    type Key = ProductId;

    fn key(&self) -> ProductId {
        self.id
    }
}

/// Ordered rows indexed by primary key.
#[derive(Debug, Clone)]
pub struct EntityCache<V: Keyed> {
    rows: Vec<V>,
    index: HashMap<V::Key, usize>,
}

impl<V: Keyed> Default for EntityCache<V> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V: Keyed> EntityCache<V> {
    /// Build a cache from fetched rows. A later duplicate key wins.
    #[must_use]
    pub fn from_rows(rows: Vec<V>) -> Self {
        let mut cache = Self::default();
        for row in rows {
            cache.upsert(row);
        }
        cache
    }

    /// Number of cached rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the cache holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a row by key.
    #[must_use]
    pub fn get(&self, key: &V::Key) -> Option<&V> {
        self.index.get(key).and_then(|&i| self.rows.get(i))
    }

    /// Rows in fetch order.
    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.rows.iter()
    }

    /// Replace the cached row with the same key, keeping its position.
    ///
    /// Returns the previous row, or `None` (and caches nothing) when the key
    /// is not cached.
    pub fn replace(&mut self, row: V) -> Option<V> {
        let slot = self.index.get(&row.key()).and_then(|&i| self.rows.get_mut(i))?;
        Some(std::mem::replace(slot, row))
    }

    /// Replace the row with the same key, or append it.
    fn upsert(&mut self, row: V) {
        let key = row.key();
        if let Some(slot) = self.index.get(&key).and_then(|&i| self.rows.get_mut(i)) {
            *slot = row;
        } else {
            self.index.insert(key, self.rows.len());
            self.rows.push(row);
        }
    }

    /// Apply an in-place change to the row with `key`.
    ///
    /// Returns `false` when the key is not cached.
    pub fn update(&mut self, key: &V::Key, change: impl FnOnce(&mut V)) -> bool {
        match self.index.get(key).and_then(|&i| self.rows.get_mut(i)) {
            Some(row) => {
                change(row);
                true
            }
            None => false,
        }
    }
}
