//! Compute-once memoization.
//!
//! A read-mostly map from key to a once-cell. Readers share the map lock;
//! the first caller for a key initializes the cell while later callers for
//! the same key block on that cell only, so each value is computed once even
//! under concurrent first access.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use once_cell::sync::OnceCell;

use crate::errors::EngineResult;

pub struct MemoCache<K, V> {
    cells: RwLock<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for MemoCache<K, V> {
    fn default() -> Self {
        MemoCache {
            cells: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> std::fmt::Debug for MemoCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache").field("entries", &self.len()).finish()
    }
}

impl<K, V> MemoCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys seen (including ones whose computation failed).
    pub fn len(&self) -> usize {
        self.cells.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every memoized value. Upstream geometry or material changes
    /// call this; nothing inside the engine does.
    pub fn clear(&self) {
        self.cells.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Return the cached value for `key`, computing it with `compute` on
    /// first access. A failed computation is not cached.
    pub fn get_or_try_compute<F>(&self, key: &K, compute: F) -> EngineResult<V>
    where
        F: FnOnce() -> EngineResult<V>,
    {
        let existing = self
            .cells
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned();
        let cell = match existing {
            Some(cell) => cell,
            None => self
                .cells
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .entry(key.clone())
                .or_default()
                .clone(),
        };
        cell.get_or_try_init(compute).cloned()
    }
}
