//! In-memory key-value store.
//!
//! Tables are kept as ordered maps so `for_each` is deterministic. The whole
//! store serializes to JSON, which is how the operator CLI persists state
//! between invocations.

use super::{KvStore, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// BTreeMap-backed [`KvStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    tables: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `table`.
    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, BTreeMap::len)
    }

    /// Whether `table` has no entries.
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

impl KvStore for MemoryStore {
    fn get(&self, table: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.tables.get(table).and_then(|t| t.get(key)).cloned())
    }

    fn put(&mut self, table: &str, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, table: &str, key: &str) -> StoreResult<bool> {
        let existed = match self.tables.get_mut(table) {
            Some(t) => t.remove(key).is_some(),
            None => false,
        };
        if self.tables.get(table).is_some_and(BTreeMap::is_empty) {
            self.tables.remove(table);
        }
        Ok(existed)
    }

    fn for_each(&self, table: &str, visit: &mut dyn FnMut(&str, &[u8])) -> StoreResult<()> {
        if let Some(t) = self.tables.get(table) {
            for (key, value) in t {
                visit(key, value);
            }
        }
        Ok(())
    }
}
