//! Cache entry with the bookkeeping needed by the recency list.

use crate::storage::NodeId;

/// A single cache entry: the owned key/value pair plus its list links.
///
/// Each entry tracks:
/// - The key (a second copy lives in the lookup index)
/// - The stored value
/// - The memory charged for it when it was last written
/// - Its neighbours in the recency list (`prev` is towards the head)
#[derive(Debug, Clone)]
pub struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) cost: usize,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
}

impl<K, V> Entry<K, V> {
    /// Create an unlinked entry.
    pub fn new(key: K, value: V, cost: usize) -> Self {
        Self {
            key,
            value,
            cost,
            prev: None,
            next: None,
        }
    }

    /// Replace the value, returning the previous cost.
    pub fn overwrite(&mut self, value: V, cost: usize) -> usize {
        self.value = value;
        std::mem::replace(&mut self.cost, cost)
    }

    /// Get a reference to the key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Get a reference to the value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Get the accounted memory of this entry.
    pub fn cost(&self) -> usize {
        self.cost
    }
}
