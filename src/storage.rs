//! Internal storage for the cache: a slot arena threaded by a recency list.
//!
//! Entries live in a `Vec` of slots and are addressed by `NodeId`, a stable
//! index that survives moves within the list. Freed slots are recycled
//! through a free list. The list runs from the most recently used entry
//! (head) to the least recently used one (tail).
//!
//! ```text
//!   slots: [ Some(B) | None | Some(A) | Some(C) ]      free: [1]
//!
//!   head ─► A ◄──► B ◄──► C ◄── tail
//! ```
//!
//! All operations except iteration are O(1).

use std::iter::FusedIterator;

use crate::entry::Entry;

/// Stable handle to an entry in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    #[cfg(test)]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena-backed doubly linked list of entries ordered by recency.
#[derive(Debug)]
pub struct OrderedBuffer<K, V> {
    slots: Vec<Option<Entry<K, V>>>,
    free: Vec<usize>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl<K, V> OrderedBuffer<K, V> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of entries in the buffer.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recently used entry.
    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    /// Least recently used entry.
    pub fn tail(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn get(&self, id: NodeId) -> Option<&Entry<K, V>> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Entry<K, V>> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    /// Insert an entry at the head and return its handle.
    pub fn push_front(&mut self, mut entry: Entry<K, V>) -> NodeId {
        entry.prev = None;
        entry.next = self.head;

        let id = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(entry);
                NodeId(idx)
            }
            None => {
                self.slots.push(Some(entry));
                NodeId(self.slots.len() - 1)
            }
        };

        match self.head {
            Some(old_head) => {
                if let Some(node) = self.get_mut(old_head) {
                    node.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
        id
    }

    /// Remove and return the tail entry.
    pub fn pop_back(&mut self) -> Option<Entry<K, V>> {
        let id = self.tail?;
        self.remove(id)
    }

    /// Remove the entry `id` wherever it sits.
    pub fn remove(&mut self, id: NodeId) -> Option<Entry<K, V>> {
        self.detach(id)?;
        let entry = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(entry)
    }

    /// Move an existing entry to the head; returns `false` if `id` is unknown.
    pub fn move_to_front(&mut self, id: NodeId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        if self.head == Some(id) {
            return true;
        }
        self.detach(id);
        self.attach_front(id);
        true
    }

    /// Drop every entry and release the slots.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterate from head (most recent) to tail; `.rev()` walks tail to head.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buffer: self,
            front: self.head,
            back: self.tail,
            remaining: self.len,
        }
    }

    fn detach(&mut self, id: NodeId) -> Option<()> {
        let (prev, next) = {
            let node = self.get(id)?;
            (node.prev, node.next)
        };

        match prev {
            Some(prev_id) => {
                if let Some(prev_node) = self.get_mut(prev_id) {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_id) => {
                if let Some(next_node) = self.get_mut(next_id) {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        let node = self.get_mut(id)?;
        node.prev = None;
        node.next = None;
        Some(())
    }

    fn attach_front(&mut self, id: NodeId) {
        let old_head = self.head;
        if let Some(node) = self.get_mut(id) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(old_head) => {
                if let Some(node) = self.get_mut(old_head) {
                    node.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    #[cfg(test)]
    pub fn debug_validate_invariants(&self) {
        if self.head.is_none() || self.tail.is_none() {
            assert!(self.head.is_none());
            assert!(self.tail.is_none());
            assert_eq!(self.len, 0);
            return;
        }

        let mut count = 0usize;
        let mut current = self.head;
        let mut prev = None;
        while let Some(id) = current {
            let node = self.get(id).expect("linked node missing from arena");
            assert_eq!(node.prev, prev);
            if node.next.is_none() {
                assert_eq!(self.tail, Some(id));
            }
            prev = Some(id);
            current = node.next;
            count += 1;
            assert!(count <= self.len);
        }

        assert_eq!(count, self.len);
        let occupied = self.slots.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(occupied, self.len);
        assert_eq!(self.slots.len(), self.len + self.free.len());
    }
}

impl<K, V> Default for OrderedBuffer<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Double-ended iterator over `(&K, &V)` in recency order.
///
/// Iteration never changes the order.
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    buffer: &'a OrderedBuffer<K, V>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let entry = self.buffer.get(self.front?)?;
        self.front = entry.next;
        self.remaining -= 1;
        Some((&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let entry = self.buffer.get(self.back?)?;
        self.back = entry.prev;
        self.remaining -= 1;
        Some((&entry.key, &entry.value))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(buffer: &OrderedBuffer<u32, &'static str>) -> Vec<u32> {
        buffer.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_push_front_orders_most_recent_first() {
        let mut buffer = OrderedBuffer::new();
        buffer.push_front(Entry::new(1, "a", 0));
        buffer.push_front(Entry::new(2, "b", 0));
        buffer.push_front(Entry::new(3, "c", 0));

        assert_eq!(keys(&buffer), vec![3, 2, 1]);
        assert_eq!(buffer.len(), 3);
        buffer.debug_validate_invariants();
    }

    #[test]
    fn test_move_to_front() {
        let mut buffer = OrderedBuffer::new();
        let one = buffer.push_front(Entry::new(1, "a", 0));
        let two = buffer.push_front(Entry::new(2, "b", 0));
        buffer.push_front(Entry::new(3, "c", 0));

        assert!(buffer.move_to_front(one));
        assert_eq!(keys(&buffer), vec![1, 3, 2]);
        assert!(buffer.move_to_front(two));
        assert_eq!(keys(&buffer), vec![2, 1, 3]);
        assert!(buffer.move_to_front(two));
        assert_eq!(keys(&buffer), vec![2, 1, 3]);
        buffer.debug_validate_invariants();
    }

    #[test]
    fn test_pop_back_returns_least_recent() {
        let mut buffer = OrderedBuffer::new();
        buffer.push_front(Entry::new(1, "a", 0));
        buffer.push_front(Entry::new(2, "b", 0));

        assert_eq!(buffer.pop_back().map(|e| e.key), Some(1));
        assert_eq!(buffer.pop_back().map(|e| e.key), Some(2));
        assert!(buffer.pop_back().is_none());
        assert!(buffer.is_empty());
        buffer.debug_validate_invariants();
    }

    #[test]
    fn test_remove_middle_and_reuse_slot() {
        let mut buffer = OrderedBuffer::new();
        buffer.push_front(Entry::new(1, "a", 0));
        let two = buffer.push_front(Entry::new(2, "b", 0));
        buffer.push_front(Entry::new(3, "c", 0));

        assert_eq!(buffer.remove(two).map(|e| e.value), Some("b"));
        assert!(buffer.remove(two).is_none());
        assert!(!buffer.move_to_front(two));
        assert_eq!(keys(&buffer), vec![3, 1]);

        let four = buffer.push_front(Entry::new(4, "d", 0));
        assert_eq!(four.index(), two.index());
        assert_eq!(keys(&buffer), vec![4, 3, 1]);
        buffer.debug_validate_invariants();
    }

    #[test]
    fn test_double_ended_iteration() {
        let mut buffer = OrderedBuffer::new();
        for key in 1..=4 {
            buffer.push_front(Entry::new(key, "x", 0));
        }

        let reversed: Vec<u32> = buffer.iter().rev().map(|(k, _)| *k).collect();
        assert_eq!(reversed, vec![1, 2, 3, 4]);

        let mut iter = buffer.iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next().map(|(k, _)| *k), Some(4));
        assert_eq!(iter.next_back().map(|(k, _)| *k), Some(1));
        assert_eq!(iter.next().map(|(k, _)| *k), Some(3));
        assert_eq!(iter.next_back().map(|(k, _)| *k), Some(2));
        assert!(iter.next().is_none());
        assert!(iter.next_back().is_none());
    }

    #[test]
    fn test_clear() {
        let mut buffer = OrderedBuffer::new();
        buffer.push_front(Entry::new(1, "a", 0));
        buffer.push_front(Entry::new(2, "b", 0));
        buffer.clear();

        assert!(buffer.is_empty());
        assert!(buffer.head().is_none());
        assert!(buffer.tail().is_none());
        buffer.debug_validate_invariants();
    }
}
