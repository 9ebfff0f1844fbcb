//! Bounded recency-ordered map with an eviction callback.
//!
//! Not safe for concurrent access: `get` updates recency and is therefore a
//! mutation. Callers wrap the structure in their own lock.
//!
//! Entries live in a slot vector forming an intrusive doubly-linked list
//! (most recent at the head), with a `HashMap` index for O(1) lookup and a
//! free-list for O(1) slot reuse. No entry is ever moved in memory once
//! inserted, so all list operations are index rewires.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Invoked with each entry removed from the cache: capacity eviction,
/// explicit removal, and [`Lru::clear`] all fire it, exactly once per entry.
pub type EvictionCallback<K, V> = Box<dyn FnMut(K, V) + Send>;

/// Sentinel slot index marking the end of the recency list.
const NIL: usize = usize::MAX;

struct Slot<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// A fixed-capacity ordered map evicting least-recently-used entries.
pub struct Lru<K, V> {
    /// Maximum number of entries; 0 means unbounded (eviction is then the
    /// caller's concern, via [`Lru::remove_oldest`]).
    max_entries: usize,
    on_evict: Option<EvictionCallback<K, V>>,
    index: HashMap<K, usize>,
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl<K, V> Lru<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty cache holding at most `max_entries` entries
    /// (0 = unbounded).
    pub fn new(max_entries: usize) -> Self {
        Lru {
            max_entries,
            on_evict: None,
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    /// Installs an eviction callback, replacing any previous one.
    pub fn on_evict<F>(mut self, callback: F) -> Self
    where
        F: FnMut(K, V) + Send + 'static,
    {
        self.on_evict = Some(Box::new(callback));
        self
    }

    /// Inserts or updates `key`, marking it most recently used.
    ///
    /// Returns the previous value when `key` was already present; a plain
    /// replacement is not an eviction and does not fire the callback. When
    /// the insert pushes the cache over capacity, tail entries are evicted
    /// (with callback) until the bound holds again.
    pub fn add(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&idx) = self.index.get(&key) {
            let slot = self.slot_mut(idx);
            let old = std::mem::replace(&mut slot.value, value);
            self.move_to_front(idx);
            return Some(old);
        }
        let idx = self.alloc(key.clone(), value);
        self.index.insert(key, idx);
        self.push_front(idx);
        if self.max_entries != 0 {
            while self.index.len() > self.max_entries {
                self.remove_oldest();
            }
        }
        None
    }

    /// Looks up `key`, marking it most recently used on a hit.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.move_to_front(idx);
        Some(&self.slot(idx).value)
    }

    /// Returns `true` when `key` is resident, without touching recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Removes `key` if present, firing the eviction callback.
    ///
    /// Removing an absent key is a no-op, so concurrent eviction paths that
    /// race on the same key stay harmless.
    pub fn remove<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        if let Some(&idx) = self.index.get(key) {
            self.remove_slot(idx);
        }
    }

    /// Evicts the least recently used entry, if any.
    pub fn remove_oldest(&mut self) {
        if self.tail != NIL {
            self.remove_slot(self.tail);
        }
    }

    /// Number of resident entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` when no entries are resident.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The least recently used key, if any.
    pub fn oldest(&self) -> Option<&K> {
        (self.tail != NIL).then(|| &self.slot(self.tail).key)
    }

    /// Drops every entry, firing the eviction callback for each.
    pub fn clear(&mut self) {
        while self.tail != NIL {
            self.remove_slot(self.tail);
        }
        self.slots.clear();
        self.free.clear();
    }

    fn remove_slot(&mut self, idx: usize) {
        self.unlink(idx);
        let slot = self.slots[idx].take().expect("freed slot in recency list");
        self.index.remove(&slot.key);
        self.free.push(idx);
        if let Some(callback) = self.on_evict.as_mut() {
            callback(slot.key, slot.value);
        }
    }

    fn alloc(&mut self, key: K, value: V) -> usize {
        let slot = Slot {
            key,
            value,
            prev: NIL,
            next: NIL,
        };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    fn push_front(&mut self, idx: usize) {
        let head = self.head;
        {
            let slot = self.slot_mut(idx);
            slot.prev = NIL;
            slot.next = head;
        }
        if head != NIL {
            self.slot_mut(head).prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slot(idx);
            (slot.prev, slot.next)
        };
        if prev != NIL {
            self.slot_mut(prev).next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slot_mut(next).prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head != idx {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    #[inline]
    fn slot(&self, idx: usize) -> &Slot<K, V> {
        self.slots[idx].as_ref().expect("freed slot in recency list")
    }

    #[inline]
    fn slot_mut(&mut self, idx: usize) -> &mut Slot<K, V> {
        self.slots[idx].as_mut().expect("freed slot in recency list")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<(&'static str, u32)>>>;

    fn logging_lru(max_entries: usize) -> (Lru<&'static str, u32>, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let lru = Lru::new(max_entries).on_evict(move |key, value| {
            sink.lock().unwrap().push((key, value));
        });
        (lru, log)
    }

    #[test]
    fn evicts_least_recently_used_first() {
        let (mut lru, log) = logging_lru(2);
        lru.add("a", 1);
        lru.add("b", 2);
        lru.add("c", 3);

        assert_eq!(lru.len(), 2);
        assert!(!lru.contains("a"));
        assert_eq!(lru.get("b"), Some(&2));
        assert_eq!(lru.get("c"), Some(&3));
        assert_eq!(*log.lock().unwrap(), vec![("a", 1)]);
    }

    #[test]
    fn get_refreshes_recency() {
        let (mut lru, log) = logging_lru(2);
        lru.add("a", 1);
        lru.add("b", 2);
        assert_eq!(lru.get("a"), Some(&1));
        lru.add("c", 3);

        // "b" was the coldest entry once "a" had been touched.
        assert!(lru.contains("a"));
        assert!(!lru.contains("b"));
        assert_eq!(*log.lock().unwrap(), vec![("b", 2)]);
    }

    #[test]
    fn add_replaces_value_without_evicting() {
        let (mut lru, log) = logging_lru(2);
        lru.add("a", 1);
        lru.add("b", 2);
        assert_eq!(lru.add("a", 10), Some(1));

        assert_eq!(lru.len(), 2);
        assert_eq!(lru.get("a"), Some(&10));
        assert!(log.lock().unwrap().is_empty());
        // The replacement refreshed "a", so "b" is now the oldest.
        assert_eq!(lru.oldest(), Some(&"b"));
    }

    #[test]
    fn remove_is_idempotent_and_fires_once() {
        let (mut lru, log) = logging_lru(0);
        lru.add("a", 1);
        lru.remove("a");
        lru.remove("a");

        assert!(lru.is_empty());
        assert_eq!(*log.lock().unwrap(), vec![("a", 1)]);
    }

    #[test]
    fn clear_fires_callback_for_every_entry() {
        let (mut lru, log) = logging_lru(0);
        lru.add("a", 1);
        lru.add("b", 2);
        lru.add("c", 3);
        lru.clear();

        assert!(lru.is_empty());
        let mut evicted = log.lock().unwrap().clone();
        evicted.sort();
        assert_eq!(evicted, vec![("a", 1), ("b", 2), ("c", 3)]);
    }

    #[test]
    fn zero_capacity_means_unbounded() {
        let evictions = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&evictions);
        let mut lru: Lru<String, u32> =
            Lru::new(0).on_evict(move |_key, _value| *sink.lock().unwrap() += 1);
        for i in 0..1000 {
            lru.add(format!("k{i}"), i);
        }
        assert_eq!(lru.len(), 1000);
        assert_eq!(*evictions.lock().unwrap(), 0);
    }

    #[test]
    fn most_recent_entries_stay_resident() {
        let mut lru: Lru<String, usize> = Lru::new(8);
        for i in 0..100 {
            lru.add(format!("k{i}"), i);
        }
        assert_eq!(lru.len(), 8);
        for i in 92..100 {
            assert!(lru.contains(format!("k{i}").as_str()), "k{i} missing");
        }
    }

    #[test]
    fn remove_oldest_walks_the_tail() {
        let mut lru: Lru<&'static str, u32> = Lru::new(0);
        lru.add("a", 1);
        lru.add("b", 2);
        lru.add("c", 3);

        assert_eq!(lru.oldest(), Some(&"a"));
        lru.remove_oldest();
        assert_eq!(lru.oldest(), Some(&"b"));
        lru.remove_oldest();
        lru.remove_oldest();
        lru.remove_oldest();
        assert!(lru.is_empty());
    }

    #[test]
    fn slots_are_reused_after_removal() {
        let mut lru: Lru<String, u32> = Lru::new(2);
        for i in 0..50 {
            lru.add(format!("k{i}"), i);
        }
        // Two live slots plus at most one transiently allocated during add.
        assert!(lru.len() == 2);
    }
}
