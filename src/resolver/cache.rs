//! Bounded LRU cache for resolved objects
//!
//! Keys are comparable strings; values are `Rc` handles, so an entry can be
//! evicted only while the cache holds the last reference. Order is a queue
//! of keys, least recently used at the front.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::rc::Rc;

use tracing::trace;

use crate::error::{VfsError, VfsResult};

pub struct ObjectsCache<T: ?Sized> {
    capacity: NonZeroUsize,
    entries: HashMap<String, Rc<T>>,
    order: VecDeque<String>,
}

impl<T: ?Sized> ObjectsCache<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up a handle, promoting it to most recently used
    pub fn get(&mut self, key: &str) -> Option<Rc<T>> {
        let value = self.entries.get(key)?.clone();
        self.promote(key);
        Some(value)
    }

    /// Insert a handle, evicting the least recently used entry at capacity
    ///
    /// Inserting over an existing key replaces the handle. Eviction fails
    /// with `CacheFull` when the candidate is still referenced outside the
    /// cache.
    pub fn put(&mut self, key: String, value: Rc<T>) -> VfsResult<()> {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            self.promote(&key);
            return Ok(());
        }
        if self.entries.len() >= self.capacity.get() {
            self.evict_one()?;
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn remove_by_key(&mut self, key: &str) -> Option<Rc<T>> {
        let value = self.entries.remove(key)?;
        self.order.retain(|entry| entry != key);
        Some(value)
    }

    /// Remove by handle identity, scanning the cache
    pub fn remove_by_value(&mut self, value: &Rc<T>) -> Option<Rc<T>> {
        let key = self
            .entries
            .iter()
            .find(|(_, cached)| Rc::ptr_eq(cached, value))
            .map(|(key, _)| key.clone())?;
        self.remove_by_key(&key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn promote(&mut self, key: &str) {
        self.order.retain(|entry| entry != key);
        self.order.push_back(key.to_string());
    }

    fn evict_one(&mut self) -> VfsResult<()> {
        let candidate = match self.order.front() {
            Some(key) => key.clone(),
            None => return Ok(()),
        };
        // A handle someone still holds must not be dropped out from under
        // them.
        if self
            .entries
            .get(&candidate)
            .map_or(false, |value| Rc::strong_count(value) > 1)
        {
            return Err(VfsError::CacheFull);
        }
        trace!(key = %candidate, "evicting least recently used entry");
        self.entries.remove(&candidate);
        self.order.pop_front();
        Ok(())
    }
}
