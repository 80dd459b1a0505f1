//! Thread-safe map with an optional capacity bound.
//!
//! Both the certificate cache and the outbound session cache sit on top of
//! [`BoundedCache`]. With no capacity the cache grows for the lifetime of the
//! process; with a capacity the oldest inserted key is evicted first.

use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{PoisonError, RwLock};

/// A concurrent map with FIFO eviction once `capacity` entries are stored.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    inner: RwLock<Inner<K, V>>,
    capacity: Option<NonZeroUsize>,
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, V>,
    /// Insertion order, oldest first.
    order: VecDeque<K>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache. `None` means unbounded.
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.and_then(NonZeroUsize::new),
        }
    }

    /// Create a cache without a capacity bound.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// The configured capacity, if any.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity.map(NonZeroUsize::get)
    }

    /// Look up a key, returning a clone of the stored value.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(key).cloned()
    }

    /// Insert or overwrite a value. Overwriting keeps the key's position in
    /// the eviction order. Returns the evicted key, if one had to go.
    pub fn put(&self, key: K, value: V) -> Option<K> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(slot) = inner.entries.get_mut(&key) {
            *slot = value;
            return None;
        }

        self.insert_new(&mut inner, key, value)
    }

    /// Run `f` against the entry for `key`, creating it with `V::default()`
    /// when absent. The lock is held for the duration of `f`.
    pub fn update<R>(&self, key: K, f: impl FnOnce(&mut V) -> R) -> R
    where
        V: Default,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(value) = inner.entries.get_mut(&key) {
            return f(value);
        }

        let mut value = V::default();
        let result = f(&mut value);
        self.insert_new(&mut inner, key, value);
        result
    }

    fn insert_new(&self, inner: &mut Inner<K, V>, key: K, value: V) -> Option<K> {
        let mut evicted = None;
        if let Some(capacity) = self.capacity {
            if inner.entries.len() >= capacity.get() {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.entries.remove(&oldest);
                    evicted = Some(oldest);
                }
            }
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(key, value);
        evicted
    }

    /// Run `f` against an existing entry without creating one.
    pub fn with_existing<Q, R>(&self, key: &Q, f: impl FnOnce(&mut V) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get_mut(key).map(f)
    }

    /// Remove a key, returning its value.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let value = inner.entries.remove(key)?;
        inner.order.retain(|k| k.borrow() != key);
        Some(value)
    }

    /// Check whether a key is present.
    #[must_use]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.contains_key(key)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
