//! Opaque session cache.

use tracing::trace;

use crate::cache::BoundedCache;

/// Resumption state keyed by an opaque session identifier.
///
/// Safe to share between concurrent handshakes. Unbounded unless a capacity
/// is given, in which case the oldest session is dropped first.
#[derive(Debug)]
pub struct SessionCache<V> {
    sessions: BoundedCache<Vec<u8>, V>,
}

impl<V> SessionCache<V> {
    /// Create a cache with an optional capacity.
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            sessions: BoundedCache::new(capacity),
        }
    }

    /// Look up a session.
    #[must_use]
    pub fn get(&self, id: &[u8]) -> Option<V>
    where
        V: Clone,
    {
        let session = self.sessions.get(id);
        trace!(id = %String::from_utf8_lossy(id), hit = session.is_some(), "Session cache get");
        session
    }

    /// Store or overwrite a session.
    pub fn put(&self, id: &[u8], state: V) {
        trace!(id = %String::from_utf8_lossy(id), "Session cache put");
        self.sessions.put(id.to_vec(), state);
    }

    /// Remove a session.
    pub fn remove(&self, id: &[u8]) -> Option<V> {
        self.sessions.remove(id)
    }

    /// Mutate a session in place, creating it first when absent.
    pub fn update<R>(&self, id: &[u8], f: impl FnOnce(&mut V) -> R) -> R
    where
        V: Default,
    {
        self.sessions.update(id.to_vec(), f)
    }

    /// Mutate a session in place only if it exists.
    pub fn with_existing<R>(&self, id: &[u8], f: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.sessions.with_existing(id, f)
    }

    /// Number of cached sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<V> Default for SessionCache<V> {
    fn default() -> Self {
        Self::new(None)
    }
}
