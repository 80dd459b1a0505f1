//! Resolved certificate cache.

use std::sync::Arc;

use tokio_rustls::rustls::sign::CertifiedKey;

use crate::cache::BoundedCache;

/// Certificates with their signing key bound, by exact hostname.
///
/// Only positive results are stored. Entries live until evicted by the
/// optional capacity bound.
#[derive(Debug)]
pub struct CertificateCache {
    entries: BoundedCache<String, Arc<CertifiedKey>>,
}

impl CertificateCache {
    /// Create a cache; `None` means unbounded.
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: BoundedCache::new(capacity),
        }
    }

    /// Look up a hostname.
    #[must_use]
    pub fn get(&self, hostname: &str) -> Option<Arc<CertifiedKey>> {
        self.entries.get(hostname)
    }

    /// Store a resolved certificate. A concurrent store for the same
    /// hostname simply wins or loses.
    pub fn insert(&self, hostname: String, key: Arc<CertifiedKey>) {
        self.entries.put(hostname, key);
    }

    /// Number of cached hostnames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CertificateCache {
    fn default() -> Self {
        Self::new(None)
    }
}
