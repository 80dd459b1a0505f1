//! Read-only certificate store served by the distribution server.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use tracing::info;

use super::error::ProtocolResult;
use crate::modules::certificate::CertificateRecord;

/// Certificate chains by exact hostname, loaded once at startup.
#[derive(Debug, Default)]
pub struct CertificateStore {
    records: HashMap<String, CertificateRecord>,
}

impl CertificateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a PEM chain for every configured hostname.
    ///
    /// # Errors
    ///
    /// Returns an error if any chain cannot be loaded. A partially loaded
    /// store is never returned.
    pub fn load(hosts: &BTreeMap<String, PathBuf>) -> ProtocolResult<Self> {
        let mut store = Self::new();

        for (hostname, path) in hosts {
            let record = CertificateRecord::load_pem(path)?;
            info!(
                hostname = %hostname,
                path = %path.display(),
                cert_count = record.chain().len(),
                "Loaded certificate chain"
            );
            store.insert(hostname.clone(), record);
        }

        Ok(store)
    }

    /// Add or replace the chain for `hostname`.
    pub fn insert(&mut self, hostname: impl Into<String>, record: CertificateRecord) {
        self.records.insert(hostname.into(), record);
    }

    /// Look up the chain for `hostname`.
    #[must_use]
    pub fn lookup(&self, hostname: &str) -> Option<&CertificateRecord> {
        self.records.get(hostname)
    }

    /// Number of hostnames served.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Pki;

    #[test]
    fn test_load_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let pki = Pki::new();
        let (www, _) = pki.leaf("www.example.com").write(dir.path(), "www");

        let hosts = BTreeMap::from([("www.example.com".to_string(), www)]);
        let store = CertificateStore::load(&hosts).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("www.example.com").unwrap().chain().len(), 2);
        assert!(store.lookup("WWW.example.com").is_none());
        assert!(store.lookup("api.example.com").is_none());
    }

    #[test]
    fn test_load_fails_on_missing_file() {
        let hosts = BTreeMap::from([(
            "www.example.com".to_string(),
            PathBuf::from("/nonexistent/www.pem"),
        )]);

        assert!(CertificateStore::load(&hosts).is_err());
    }
}
