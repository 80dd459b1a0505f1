//! Hostname to certificate resolution.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_rustls::rustls::sign::CertifiedKey;
use tracing::{debug, info, warn};

use super::cache::CertificateCache;
use super::config::HostConfig;
use super::error::{ResolveError, ResolveResult};
use crate::modules::key_pool::CertificateSource;
use crate::modules::signing::SigningService;

/// Resolves authorized hostnames to certificates with a remote signing key.
pub struct CertificateResolver {
    hosts: HashMap<String, HostConfig>,
    source: Arc<dyn CertificateSource>,
    signing: Arc<dyn SigningService>,
    cache: CertificateCache,
}

impl std::fmt::Debug for CertificateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateResolver")
            .field("hosts", &self.hosts.keys().collect::<Vec<_>>())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl CertificateResolver {
    /// Create a resolver over a fixed host table.
    pub fn new(
        hosts: HashMap<String, HostConfig>,
        source: Arc<dyn CertificateSource>,
        signing: Arc<dyn SigningService>,
        cache: CertificateCache,
    ) -> Self {
        Self {
            hosts,
            source,
            signing,
            cache,
        }
    }

    /// The certificate cache.
    #[must_use]
    pub fn cache(&self) -> &CertificateCache {
        &self.cache
    }

    /// Check whether `hostname` is configured.
    #[must_use]
    pub fn is_authorized(&self, hostname: &str) -> bool {
        self.hosts.contains_key(hostname)
    }

    /// Resolve `hostname` to a certificate ready for a handshake.
    ///
    /// Unconfigured hostnames are rejected before any network access. A
    /// cached certificate is returned as-is; otherwise the chain is fetched,
    /// bound to its key server and cached. Negative results are not cached.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::MissingServerName`] for an empty hostname.
    /// - [`ResolveError::NotAuthorized`] for an unconfigured hostname.
    /// - [`ResolveError::NoSuchCertificate`] if the backends hold no chain.
    /// - [`ResolveError::UpstreamUnavailable`] if no backend answered.
    /// - [`ResolveError::InvalidCertificate`] if the leaf cannot be parsed.
    /// - [`ResolveError::SigningBindingFailed`] if the key server refused.
    pub async fn resolve(&self, hostname: &str) -> ResolveResult<Arc<CertifiedKey>> {
        if hostname.is_empty() {
            return Err(ResolveError::MissingServerName);
        }

        let host = self
            .hosts
            .get(hostname)
            .ok_or_else(|| ResolveError::NotAuthorized {
                hostname: hostname.to_string(),
            })?;

        if let Some(key) = self.cache.get(hostname) {
            debug!(sni = %hostname, "Certificate cache hit");
            return Ok(key);
        }

        let record = self.source.send(hostname).await.map_err(|source| {
            ResolveError::UpstreamUnavailable {
                hostname: hostname.to_string(),
                source,
            }
        })?;

        if record.is_empty() {
            warn!(sni = %hostname, "No certificate available");
            return Err(ResolveError::NoSuchCertificate {
                hostname: hostname.to_string(),
            });
        }

        let leaf = record
            .leaf()
            .map_err(|source| ResolveError::InvalidCertificate {
                hostname: hostname.to_string(),
                source,
            })?;

        let signing_key = self
            .signing
            .bind(&host.key_server, &leaf)
            .await
            .map_err(|source| ResolveError::SigningBindingFailed {
                hostname: hostname.to_string(),
                source,
            })?;

        let key = Arc::new(CertifiedKey::new(record.into_chain(), signing_key));
        self.cache.insert(hostname.to_string(), Arc::clone(&key));

        info!(
            sni = %hostname,
            key_server = %host.key_server,
            key_id = %leaf.key_id(),
            "Certificate resolved"
        );

        Ok(key)
    }
}
