//! The signing-service seam used by the resolver.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_rustls::rustls::sign::SigningKey;

use super::error::SigningResult;
use crate::modules::certificate::LeafCertificate;

/// Binds a leaf certificate to the key server that holds its private key.
#[async_trait]
pub trait SigningService: Send + Sync {
    /// Return a signing capability for `leaf`, backed by `key_server`.
    async fn bind(
        &self,
        key_server: &str,
        leaf: &LeafCertificate,
    ) -> SigningResult<Arc<dyn SigningKey>>;
}
