//! Transport configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Certificate, key and CA used by one role to authenticate itself and its
/// peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// PEM certificate chain presented to peers.
    pub cert: PathBuf,

    /// PEM private key for `cert`.
    pub key: PathBuf,

    /// PEM CA bundle used to verify peers. On servers, setting it requires
    /// client certificates.
    #[serde(default)]
    pub ca: Option<PathBuf>,
}

impl IdentityConfig {
    /// Create an identity without a CA.
    #[must_use]
    pub fn new(cert: PathBuf, key: PathBuf) -> Self {
        Self {
            cert,
            key,
            ca: None,
        }
    }

    /// Set the CA bundle.
    #[must_use]
    pub fn with_ca(mut self, ca: PathBuf) -> Self {
        self.ca = Some(ca);
        self
    }
}
