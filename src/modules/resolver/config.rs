//! Per-hostname authorization.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A hostname the proxy may serve and the key server that signs for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Signing service address (`host:port`).
    pub key_server: String,

    /// CA bundle for verifying that key server, if it differs from the
    /// proxy's default CA.
    #[serde(default)]
    pub ca: Option<PathBuf>,
}

impl HostConfig {
    /// Create a host entry.
    pub fn new(key_server: impl Into<String>) -> Self {
        Self {
            key_server: key_server.into(),
            ca: None,
        }
    }
}
