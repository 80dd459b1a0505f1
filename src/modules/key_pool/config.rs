//! Connection pool configuration.

use serde::{Deserialize, Serialize};

/// Distribution backends the proxy fetches certificate chains from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Backend addresses (`host:port`), in failover order.
    #[serde(default)]
    pub backends: Vec<String>,

    /// TLS name every backend certificate is verified against. Defaults to
    /// the host part of each backend address.
    #[serde(default)]
    pub server_name: Option<String>,
}
