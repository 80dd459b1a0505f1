//! TLS termination proxy configuration types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::modules::key_pool::PoolConfig;
use crate::modules::resolver::HostConfig;
use crate::modules::transport::IdentityConfig;

/// Configuration for the TLS termination proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Address to accept client connections on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Backend application (`host:port`) that receives decrypted traffic.
    pub target: String,

    /// Shared secret the session ticket key is derived from.
    pub session_ticket_key: String,

    /// Session ticket lifetime in seconds.
    #[serde(default = "default_ticket_lifetime")]
    pub ticket_lifetime_secs: u32,

    /// Client handshake timeout in seconds, certificate resolution included.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,

    /// Timeout in milliseconds for dialing key servers and the backend.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Maximum resolved certificates kept; unbounded when unset.
    #[serde(default)]
    pub certificate_cache_capacity: Option<usize>,

    /// Maximum key-server sessions kept for resumption; unbounded when unset.
    #[serde(default)]
    pub session_cache_capacity: Option<usize>,

    /// Client identity towards key servers. `ca` verifies them.
    pub identity: IdentityConfig,

    /// Certificate distribution backends.
    #[serde(default)]
    pub distribution: PoolConfig,

    /// Hostnames this proxy may serve.
    #[serde(default)]
    pub hosts: BTreeMap<String, HostConfig>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 443)
}

fn default_ticket_lifetime() -> u32 {
    12 * 60 * 60
}

fn default_handshake_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    1000
}

impl ProxyConfig {
    /// Create a configuration with defaults for everything optional.
    pub fn new(target: impl Into<String>, session_ticket_key: impl Into<String>, identity: IdentityConfig) -> Self {
        Self {
            listen: default_listen(),
            target: target.into(),
            session_ticket_key: session_ticket_key.into(),
            ticket_lifetime_secs: default_ticket_lifetime(),
            handshake_timeout_secs: default_handshake_timeout(),
            connect_timeout_ms: default_connect_timeout(),
            certificate_cache_capacity: None,
            session_cache_capacity: None,
            identity,
            distribution: PoolConfig::default(),
            hosts: BTreeMap::new(),
        }
    }

    /// Authorize a hostname.
    #[must_use]
    pub fn with_host(mut self, hostname: &str, host: HostConfig) -> Self {
        self.hosts.insert(hostname.to_string(), host);
        self
    }

    /// Per-host CA bundles, if any host overrides the default.
    pub fn host_cas(&self) -> impl Iterator<Item = (&str, &PathBuf)> {
        self.hosts
            .values()
            .filter_map(|h| h.ca.as_ref().map(|ca| (h.key_server.as_str(), ca)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_proxy_config() {
        let config: ProxyConfig = toml::from_str(
            r#"
            listen = "0.0.0.0:8443"
            target = "127.0.0.1:8080"
            session_ticket_key = "shared secret"

            [identity]
            cert = "/etc/keyless/proxy.pem"
            key = "/etc/keyless/proxy.key"
            ca = "/etc/keyless/ca.pem"

            [distribution]
            backends = ["10.0.0.1:2408", "10.0.0.2:2408"]

            [hosts."www.example.com"]
            key_server = "10.0.0.1:2407"

            [hosts."api.example.com"]
            key_server = "10.0.0.9:2407"
            ca = "/etc/keyless/api-ca.pem"
        "#,
        )
        .unwrap();

        assert_eq!(config.listen.port(), 8443);
        assert_eq!(config.ticket_lifetime_secs, 43_200);
        assert_eq!(config.connect_timeout_ms, 1000);
        assert!(config.certificate_cache_capacity.is_none());
        assert_eq!(config.distribution.backends.len(), 2);
        assert_eq!(config.hosts.len(), 2);
        assert_eq!(
            config.host_cas().collect::<Vec<_>>(),
            vec![("10.0.0.9:2407", &PathBuf::from("/etc/keyless/api-ca.pem"))]
        );
    }
}
