//! Signing server configuration.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// A certificate and the private key it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPairConfig {
    /// PEM certificate (chain), leaf first.
    pub certificate: PathBuf,

    /// PEM private key.
    pub key: PathBuf,
}

/// Configuration for the signing server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningServerConfig {
    /// Address to listen on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Keys held by this server.
    #[serde(default)]
    pub keys: Vec<KeyPairConfig>,

    /// Handshake timeout in seconds.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
}

fn default_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 2407)
}

fn default_handshake_timeout() -> u64 {
    10
}

impl Default for SigningServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            keys: Vec::new(),
            handshake_timeout_secs: default_handshake_timeout(),
        }
    }
}
