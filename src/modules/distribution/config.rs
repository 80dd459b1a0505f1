//! Distribution server configuration types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Configuration for the certificate distribution server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionServerConfig {
    /// Address to listen on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Source addresses allowed to connect.
    #[serde(default)]
    pub allow: Vec<IpAddr>,

    /// Hostname to PEM chain file.
    #[serde(default)]
    pub hosts: BTreeMap<String, PathBuf>,

    /// Handshake timeout in seconds.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
}

fn default_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 2408)
}

fn default_handshake_timeout() -> u64 {
    10
}

impl Default for DistributionServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            allow: Vec::new(),
            hosts: BTreeMap::new(),
            handshake_timeout_secs: default_handshake_timeout(),
        }
    }
}
