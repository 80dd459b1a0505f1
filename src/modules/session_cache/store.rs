//! rustls adapter for the session cache.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio_rustls::rustls::client::{
    ClientSessionStore, Tls12ClientSessionValue, Tls13ClientSessionValue,
};
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::NamedGroup;
use tracing::debug;

use super::cache::SessionCache;

/// TLS 1.3 tickets kept per server; older ones are dropped first.
const MAX_TLS13_TICKETS: usize = 8;

/// Everything remembered about one server.
#[derive(Debug, Default)]
pub struct ServerSessions {
    kx_hint: Option<NamedGroup>,
    tls12: Option<Tls12ClientSessionValue>,
    tls13: VecDeque<Tls13ClientSessionValue>,
}

impl ServerSessions {
    /// Number of unused TLS 1.3 tickets.
    #[must_use]
    pub fn tls13_tickets(&self) -> usize {
        self.tls13.len()
    }

    /// Whether a TLS 1.2 session is stored.
    #[must_use]
    pub fn has_tls12(&self) -> bool {
        self.tls12.is_some()
    }
}

/// A rustls `ClientSessionStore` backed by a shared [`SessionCache`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    cache: Arc<SessionCache<ServerSessions>>,
}

impl SessionStore {
    /// Wrap a cache.
    #[must_use]
    pub fn new(cache: Arc<SessionCache<ServerSessions>>) -> Self {
        Self { cache }
    }

    /// The backing cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<SessionCache<ServerSessions>> {
        &self.cache
    }

    /// Session identifier for a server.
    fn session_id(server_name: &ServerName<'_>) -> Vec<u8> {
        match server_name {
            ServerName::DnsName(name) => format!("dns:{}", name.as_ref()).into_bytes(),
            ServerName::IpAddress(addr) => {
                format!("ip:{}", std::net::IpAddr::from(*addr)).into_bytes()
            },
            other => format!("other:{other:?}").into_bytes(),
        }
    }
}

impl ClientSessionStore for SessionStore {
    fn set_kx_hint(&self, server_name: ServerName<'static>, group: NamedGroup) {
        self.cache
            .update(&Self::session_id(&server_name), |s| s.kx_hint = Some(group));
    }

    fn kx_hint(&self, server_name: &ServerName<'_>) -> Option<NamedGroup> {
        self.cache
            .with_existing(&Self::session_id(server_name), |s| s.kx_hint)
            .flatten()
    }

    fn set_tls12_session(&self, server_name: ServerName<'static>, value: Tls12ClientSessionValue) {
        debug!(server = ?server_name, "Storing TLS 1.2 session");
        self.cache
            .update(&Self::session_id(&server_name), |s| s.tls12 = Some(value));
    }

    fn tls12_session(&self, server_name: &ServerName<'_>) -> Option<Tls12ClientSessionValue> {
        self.cache
            .with_existing(&Self::session_id(server_name), |s| s.tls12.clone())
            .flatten()
    }

    fn remove_tls12_session(&self, server_name: &ServerName<'static>) {
        self.cache
            .with_existing(&Self::session_id(server_name), |s| s.tls12 = None);
    }

    fn insert_tls13_ticket(&self, server_name: ServerName<'static>, value: Tls13ClientSessionValue) {
        debug!(server = ?server_name, "Storing TLS 1.3 ticket");
        self.cache.update(&Self::session_id(&server_name), |s| {
            if s.tls13.len() >= MAX_TLS13_TICKETS {
                s.tls13.pop_front();
            }
            s.tls13.push_back(value);
        });
    }

    fn take_tls13_ticket(&self, server_name: &ServerName<'static>) -> Option<Tls13ClientSessionValue> {
        self.cache
            .with_existing(&Self::session_id(server_name), |s| s.tls13.pop_back())
            .flatten()
    }
}
