//! TLS termination listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_rustls::rustls::client::ClientSessionStore;
use tokio_rustls::rustls::server::{
    Acceptor, ClientHello, ProducesTickets, ResolvesServerCert, ServerSessionMemoryCache,
    StoresServerSessions,
};
use tokio_rustls::rustls::sign::CertifiedKey;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::server::TlsStream;
use tokio_rustls::LazyConfigAcceptor;
use tracing::{debug, error, info, warn};

use super::config::ProxyConfig;
use super::connection::{proxy_to_backend, AtomicConnectionStats, ConnectionStats, TlsConnection};
use super::error::{TlsError, TlsResult};
use super::ticketer::SharedSecretTicketer;
use crate::modules::key_pool::KeyServerPool;
use crate::modules::resolver::{CertificateCache, CertificateResolver};
use crate::modules::session_cache::{SessionCache, SessionStore};
use crate::modules::signing::KeylessClient;
use crate::modules::transport::{client_config, TlsDialer};

/// Server-side sessions kept in memory for session-ID resumption.
const SERVER_SESSION_CAPACITY: usize = 4096;

/// Serves the certificate resolved for this handshake and nothing else.
#[derive(Debug)]
struct ResolvedCertificate(Arc<CertifiedKey>);

impl ResolvesServerCert for ResolvedCertificate {
    fn resolve(&self, _client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        Some(Arc::clone(&self.0))
    }
}

/// Terminates client TLS with remotely resolved certificates and relays the
/// plaintext to the backend.
pub struct TlsTerminator {
    resolver: Arc<CertificateResolver>,
    ticketer: Arc<dyn ProducesTickets>,
    session_storage: Arc<dyn StoresServerSessions>,
    target: String,
    handshake_timeout: Duration,
    connect_timeout: Duration,
    stats: Arc<AtomicConnectionStats>,
}

impl std::fmt::Debug for TlsTerminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsTerminator")
            .field("resolver", &self.resolver)
            .field("target", &self.target)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}

impl TlsTerminator {
    /// Create a terminator around a resolver.
    #[must_use]
    pub fn new(
        resolver: Arc<CertificateResolver>,
        ticketer: Arc<dyn ProducesTickets>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            ticketer,
            session_storage: ServerSessionMemoryCache::new(SERVER_SESSION_CAPACITY),
            target: target.into(),
            handshake_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(1),
            stats: Arc::new(AtomicConnectionStats::new()),
        }
    }

    /// Build the whole proxy side from configuration: session cache, key
    /// server pool, keyless client, resolver and ticketer.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity, a CA bundle or a server name cannot
    /// be loaded.
    pub fn from_config(config: &ProxyConfig) -> TlsResult<Self> {
        let default_ca = config.identity.ca.as_deref().ok_or_else(|| TlsError::ConfigError {
            message: "proxy identity requires a ca to verify key servers".to_string(),
        })?;
        let connect_timeout = Duration::from_millis(config.connect_timeout_ms);

        let sessions = Arc::new(SessionCache::new(config.session_cache_capacity));
        let store: Arc<dyn ClientSessionStore> = Arc::new(SessionStore::new(sessions));

        let client = client_config(&config.identity, default_ca, Some(Arc::clone(&store)))?;
        let pool = KeyServerPool::from_config(
            &config.distribution,
            TlsDialer::new(Arc::clone(&client), connect_timeout),
        )?;

        let mut keyless = KeylessClient::new(TlsDialer::new(client, connect_timeout));
        for (key_server, ca) in config.host_cas() {
            let client = client_config(&config.identity, ca, Some(Arc::clone(&store)))?;
            keyless = keyless.with_key_server(key_server, TlsDialer::new(client, connect_timeout));
        }

        let resolver = CertificateResolver::new(
            config.hosts.clone().into_iter().collect(),
            Arc::new(pool),
            Arc::new(keyless),
            CertificateCache::new(config.certificate_cache_capacity),
        );

        let ticketer = SharedSecretTicketer::new(
            config.session_ticket_key.as_bytes(),
            config.ticket_lifetime_secs,
        );

        info!(
            hosts = config.hosts.len(),
            backends = config.distribution.backends.len(),
            target = %config.target,
            "TLS terminator configured"
        );

        Ok(Self::new(Arc::new(resolver), Arc::new(ticketer), config.target.clone())
            .with_handshake_timeout(Duration::from_secs(config.handshake_timeout_secs))
            .with_connect_timeout(connect_timeout))
    }

    /// Set the client handshake timeout.
    #[must_use]
    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    /// Set the backend connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// The certificate resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<CertificateResolver> {
        &self.resolver
    }

    /// Get connection statistics.
    #[must_use]
    pub fn stats(&self) -> ConnectionStats {
        self.stats.snapshot()
    }

    /// Bind a listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(address: SocketAddr) -> TlsResult<TcpListener> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| TlsError::BindError { address, source })?;
        info!(addr = %address, "TLS listener started");
        Ok(listener)
    }

    /// Accept connections forever, one task per connection.
    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let terminator = Arc::clone(&self);
                    tokio::spawn(async move {
                        terminator.handle_connection(stream, peer_addr).await;
                    });
                },
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                },
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream, peer_addr: SocketAddr) {
        self.stats.record_connection();

        let tls_result = timeout(self.handshake_timeout, self.accept(stream)).await;

        let tls_stream = match tls_result {
            Ok(Ok(stream)) => {
                self.stats.record_handshake_success();
                stream
            },
            Ok(Err(e)) => {
                self.stats.record_handshake_failure();
                self.stats.record_connection_closed();
                warn!(peer = %peer_addr, error = %e, "TLS handshake failed");
                return;
            },
            Err(_) => {
                self.stats.record_handshake_failure();
                self.stats.record_connection_closed();
                warn!(peer = %peer_addr, "TLS handshake timeout");
                return;
            },
        };

        let sni_name = tls_stream.get_ref().1.server_name().map(str::to_string);

        debug!(peer = %peer_addr, sni = ?sni_name, "TLS connection established");

        let conn = TlsConnection::new(tls_stream, peer_addr, sni_name);
        if let Err(e) = proxy_to_backend(conn, &self.target, self.connect_timeout, &self.stats).await {
            warn!(peer = %peer_addr, error = %e, "Proxy error");
        }

        self.stats.record_connection_closed();
    }

    /// Read the ClientHello, resolve the certificate for its server name and
    /// complete the handshake with it.
    ///
    /// Nothing is sent to the client when resolution fails: there is no
    /// fallback certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the ClientHello cannot be read, the server name
    /// cannot be resolved, or the handshake fails.
    pub async fn accept<S>(&self, stream: S) -> TlsResult<TlsStream<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let start = LazyConfigAcceptor::new(Acceptor::default(), stream)
            .await
            .map_err(TlsError::HandshakeError)?;

        let sni = start.client_hello().server_name().unwrap_or_default().to_string();
        let key = self.resolver.resolve(&sni).await?;

        start
            .into_stream(self.server_config(key))
            .await
            .map_err(TlsError::HandshakeError)
    }

    fn server_config(&self, key: Arc<CertifiedKey>) -> Arc<ServerConfig> {
        let mut config = ServerConfig::builder()
            .with_no_client_auth()
            .with_cert_resolver(Arc::new(ResolvedCertificate(key)));
        config.ticketer = Arc::clone(&self.ticketer);
        config.session_storage = Arc::clone(&self.session_storage);
        Arc::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::certificate::{CertificateRecord, LeafCertificate};
    use crate::modules::key_pool::{CertificateSource, PoolResult};
    use crate::modules::resolver::{HostConfig, ResolveError};
    use crate::modules::signing::{SigningService, SigningResult};
    use crate::test_support::Pki;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_rustls::rustls::pki_types::ServerName;
    use tokio_rustls::rustls::sign::SigningKey;
    use tokio_rustls::rustls::{ClientConfig, RootCertStore};
    use tokio_rustls::TlsConnector;

    /// Serves the local chain and key for www.example.com.
    struct LocalSource(CertificateRecord);

    #[async_trait]
    impl CertificateSource for LocalSource {
        async fn send(&self, hostname: &str) -> PoolResult<CertificateRecord> {
            if hostname == "www.example.com" {
                Ok(self.0.clone())
            } else {
                Ok(CertificateRecord::empty())
            }
        }
    }

    struct LocalSigning(Arc<dyn SigningKey>);

    #[async_trait]
    impl SigningService for LocalSigning {
        async fn bind(&self, _: &str, _: &LeafCertificate) -> SigningResult<Arc<dyn SigningKey>> {
            Ok(Arc::clone(&self.0))
        }
    }

    fn terminator(pki: &Pki) -> TlsTerminator {
        let www = pki.leaf("www.example.com");
        let hosts = HashMap::from([
            ("www.example.com".to_string(), HostConfig::new("keys:2407")),
            ("api.example.com".to_string(), HostConfig::new("keys:2407")),
        ]);
        let resolver = CertificateResolver::new(
            hosts,
            Arc::new(LocalSource(CertificateRecord::new(www.chain()))),
            Arc::new(LocalSigning(www.signing_key())),
            CertificateCache::default(),
        );
        TlsTerminator::new(
            Arc::new(resolver),
            Arc::new(SharedSecretTicketer::new(b"secret", 3600)),
            "127.0.0.1:1",
        )
    }

    fn connector(pki: &Pki) -> TlsConnector {
        let mut roots = RootCertStore::empty();
        roots.add(pki.leaf("unused").chain()[1].clone()).unwrap();
        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        TlsConnector::from(Arc::new(config))
    }

    #[tokio::test]
    async fn test_handshake_with_resolved_certificate() {
        let pki = Pki::new();
        let terminator = terminator(&pki);
        let (client, server) = tokio::io::duplex(64 * 1024);

        let name = ServerName::try_from("www.example.com").unwrap();
        let (accepted, connected) =
            tokio::join!(terminator.accept(server), connector(&pki).connect(name, client));

        let mut server = accepted.unwrap();
        let mut client = connected.unwrap();

        client.write_all(b"ping").await.unwrap();
        client.flush().await.unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
        assert_eq!(server.get_ref().1.server_name(), Some("www.example.com"));
    }

    #[tokio::test]
    async fn test_unauthorized_sni_fails_closed() {
        let pki = Pki::new();
        let terminator = terminator(&pki);
        let (client, server) = tokio::io::duplex(64 * 1024);

        let name = ServerName::try_from("evil.example.com").unwrap();
        let connect = connector(&pki).connect(name, client);
        let accept = async {
            let result = terminator.accept(server).await;
            // Dropping the server side ends the client's handshake.
            result.map(|_| ())
        };
        let (accepted, connected) = tokio::join!(accept, connect);

        assert!(matches!(
            accepted,
            Err(TlsError::Resolve(ResolveError::NotAuthorized { .. }))
        ));
        assert!(connected.is_err());
    }

    #[tokio::test]
    async fn test_missing_certificate_fails_closed() {
        let pki = Pki::new();
        let terminator = terminator(&pki);
        let (client, server) = tokio::io::duplex(64 * 1024);

        let name = ServerName::try_from("api.example.com").unwrap();
        let (accepted, connected) = tokio::join!(
            async { terminator.accept(server).await.map(|_| ()) },
            connector(&pki).connect(name, client)
        );

        assert!(matches!(
            accepted,
            Err(TlsError::Resolve(ResolveError::NoSuchCertificate { .. }))
        ));
        assert!(connected.is_err());
    }
}
