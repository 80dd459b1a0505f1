//! Server half of the distribution protocol.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, trace, warn};

use super::allow_list::AllowList;
use super::config::DistributionServerConfig;
use super::error::{ProtocolError, ProtocolResult};
use super::store::CertificateStore;
use crate::codec::{read_line, write_message};
use crate::modules::certificate::CertificateRecord;

/// Distribution server counters.
#[derive(Debug, Default)]
pub struct ServerStats {
    accepted: AtomicU64,
    denied: AtomicU64,
    lookups: AtomicU64,
    misses: AtomicU64,
}

impl ServerStats {
    /// Connections admitted past the allow-list.
    #[must_use]
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Connections closed because the peer was not allow-listed.
    #[must_use]
    pub fn denied(&self) -> u64 {
        self.denied.load(Ordering::Relaxed)
    }

    /// Hostname requests answered.
    #[must_use]
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Requests answered with an empty record.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Serves certificate chains to allow-listed proxies.
pub struct DistributionServer {
    store: CertificateStore,
    allow_list: AllowList,
    acceptor: TlsAcceptor,
    handshake_timeout: Duration,
    stats: ServerStats,
}

impl std::fmt::Debug for DistributionServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributionServer")
            .field("hostnames", &self.store.len())
            .field("allow_list", &self.allow_list)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}

impl DistributionServer {
    /// Create a server from a loaded store.
    #[must_use]
    pub fn new(store: CertificateStore, allow_list: AllowList, tls: Arc<ServerConfig>) -> Self {
        Self {
            store,
            allow_list,
            acceptor: TlsAcceptor::from(tls),
            handshake_timeout: Duration::from_secs(10),
            stats: ServerStats::default(),
        }
    }

    /// Create a server from configuration, loading every configured chain.
    ///
    /// # Errors
    ///
    /// Returns an error if a certificate chain cannot be loaded.
    pub fn from_config(
        config: &DistributionServerConfig,
        tls: Arc<ServerConfig>,
    ) -> ProtocolResult<Self> {
        let store = CertificateStore::load(&config.hosts)?;
        let allow_list = AllowList::new(config.allow.iter().copied());

        Ok(Self::new(store, allow_list, tls)
            .with_handshake_timeout(Duration::from_secs(config.handshake_timeout_secs)))
    }

    /// Set the TLS handshake timeout.
    #[must_use]
    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    /// Server counters.
    #[must_use]
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Bind a listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(address: SocketAddr) -> ProtocolResult<TcpListener> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ProtocolError::BindError { address, source })?;
        info!(addr = %address, "Distribution server listening");
        Ok(listener)
    }

    /// Accept connections forever, one task per connection.
    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        server.handle_connection(stream, peer).await;
                    });
                },
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                },
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        // Checked before the handshake: a denied peer gets nothing back.
        if !self.allow_list.is_allowed(peer.ip()) {
            self.stats.denied.fetch_add(1, Ordering::Relaxed);
            warn!(peer = %peer, "Access denied");
            return;
        }
        self.stats.accepted.fetch_add(1, Ordering::Relaxed);

        let tls_stream = match timeout(self.handshake_timeout, self.acceptor.accept(stream)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!(peer = %peer, error = %e, "TLS handshake failed");
                return;
            },
            Err(_) => {
                warn!(peer = %peer, "TLS handshake timeout");
                return;
            },
        };

        debug!(peer = %peer, "Distribution connection established");

        match self.serve(tls_stream).await {
            Ok(requests) => debug!(peer = %peer, requests, "Distribution connection closed"),
            Err(e) => warn!(peer = %peer, error = %e, "Distribution connection failed"),
        }
    }

    /// Answer hostname requests on an established stream until the peer
    /// disconnects. Returns the number of requests answered.
    ///
    /// # Errors
    ///
    /// Returns an error if a request cannot be read or a response cannot be
    /// written. The stream is dropped either way.
    pub async fn serve<S>(&self, stream: S) -> ProtocolResult<u64>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stream = BufReader::new(stream);
        let empty = CertificateRecord::empty();
        let mut requests = 0;

        while let Some(hostname) = read_line(&mut stream)
            .await
            .map_err(ProtocolError::ReadFailed)?
        {
            let record = match self.store.lookup(&hostname) {
                Some(record) => record,
                None => {
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    &empty
                },
            };
            trace!(hostname = %hostname, found = !record.is_empty(), "Certificate lookup");

            write_message(stream.get_mut(), record)
                .await
                .map_err(ProtocolError::WriteFailed)?;

            self.stats.lookups.fetch_add(1, Ordering::Relaxed);
            requests += 1;
        }

        Ok(requests)
    }
}
