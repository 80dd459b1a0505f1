//! Bounded TLS dialing.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::TlsConnector;
use tracing::trace;

use super::error::{TransportError, TransportResult};

/// Default bound on connect plus handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Something that can open a byte stream to a `host:port` address.
#[async_trait]
pub trait Dial: Send + Sync + 'static {
    /// The connected stream.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open a stream to `addr`.
    async fn dial(&self, addr: &str) -> TransportResult<Self::Stream>;
}

/// Dials TLS connections with a fixed client configuration.
#[derive(Clone)]
pub struct TlsDialer {
    connector: TlsConnector,
    server_name: Option<ServerName<'static>>,
    connect_timeout: Duration,
}

impl fmt::Debug for TlsDialer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsDialer")
            .field("server_name", &self.server_name)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl TlsDialer {
    /// Create a dialer. The server name defaults to the host part of each
    /// dialed address.
    #[must_use]
    pub fn new(config: Arc<ClientConfig>, connect_timeout: Duration) -> Self {
        Self {
            connector: TlsConnector::from(config),
            server_name: None,
            connect_timeout,
        }
    }

    /// Verify every peer against this name instead of the dialed host.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid DNS name or IP address.
    pub fn with_server_name(mut self, name: &str) -> TransportResult<Self> {
        self.server_name = Some(parse_server_name(name)?);
        Ok(self)
    }

    /// The connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    fn server_name_for(&self, addr: &str) -> TransportResult<ServerName<'static>> {
        if let Some(name) = &self.server_name {
            return Ok(name.clone());
        }

        let host = addr.rsplit_once(':').map_or(addr, |(host, _)| host);
        let host = host.trim_start_matches('[').trim_end_matches(']');
        parse_server_name(host)
    }

    async fn connect(&self, addr: &str) -> TransportResult<TlsStream<TcpStream>> {
        let server_name = self.server_name_for(addr)?;

        let tcp = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::ConnectError {
                address: addr.to_string(),
                source,
            })?;
        tcp.set_nodelay(true)
            .map_err(|source| TransportError::ConnectError {
                address: addr.to_string(),
                source,
            })?;

        self.connector
            .connect(server_name, tcp)
            .await
            .map_err(|source| TransportError::HandshakeError {
                address: addr.to_string(),
                source,
            })
    }
}

#[async_trait]
impl Dial for TlsDialer {
    type Stream = TlsStream<TcpStream>;

    async fn dial(&self, addr: &str) -> TransportResult<Self::Stream> {
        let stream = timeout(self.connect_timeout, self.connect(addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                address: addr.to_string(),
            })??;

        trace!(address = %addr, "TLS connection established");
        Ok(stream)
    }
}

fn parse_server_name(name: &str) -> TransportResult<ServerName<'static>> {
    ServerName::try_from(name.to_string()).map_err(|_| TransportError::InvalidServerName {
        name: name.to_string(),
    })
}
