//! Terminated connections and the relay to the backend.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use super::error::{TlsError, TlsResult};

/// Counter for generating connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A client connection after a successful handshake.
pub struct TlsConnection<S> {
    /// The decrypted stream.
    stream: S,

    /// Peer address.
    peer_addr: SocketAddr,

    /// Connection ID.
    id: u64,

    /// SNI name from handshake.
    sni_name: Option<String>,
}

impl<S> TlsConnection<S> {
    /// Create a new connection.
    pub fn new(stream: S, peer_addr: SocketAddr, sni_name: Option<String>) -> Self {
        Self {
            stream,
            peer_addr,
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            sni_name,
        }
    }

    /// Get the connection ID.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the peer address.
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the SNI name.
    #[must_use]
    pub fn sni_name(&self) -> Option<&str> {
        self.sni_name.as_deref()
    }
}

impl<S> std::fmt::Debug for TlsConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConnection")
            .field("id", &self.id)
            .field("peer", &self.peer_addr)
            .field("sni", &self.sni_name)
            .finish()
    }
}

/// Connection statistics.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Total connections accepted.
    pub total_connections: u64,

    /// Active connections.
    pub active_connections: u64,

    /// Successful handshakes.
    pub successful_handshakes: u64,

    /// Failed handshakes.
    pub failed_handshakes: u64,

    /// Bytes from clients to the backend.
    pub bytes_read: u64,

    /// Bytes from the backend to clients.
    pub bytes_written: u64,
}

/// Atomic connection statistics.
#[derive(Debug, Default)]
pub struct AtomicConnectionStats {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    successful_handshakes: AtomicU64,
    failed_handshakes: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
}

impl AtomicConnectionStats {
    /// Create new atomic stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection.
    pub fn record_connection(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record connection closed.
    pub fn record_connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record successful handshake.
    pub fn record_handshake_success(&self) {
        self.successful_handshakes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record failed handshake.
    pub fn record_handshake_failure(&self) {
        self.failed_handshakes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_bytes_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    fn record_bytes_written(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Get current statistics.
    #[must_use]
    pub fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            successful_handshakes: self.successful_handshakes.load(Ordering::Relaxed),
            failed_handshakes: self.failed_handshakes.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}

/// Dial the backend and relay a terminated connection to it.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached in time.
pub async fn proxy_to_backend<S>(
    conn: TlsConnection<S>,
    target: &str,
    connect_timeout: Duration,
    stats: &Arc<AtomicConnectionStats>,
) -> TlsResult<(u64, u64)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    debug!(conn_id = conn.id(), backend = %target, "Proxying to backend");

    let backend = match timeout(connect_timeout, TcpStream::connect(target)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            return Err(TlsError::BackendError {
                address: target.to_string(),
                message: e.to_string(),
            })
        },
        Err(_) => {
            return Err(TlsError::BackendError {
                address: target.to_string(),
                message: "connect timed out".to_string(),
            })
        },
    };

    let id = conn.id();
    let (bytes_in, bytes_out) = relay(conn.stream, backend, stats).await;

    debug!(conn_id = id, bytes_in, bytes_out, "Proxy completed");

    Ok((bytes_in, bytes_out))
}

/// Copy bytes both ways until either side closes or fails.
///
/// The first direction to finish ends the relay: both write halves are shut
/// down and both streams dropped. Returns bytes client→backend and
/// backend→client.
pub async fn relay<C, B>(client: C, backend: B, stats: &Arc<AtomicConnectionStats>) -> (u64, u64)
where
    C: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut backend_read, mut backend_write) = tokio::io::split(backend);

    let mut bytes_in = 0u64;
    let mut bytes_out = 0u64;

    {
        let client_to_backend = copy_direction(&mut client_read, &mut backend_write, &mut bytes_in, |n| {
            stats.record_bytes_read(n);
        });
        let backend_to_client = copy_direction(&mut backend_read, &mut client_write, &mut bytes_out, |n| {
            stats.record_bytes_written(n);
        });

        tokio::select! {
            () = client_to_backend => trace!("Client side finished"),
            () = backend_to_client => trace!("Backend side finished"),
        }
    }

    let _ = backend_write.shutdown().await;
    let _ = client_write.shutdown().await;

    (bytes_in, bytes_out)
}

async fn copy_direction<R, W>(reader: &mut R, writer: &mut W, total: &mut u64, record: impl Fn(u64))
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        if writer.write_all(&buf[..n]).await.is_err() {
            break;
        }
        *total += n as u64;
        record(n as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_atomic_stats() {
        let stats = AtomicConnectionStats::new();

        stats.record_connection();
        stats.record_handshake_success();
        stats.record_bytes_read(100);
        stats.record_bytes_written(200);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_connections, 1);
        assert_eq!(snapshot.active_connections, 1);
        assert_eq!(snapshot.successful_handshakes, 1);
        assert_eq!(snapshot.bytes_read, 100);
        assert_eq!(snapshot.bytes_written, 200);

        stats.record_connection_closed();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.active_connections, 0);
    }

    #[tokio::test]
    async fn test_relay_both_directions() {
        let stats = Arc::new(AtomicConnectionStats::new());
        let (client, proxy_side) = tokio::io::duplex(1024);
        let (backend, backend_side) = tokio::io::duplex(1024);

        // Backend: answer with an uppercased copy, then close.
        let backend_task = tokio::spawn(async move {
            let mut backend = backend;
            let mut received = [0u8; 13];
            backend.read_exact(&mut received).await.unwrap();
            backend.write_all(&received.to_ascii_uppercase()).await.unwrap();
        });

        let client_task = tokio::spawn(async move {
            let mut client = client;
            client.write_all(b"hello backend").await.unwrap();
            let mut reply = Vec::new();
            client.read_to_end(&mut reply).await.unwrap();
            reply
        });

        let (bytes_in, bytes_out) = relay(proxy_side, backend_side, &stats).await;

        assert_eq!(client_task.await.unwrap(), b"HELLO BACKEND");
        backend_task.await.unwrap();
        assert_eq!((bytes_in, bytes_out), (13, 13));
        assert_eq!(stats.snapshot().bytes_read, 13);
        assert_eq!(stats.snapshot().bytes_written, 13);
    }

    #[tokio::test]
    async fn test_relay_ends_when_backend_closes() {
        let stats = Arc::new(AtomicConnectionStats::new());
        let (mut client, proxy_side) = tokio::io::duplex(1024);
        let (backend, backend_side) = tokio::io::duplex(1024);

        drop(backend);

        let result = timeout(
            Duration::from_secs(2),
            relay(proxy_side, backend_side, &stats),
        )
        .await;
        assert_eq!(result.unwrap(), (0, 0));

        // The client, still open on its side, sees the end of stream.
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_relay_ends_when_client_closes() {
        let stats = Arc::new(AtomicConnectionStats::new());
        let (mut client, proxy_side) = tokio::io::duplex(1024);
        let (mut backend, backend_side) = tokio::io::duplex(1024);

        client.write_all(b"bye").await.unwrap();
        drop(client);

        let result = timeout(
            Duration::from_secs(2),
            relay(proxy_side, backend_side, &stats),
        )
        .await;
        assert_eq!(result.unwrap(), (3, 0));

        let mut received = Vec::new();
        backend.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"bye");
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();
        drop(listener);

        let (stream, _peer) = tokio::io::duplex(64);
        let conn = TlsConnection::new(stream, "127.0.0.1:1".parse().unwrap(), None);
        let stats = Arc::new(AtomicConnectionStats::new());

        assert!(matches!(
            proxy_to_backend(conn, &target, Duration::from_millis(500), &stats).await,
            Err(TlsError::BackendError { .. })
        ));
    }
}
