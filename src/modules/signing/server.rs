//! Key server half of the signing protocol.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_rustls::rustls::crypto::aws_lc_rs::sign::any_supported_type;
use tokio_rustls::rustls::sign::SigningKey;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, trace, warn};

use super::config::{KeyPairConfig, SigningServerConfig};
use super::error::{SigningError, SigningResult};
use super::protocol::{parse_scheme, scheme_name, SigningRequest, SigningResponse, SUPPORTED_SCHEMES};
use crate::codec::{read_message, write_message};
use crate::modules::certificate::CertificateRecord;
use crate::modules::transport::load_private_key;

/// Holds private keys and signs on behalf of authenticated proxies.
pub struct SigningServer {
    keys: HashMap<String, Arc<dyn SigningKey>>,
    acceptor: TlsAcceptor,
    handshake_timeout: Duration,
}

impl std::fmt::Debug for SigningServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningServer")
            .field("keys", &self.keys.len())
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}

impl SigningServer {
    /// Create a server without keys.
    #[must_use]
    pub fn new(tls: Arc<ServerConfig>) -> Self {
        Self {
            keys: HashMap::new(),
            acceptor: TlsAcceptor::from(tls),
            handshake_timeout: Duration::from_secs(10),
        }
    }

    /// Create a server and load every configured key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if a key pair cannot be loaded.
    pub fn from_config(config: &SigningServerConfig, tls: Arc<ServerConfig>) -> SigningResult<Self> {
        let mut server = Self::new(tls);
        server.handshake_timeout = Duration::from_secs(config.handshake_timeout_secs);

        for pair in &config.keys {
            let key_id = server.load_key_pair(pair)?;
            info!(key_id = %key_id, certificate = %pair.certificate.display(), "Loaded signing key");
        }

        Ok(server)
    }

    fn load_key_pair(&mut self, pair: &KeyPairConfig) -> SigningResult<String> {
        let leaf = CertificateRecord::load_pem(&pair.certificate)
            .and_then(|record| record.leaf())
            .map_err(|e| SigningError::KeyLoadError {
                path: pair.certificate.display().to_string(),
                message: e.to_string(),
            })?;

        let der = load_private_key(&pair.key).map_err(|e| SigningError::KeyLoadError {
            path: pair.key.display().to_string(),
            message: e.to_string(),
        })?;
        let key = any_supported_type(&der).map_err(|e| SigningError::KeyLoadError {
            path: pair.key.display().to_string(),
            message: e.to_string(),
        })?;

        let key_id = leaf.key_id().to_string();
        self.insert_key(key_id.clone(), key);
        Ok(key_id)
    }

    /// Hold `key` under `key_id`.
    pub fn insert_key(&mut self, key_id: String, key: Arc<dyn SigningKey>) {
        self.keys.insert(key_id, key);
    }

    /// Number of keys held.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Bind a listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(address: SocketAddr) -> SigningResult<TcpListener> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| SigningError::BindError { address, source })?;
        info!(addr = %address, "Signing server listening");
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

        if let Err(e) = self.serve(tls_stream).await {
            warn!(peer = %peer, error = %e, "Signing connection failed");
        }
    }

    /// Answer signing requests until the peer disconnects.
    ///
    /// # Errors
    ///
    /// Returns an error if a request cannot be read or decoded, or a response
    /// cannot be written.
    pub async fn serve<S>(&self, stream: S) -> SigningResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stream = BufReader::new(stream);

        while let Some(request) = read_message::<_, SigningRequest>(&mut stream).await? {
            let response = self.respond(request);
            write_message(stream.get_mut(), &response).await?;
        }

        Ok(())
    }

    fn respond(&self, request: SigningRequest) -> SigningResponse {
        match request {
            SigningRequest::Bind { key_id } => match self.keys.get(&key_id) {
                Some(key) => {
                    let schemes: Vec<String> = SUPPORTED_SCHEMES
                        .iter()
                        .filter(|s| key.choose_scheme(&[**s]).is_some())
                        .map(|s| scheme_name(*s))
                        .collect();
                    debug!(key_id = %key_id, schemes = ?schemes, "Bound key");
                    SigningResponse::Bound { schemes }
                },
                None => {
                    debug!(key_id = %key_id, "Bind for unknown key");
                    SigningResponse::Error {
                        message: format!("unknown key {key_id}"),
                    }
                },
            },
            SigningRequest::Sign {
                key_id,
                scheme,
                payload,
            } => match self.sign(&key_id, &scheme, &payload) {
                Ok(signature) => {
                    trace!(key_id = %key_id, scheme = %scheme, "Signed payload");
                    SigningResponse::Signature { signature }
                },
                Err(message) => {
                    debug!(key_id = %key_id, scheme = %scheme, error = %message, "Sign request refused");
                    SigningResponse::Error { message }
                },
            },
        }
    }

    fn sign(&self, key_id: &str, scheme: &str, payload: &[u8]) -> Result<Vec<u8>, String> {
        let key = self
            .keys
            .get(key_id)
            .ok_or_else(|| format!("unknown key {key_id}"))?;
        let scheme = parse_scheme(scheme).ok_or_else(|| format!("unknown scheme {scheme}"))?;
        let signer = key
            .choose_scheme(&[scheme])
            .ok_or_else(|| format!("scheme {scheme:?} not supported by key"))?;
        signer.sign(payload).map_err(|e| e.to_string())
    }
}
