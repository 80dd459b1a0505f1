//! Proxy half of the signing protocol.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_rustls::rustls::sign::{Signer, SigningKey};
use tokio_rustls::rustls::{Error as RustlsError, SignatureAlgorithm, SignatureScheme};
use tracing::{debug, trace};

use super::error::{SigningError, SigningResult};
use super::protocol::{algorithm_for, parse_scheme, scheme_name, SigningRequest, SigningResponse};
use super::service::SigningService;
use crate::codec::{read_message, write_message};
use crate::modules::certificate::LeafCertificate;
use crate::modules::transport::{Dial, TlsDialer};

/// One key server, reached through a dialer.
struct Endpoint<D> {
    dialer: Arc<D>,
    address: String,
}

impl<D: Dial> Endpoint<D> {
    /// One request/response exchange on a fresh connection.
    async fn call(&self, request: &SigningRequest) -> SigningResult<SigningResponse> {
        let stream = self.dialer.dial(&self.address).await?;
        let mut stream = BufReader::new(stream);

        write_message(stream.get_mut(), request).await?;
        let response = read_message(&mut stream)
            .await?
            .ok_or(SigningError::Closed)?;

        match response {
            SigningResponse::Error { message } => Err(SigningError::Refused { message }),
            response => Ok(response),
        }
    }

    async fn sign(&self, key_id: &str, scheme: SignatureScheme, payload: &[u8]) -> SigningResult<Vec<u8>> {
        let request = SigningRequest::Sign {
            key_id: key_id.to_string(),
            scheme: scheme_name(scheme),
            payload: payload.to_vec(),
        };

        match self.call(&request).await? {
            SigningResponse::Signature { signature } => Ok(signature),
            _ => Err(SigningError::UnexpectedResponse),
        }
    }
}

/// Binds certificates to remote keys over mutually authenticated TLS.
///
/// Key servers listed with [`with_key_server`](Self::with_key_server) use
/// their own dialer (for a per-host CA); every other address uses the
/// default one.
pub struct KeylessClient<D = TlsDialer> {
    default_dialer: Arc<D>,
    dialers: HashMap<String, Arc<D>>,
}

impl<D> std::fmt::Debug for KeylessClient<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeylessClient")
            .field("key_servers", &self.dialers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<D: Dial> KeylessClient<D> {
    /// Create a client that reaches every key server with `dialer`.
    pub fn new(dialer: D) -> Self {
        Self {
            default_dialer: Arc::new(dialer),
            dialers: HashMap::new(),
        }
    }

    /// Reach `address` with `dialer` instead of the default.
    #[must_use]
    pub fn with_key_server(mut self, address: impl Into<String>, dialer: D) -> Self {
        self.dialers.insert(address.into(), Arc::new(dialer));
        self
    }

    fn endpoint(&self, address: &str) -> Endpoint<D> {
        let dialer = self
            .dialers
            .get(address)
            .unwrap_or(&self.default_dialer);

        Endpoint {
            dialer: Arc::clone(dialer),
            address: address.to_string(),
        }
    }
}

#[async_trait]
impl<D: Dial> SigningService for KeylessClient<D> {
    async fn bind(
        &self,
        key_server: &str,
        leaf: &LeafCertificate,
    ) -> SigningResult<Arc<dyn SigningKey>> {
        let endpoint = self.endpoint(key_server);
        let request = SigningRequest::Bind {
            key_id: leaf.key_id().to_string(),
        };

        let names = match endpoint.call(&request).await? {
            SigningResponse::Bound { schemes } => schemes,
            _ => return Err(SigningError::UnexpectedResponse),
        };

        // Names this build does not know are ignored.
        let schemes: Vec<SignatureScheme> = names.iter().filter_map(|n| parse_scheme(n)).collect();
        let Some(first) = schemes.first() else {
            return Err(SigningError::NoSupportedScheme {
                key_id: leaf.key_id().to_string(),
            });
        };

        debug!(
            key_server = %key_server,
            key_id = %leaf.key_id(),
            schemes = ?schemes,
            "Bound remote signing key"
        );

        Ok(Arc::new(RemoteSigningKey {
            endpoint: Arc::new(endpoint),
            key_id: leaf.key_id().to_string(),
            algorithm: algorithm_for(*first),
            schemes,
        }))
    }
}

/// A [`SigningKey`] whose private half lives on a key server.
pub struct RemoteSigningKey<D = TlsDialer> {
    endpoint: Arc<Endpoint<D>>,
    key_id: String,
    algorithm: SignatureAlgorithm,
    schemes: Vec<SignatureScheme>,
}

impl<D> RemoteSigningKey<D> {
    /// Identifier of the remote key.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Schemes the key server offered for this key.
    #[must_use]
    pub fn schemes(&self) -> &[SignatureScheme] {
        &self.schemes
    }
}

impl<D> std::fmt::Debug for RemoteSigningKey<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSigningKey")
            .field("key_server", &self.endpoint.address)
            .field("key_id", &self.key_id)
            .field("schemes", &self.schemes)
            .finish()
    }
}

impl<D: Dial> SigningKey for RemoteSigningKey<D> {
    fn choose_scheme(&self, offered: &[SignatureScheme]) -> Option<Box<dyn Signer>> {
        let scheme = self.schemes.iter().copied().find(|s| offered.contains(s))?;
        Some(Box::new(RemoteSigner {
            endpoint: Arc::clone(&self.endpoint),
            key_id: self.key_id.clone(),
            scheme,
        }))
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }
}

struct RemoteSigner<D> {
    endpoint: Arc<Endpoint<D>>,
    key_id: String,
    scheme: SignatureScheme,
}

impl<D> std::fmt::Debug for RemoteSigner<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSigner")
            .field("key_server", &self.endpoint.address)
            .field("key_id", &self.key_id)
            .field("scheme", &self.scheme)
            .finish()
    }
}

impl<D: Dial> Signer for RemoteSigner<D> {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, RustlsError> {
        // rustls signs synchronously from inside the handshake task.
        let handle = Handle::try_current()
            .map_err(|_| RustlsError::General("remote signing requires a Tokio runtime".into()))?;
        if handle.runtime_flavor() == RuntimeFlavor::CurrentThread {
            return Err(RustlsError::General(
                "remote signing requires a multi-threaded runtime".into(),
            ));
        }

        trace!(key_server = %self.endpoint.address, key_id = %self.key_id, "Remote sign");

        tokio::task::block_in_place(|| {
            handle.block_on(self.endpoint.sign(&self.key_id, self.scheme, message))
        })
        .map_err(|e| RustlsError::General(format!("remote signing failed: {e}")))
    }

    fn scheme(&self) -> SignatureScheme {
        self.scheme
    }
}
