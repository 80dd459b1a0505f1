//! PEM loading and rustls configuration builders.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls_pemfile::{certs, private_key};
use tokio_rustls::rustls::client::{ClientSessionStore, Resumption};
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::{ClientConfig, RootCertStore, ServerConfig};
use tracing::debug;

use super::config::IdentityConfig;
use super::error::{TransportError, TransportResult};

/// Load certificates from a PEM file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no certificates.
pub fn load_certificates(path: &Path) -> TransportResult<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| TransportError::CertificateLoadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut reader = BufReader::new(file);

    let certificates = certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::CertificateLoadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    if certificates.is_empty() {
        return Err(TransportError::CertificateLoadError {
            path: path.display().to_string(),
            message: "No certificates found in file".to_string(),
        });
    }

    Ok(certificates)
}

/// Load a private key from a PEM file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no key.
pub fn load_private_key(path: &Path) -> TransportResult<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| TransportError::PrivateKeyLoadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut reader = BufReader::new(file);

    private_key(&mut reader)
        .map_err(|e| TransportError::PrivateKeyLoadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?
        .ok_or_else(|| TransportError::PrivateKeyLoadError {
            path: path.display().to_string(),
            message: "No private key found in file".to_string(),
        })
}

/// Load a CA bundle into a root store.
///
/// # Errors
///
/// Returns an error if the bundle cannot be loaded or a certificate is
/// rejected as a trust anchor.
pub fn load_roots(path: &Path) -> TransportResult<RootCertStore> {
    let mut roots = RootCertStore::empty();
    for cert in load_certificates(path)? {
        roots
            .add(cert)
            .map_err(|e| TransportError::CertificateLoadError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
    }
    Ok(roots)
}

/// Build a client configuration that presents `identity` and verifies the
/// server against `ca`.
///
/// When `session_store` is given, sessions are resumed through it.
///
/// # Errors
///
/// Returns an error if any PEM file cannot be loaded or rustls rejects the
/// identity.
pub fn client_config(
    identity: &IdentityConfig,
    ca: &Path,
    session_store: Option<Arc<dyn ClientSessionStore>>,
) -> TransportResult<Arc<ClientConfig>> {
    let roots = load_roots(ca)?;
    let chain = load_certificates(&identity.cert)?;
    let key = load_private_key(&identity.key)?;

    let mut config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_client_auth_cert(chain, key)
        .map_err(|e| TransportError::ConfigError {
            message: e.to_string(),
        })?;

    if let Some(store) = session_store {
        config.resumption = Resumption::store(store);
    }

    debug!(cert = %identity.cert.display(), ca = %ca.display(), "Built TLS client configuration");

    Ok(Arc::new(config))
}

/// Build a server configuration that presents `identity`.
///
/// Client certificates are required and verified when `identity.ca` is set.
///
/// # Errors
///
/// Returns an error if any PEM file cannot be loaded or rustls rejects the
/// identity.
pub fn server_config(identity: &IdentityConfig) -> TransportResult<Arc<ServerConfig>> {
    let chain = load_certificates(&identity.cert)?;
    let key = load_private_key(&identity.key)?;

    let builder = ServerConfig::builder();
    let builder = match identity.ca.as_deref() {
        Some(ca) => {
            let roots = Arc::new(load_roots(ca)?);
            let verifier = WebPkiClientVerifier::builder(roots).build().map_err(|e| {
                TransportError::ConfigError {
                    message: e.to_string(),
                }
            })?;
            builder.with_client_cert_verifier(verifier)
        },
        None => builder.with_no_client_auth(),
    };

    let config = builder
        .with_single_cert(chain, key)
        .map_err(|e| TransportError::ConfigError {
            message: e.to_string(),
        })?;

    debug!(
        cert = %identity.cert.display(),
        client_auth = identity.ca.is_some(),
        "Built TLS server configuration"
    );

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Pki, SERVER_NAME};

    #[test]
    fn test_missing_certificate_file() {
        let result = load_certificates(Path::new("/nonexistent/cert.pem"));
        assert!(matches!(
            result,
            Err(TransportError::CertificateLoadError { .. })
        ));
    }

    #[test]
    fn test_missing_private_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.key");
        std::fs::write(&path, "").unwrap();

        let result = load_private_key(&path);
        assert!(matches!(
            result,
            Err(TransportError::PrivateKeyLoadError { .. })
        ));
    }

    #[test]
    fn test_build_configs() {
        let dir = tempfile::tempdir().unwrap();
        let pki = Pki::new();
        let ca = pki.write_ca(dir.path());
        let (cert, key) = pki.leaf(SERVER_NAME).write(dir.path(), "server");

        let identity = IdentityConfig::new(cert, key);
        assert!(server_config(&identity).is_ok());
        assert!(server_config(&identity.clone().with_ca(ca.clone())).is_ok());
        assert!(client_config(&identity, &ca, None).is_ok());
    }
}
