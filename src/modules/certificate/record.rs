//! Certificate records and leaf parsing.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rustls_pemfile::certs;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_rustls::rustls::pki_types::CertificateDer;
use tracing::debug;

use super::error::{CertificateError, CertificateResult};
use crate::codec::base64_bytes;

/// An ordered certificate chain, leaf first.
///
/// A record with an empty chain means "no certificate for this hostname" and
/// must never be served.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireRecord", into = "WireRecord")]
pub struct CertificateRecord {
    chain: Vec<CertificateDer<'static>>,
}

/// Wire form of a record: the chain and nothing else.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireRecord {
    #[serde(with = "base64_bytes::list")]
    chain: Vec<Vec<u8>>,
}

impl From<WireRecord> for CertificateRecord {
    fn from(wire: WireRecord) -> Self {
        Self::new(wire.chain.into_iter().map(CertificateDer::from).collect())
    }
}

impl From<CertificateRecord> for WireRecord {
    fn from(record: CertificateRecord) -> Self {
        Self {
            chain: record.chain.iter().map(|c| c.as_ref().to_vec()).collect(),
        }
    }
}

impl CertificateRecord {
    /// Create a record from a chain.
    #[must_use]
    pub fn new(chain: Vec<CertificateDer<'static>>) -> Self {
        Self { chain }
    }

    /// The "not found" record.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every `CERTIFICATE` block of a PEM file, in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds no certificates.
    pub fn load_pem(path: &Path) -> CertificateResult<Self> {
        let file = File::open(path).map_err(|e| CertificateError::LoadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut reader = BufReader::new(file);

        let chain = certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CertificateError::LoadError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        if chain.is_empty() {
            return Err(CertificateError::LoadError {
                path: path.display().to_string(),
                message: "No certificates found in file".to_string(),
            });
        }

        debug!(path = %path.display(), cert_count = chain.len(), "Certificate chain loaded");

        Ok(Self { chain })
    }

    /// The chain, leaf first.
    #[must_use]
    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }

    /// Consume the record and return the chain.
    #[must_use]
    pub fn into_chain(self) -> Vec<CertificateDer<'static>> {
        self.chain
    }

    /// Check whether this is the "not found" record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Parse the leaf certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain is empty or the leaf is not valid X.509.
    pub fn leaf(&self) -> CertificateResult<LeafCertificate> {
        let der = self.chain.first().ok_or(CertificateError::EmptyChain)?;
        LeafCertificate::parse(der)
    }
}

/// The parsed parts of a leaf certificate the proxy needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafCertificate {
    subject: String,
    spki: Vec<u8>,
    key_id: String,
}

impl LeafCertificate {
    /// Parse a DER certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate is not valid X.509.
    pub fn parse(der: &CertificateDer<'_>) -> CertificateResult<Self> {
        let (_, cert) = x509_parser::parse_x509_certificate(der.as_ref()).map_err(|e| {
            CertificateError::InvalidLeaf {
                message: e.to_string(),
            }
        })?;

        let spki = cert.public_key().raw.to_vec();

        Ok(Self {
            subject: cert.subject().to_string(),
            key_id: key_id_for_spki(&spki),
            spki,
        })
    }

    /// The subject distinguished name.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The DER-encoded SubjectPublicKeyInfo.
    #[must_use]
    pub fn spki(&self) -> &[u8] {
        &self.spki
    }

    /// Identifier of the key pair: hex SHA-256 of the SubjectPublicKeyInfo.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

/// Compute the key identifier shared by proxy and key server.
#[must_use]
pub fn key_id_for_spki(spki: &[u8]) -> String {
    hex::encode(Sha256::digest(spki))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Pki;
    use std::io::Write;

    #[test]
    fn test_empty_record() {
        let record = CertificateRecord::empty();
        assert!(record.is_empty());
        assert!(matches!(record.leaf(), Err(CertificateError::EmptyChain)));
    }

    #[test]
    fn test_wire_round_trip_drops_nothing() {
        let record = CertificateRecord::new(vec![
            CertificateDer::from(vec![1, 2, 3]),
            CertificateDer::from(vec![4, 5]),
        ]);

        let json = serde_json::to_string(&record).unwrap();
        let decoded: CertificateRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.chain().len(), 2);
        assert_eq!(decoded.chain()[0].as_ref(), &[1, 2, 3]);
        assert_eq!(decoded.chain()[1].as_ref(), &[4, 5]);
    }

    #[test]
    fn test_wire_rejects_key_material() {
        let json = r#"{"chain":[],"private_key":"AAAA"}"#;
        assert!(serde_json::from_str::<CertificateRecord>(json).is_err());
    }

    #[test]
    fn test_load_pem_chain() {
        let pki = Pki::new();
        let leaf = pki.leaf("www.example.com");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(leaf.chain_pem().as_bytes()).unwrap();

        let record = CertificateRecord::load_pem(file.path()).unwrap();
        assert_eq!(record.chain().len(), 2);

        let parsed = record.leaf().unwrap();
        assert!(parsed.subject().contains("www.example.com"));
        assert_eq!(parsed.key_id().len(), 64);
    }

    #[test]
    fn test_load_pem_without_certificates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a pem file").unwrap();

        assert!(matches!(
            CertificateRecord::load_pem(file.path()),
            Err(CertificateError::LoadError { .. })
        ));
    }

    #[test]
    fn test_invalid_leaf() {
        let record = CertificateRecord::new(vec![CertificateDer::from(vec![0u8; 8])]);
        assert!(matches!(
            record.leaf(),
            Err(CertificateError::InvalidLeaf { .. })
        ));
    }
}
