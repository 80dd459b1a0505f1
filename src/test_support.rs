//! Test PKI: a throwaway CA and certificates issued by it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rcgen::{BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair};
use tokio_rustls::rustls::crypto::aws_lc_rs::sign::any_supported_type;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::rustls::sign::SigningKey;

/// Name every test server certificate carries.
pub(crate) const SERVER_NAME: &str = "keyserver.test";

pub(crate) struct Pki {
    ca_key: KeyPair,
    ca_cert: Certificate,
}

pub(crate) struct Issued {
    cert: Certificate,
    key: KeyPair,
    ca_der: CertificateDer<'static>,
    ca_pem: String,
}

impl Pki {
    pub(crate) fn new() -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params
            .distinguished_name
            .push(DnType::CommonName, "keyless test CA");
        let ca_cert = params.self_signed(&ca_key).unwrap();
        Self { ca_key, ca_cert }
    }

    pub(crate) fn leaf(&self, name: &str) -> Issued {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec![name.to_string()]).unwrap();
        params.distinguished_name.push(DnType::CommonName, name);
        let cert = params.signed_by(&key, &self.ca_cert, &self.ca_key).unwrap();
        Issued {
            cert,
            key,
            ca_der: self.ca_cert.der().clone(),
            ca_pem: self.ca_cert.pem(),
        }
    }

    pub(crate) fn write_ca(&self, dir: &Path) -> PathBuf {
        let path = dir.join("ca.pem");
        std::fs::write(&path, self.ca_cert.pem()).unwrap();
        path
    }
}

impl Issued {
    pub(crate) fn chain(&self) -> Vec<CertificateDer<'static>> {
        vec![self.cert.der().clone(), self.ca_der.clone()]
    }

    pub(crate) fn chain_pem(&self) -> String {
        format!("{}{}", self.cert.pem(), self.ca_pem)
    }

    pub(crate) fn key_der(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key.serialize_der()))
    }

    pub(crate) fn signing_key(&self) -> Arc<dyn SigningKey> {
        any_supported_type(&self.key_der()).unwrap()
    }

    /// Write `<stem>.pem` (chain) and `<stem>.key` into `dir`.
    pub(crate) fn write(&self, dir: &Path, stem: &str) -> (PathBuf, PathBuf) {
        let cert_path = dir.join(format!("{stem}.pem"));
        let key_path = dir.join(format!("{stem}.key"));
        std::fs::write(&cert_path, self.chain_pem()).unwrap();
        std::fs::write(&key_path, self.key.serialize_pem()).unwrap();
        (cert_path, key_path)
    }
}
