//! Shared fixtures: a throwaway PKI and a running key server.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rcgen::{BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::rustls::pki_types::CertificateDer;

use keyless_ingress::modules::distribution::{DistributionServer, DistributionServerConfig};
use keyless_ingress::modules::signing::{KeyPairConfig, SigningServer, SigningServerConfig};
use keyless_ingress::modules::transport::{server_config, IdentityConfig};

pub const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

pub struct Pki {
    ca_key: KeyPair,
    ca_cert: Certificate,
}

impl Pki {
    pub fn new() -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params
            .distinguished_name
            .push(DnType::CommonName, "keyless integration CA");
        let ca_cert = params.self_signed(&ca_key).unwrap();
        Self { ca_key, ca_cert }
    }

    pub fn ca_der(&self) -> CertificateDer<'static> {
        self.ca_cert.der().clone()
    }

    pub fn write_ca(&self, dir: &Path) -> PathBuf {
        let path = dir.join("ca.pem");
        std::fs::write(&path, self.ca_cert.pem()).unwrap();
        path
    }

    /// Issue a certificate for `names` and write `<stem>.pem` (leaf then CA)
    /// and `<stem>.key` into `dir`.
    pub fn issue(&self, dir: &Path, stem: &str, names: &[&str]) -> (PathBuf, PathBuf) {
        let key = KeyPair::generate().unwrap();
        let names: Vec<String> = names.iter().map(|n| (*n).to_string()).collect();
        let mut params = CertificateParams::new(names.clone()).unwrap();
        params.distinguished_name.push(DnType::CommonName, names[0].as_str());
        let cert = params.signed_by(&key, &self.ca_cert, &self.ca_key).unwrap();

        let cert_path = dir.join(format!("{stem}.pem"));
        let key_path = dir.join(format!("{stem}.key"));
        std::fs::write(&cert_path, format!("{}{}", cert.pem(), self.ca_cert.pem())).unwrap();
        std::fs::write(&key_path, key.serialize_pem()).unwrap();
        (cert_path, key_path)
    }
}

/// Addresses of a running key server.
pub struct KeyServer {
    pub distribution: SocketAddr,
    pub signing: SocketAddr,
}

/// Start a key server that requires client certificates from `ca`, serves
/// the chains in `hosts` to `allow` and signs with `keys`.
pub async fn start_key_server(
    dir: &Path,
    pki: &Pki,
    allow: Vec<IpAddr>,
    hosts: BTreeMap<String, PathBuf>,
    keys: Vec<KeyPairConfig>,
) -> KeyServer {
    let ca = pki.write_ca(dir);
    let (cert, key) = pki.issue(dir, "keyserver", &["keyserver.test", "127.0.0.1"]);
    let tls = server_config(&IdentityConfig::new(cert, key).with_ca(ca)).unwrap();

    let distribution_config = DistributionServerConfig {
        allow,
        hosts,
        ..DistributionServerConfig::default()
    };
    let signing_config = SigningServerConfig {
        keys,
        ..SigningServerConfig::default()
    };

    let distribution =
        Arc::new(DistributionServer::from_config(&distribution_config, Arc::clone(&tls)).unwrap());
    let signing = Arc::new(SigningServer::from_config(&signing_config, tls).unwrap());

    let distribution_listener = DistributionServer::bind(SocketAddr::new(LOCALHOST, 0))
        .await
        .unwrap();
    let signing_listener = SigningServer::bind(SocketAddr::new(LOCALHOST, 0))
        .await
        .unwrap();

    let addrs = KeyServer {
        distribution: distribution_listener.local_addr().unwrap(),
        signing: signing_listener.local_addr().unwrap(),
    };

    tokio::spawn(distribution.run(distribution_listener));
    tokio::spawn(signing.run(signing_listener));

    addrs
}

/// Start a TCP echo server.
pub async fn start_echo() -> SocketAddr {
    let listener = TcpListener::bind(SocketAddr::new(LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        },
                    }
                }
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind(SocketAddr::new(LOCALHOST, 0)).await.unwrap();
    listener.local_addr().unwrap()
}
