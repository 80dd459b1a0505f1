//! TLS Termination Listener
//!
//! Accepts client connections, reads the ClientHello, asks the certificate
//! resolver for the certificate matching its server name and completes the
//! handshake with a key that only exists on the key server. Handshakes fail
//! closed: a hostname that cannot be resolved gets no certificate at all.
//!
//! Session tickets are encrypted under a key derived from a shared secret so
//! that every proxy in a fleet can resume the others' sessions. Terminated
//! connections are relayed byte for byte to a single backend.

mod config;
mod connection;
mod error;
mod terminator;
mod ticketer;

pub use config::ProxyConfig;
pub use connection::{relay, ConnectionStats};
pub use error::{TlsError, TlsResult};
pub use terminator::TlsTerminator;
pub use ticketer::SharedSecretTicketer;
