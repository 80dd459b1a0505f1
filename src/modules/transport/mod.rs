//! Transport
//!
//! Mutually authenticated TLS plumbing shared by every component that talks to
//! a key server: PEM loading, client and server configurations, and a dialer
//! whose connect plus handshake is bounded by a timeout.

mod config;
mod dialer;
mod error;
mod tls;

pub use config::IdentityConfig;
pub use dialer::{Dial, TlsDialer, DEFAULT_CONNECT_TIMEOUT};
pub use error::{TransportError, TransportResult};
pub use tls::{client_config, load_certificates, load_private_key, load_roots, server_config};
