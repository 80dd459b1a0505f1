//! # Components
//!
//! - [`certificate`] - certificate records and leaf parsing
//! - [`transport`] - mutually authenticated TLS configs and dialing
//! - [`distribution`] - certificate distribution protocol, client and server
//! - [`key_pool`] - failover pool of distribution backends
//! - [`signing`] - remote signing protocol, client and server
//! - [`session_cache`] - resumption state for key server connections
//! - [`resolver`] - server name to certificate resolution with caching
//! - [`tls_terminator`] - the client-facing TLS listener and relay

pub mod certificate;
pub mod distribution;
pub mod key_pool;
pub mod resolver;
pub mod session_cache;
pub mod signing;
pub mod tls_terminator;
pub mod transport;
