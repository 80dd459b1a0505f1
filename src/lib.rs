//! # keyless-ingress
//!
//! Split-trust TLS termination. Edge proxies terminate TLS for hostnames
//! whose private keys they never hold: certificate chains are fetched from
//! key servers on demand and every handshake signature is computed remotely.
//!
//! ## Roles
//!
//! - **Proxy**: accepts client TLS, resolves the certificate for the
//!   requested server name through a pool of distribution backends, signs
//!   the handshake through the key server that owns the key and relays the
//!   decrypted stream to a backend application.
//! - **Key server**: serves certificate chains to allow-listed proxies and
//!   performs signatures with the private keys it holds.
//!
//! Every link between the two roles is mutually authenticated TLS, see
//! [`modules::transport`].

pub mod cache;
pub mod codec;
pub mod config;
pub mod logging;
pub mod modules;

#[cfg(test)]
pub(crate) mod test_support;
