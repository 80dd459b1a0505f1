//! Certificate Resolver & Cache
//!
//! Turns the server name a client asked for into a certificate the handshake
//! can present: authorized hostnames are looked up in the cache, fetched from
//! the distribution backends on a miss, bound to their remote signing key and
//! cached for later handshakes. Failures are never cached.

mod cache;
mod config;
mod error;
mod resolver;

pub use cache::CertificateCache;
pub use config::HostConfig;
pub use error::{ResolveError, ResolveResult};
pub use resolver::CertificateResolver;
