//! TLS termination error types.

use std::net::SocketAddr;
use thiserror::Error;

use crate::modules::resolver::ResolveError;
use crate::modules::transport::TransportError;

/// Errors that can occur in the TLS termination proxy.
#[derive(Debug, Error)]
pub enum TlsError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {address}: {source}")]
    BindError {
        /// The address that failed to bind.
        address: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Key-server TLS setup failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The requested hostname could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    HandshakeError(#[source] std::io::Error),

    /// TLS handshake did not finish in time.
    #[error("TLS handshake timed out")]
    HandshakeTimeout,

    /// The backend could not be reached.
    #[error("failed to connect to backend {address}: {message}")]
    BackendError {
        /// The backend address.
        address: String,
        /// Error message.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    ConfigError {
        /// Error message.
        message: String,
    },
}

/// Result type alias for TLS termination operations.
pub type TlsResult<T> = Result<T, TlsError>;
