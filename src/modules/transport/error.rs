//! Transport error types.

use thiserror::Error;

/// Errors raised while building TLS configurations or dialing peers.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to load certificate.
    #[error("failed to load certificate from '{path}': {message}")]
    CertificateLoadError {
        /// The certificate path.
        path: String,
        /// Error message.
        message: String,
    },

    /// Failed to load private key.
    #[error("failed to load private key from '{path}': {message}")]
    PrivateKeyLoadError {
        /// The private key path.
        path: String,
        /// Error message.
        message: String,
    },

    /// The TLS configuration was rejected.
    #[error("invalid TLS configuration: {message}")]
    ConfigError {
        /// Error message.
        message: String,
    },

    /// The name cannot be used as a TLS server name.
    #[error("invalid server name '{name}'")]
    InvalidServerName {
        /// The offending name.
        name: String,
    },

    /// Connect plus handshake did not finish in time.
    #[error("connection timeout to {address}")]
    ConnectTimeout {
        /// The peer address.
        address: String,
    },

    /// The TCP connection failed.
    #[error("failed to connect to {address}: {source}")]
    ConnectError {
        /// The peer address.
        address: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The TLS handshake failed.
    #[error("TLS handshake with {address} failed: {source}")]
    HandshakeError {
        /// The peer address.
        address: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
