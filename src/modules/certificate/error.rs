//! Certificate error types.

use thiserror::Error;

/// Errors raised while loading or parsing certificates.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// Failed to read or decode a PEM file.
    #[error("failed to load certificate from '{path}': {message}")]
    LoadError {
        /// The certificate path.
        path: String,
        /// Error message.
        message: String,
    },

    /// The record carries no certificates.
    #[error("certificate chain is empty")]
    EmptyChain,

    /// The leaf certificate is not valid X.509.
    #[error("failed to parse leaf certificate: {message}")]
    InvalidLeaf {
        /// Error message.
        message: String,
    },
}

/// Result type alias for certificate operations.
pub type CertificateResult<T> = Result<T, CertificateError>;
