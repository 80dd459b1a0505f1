//! Signing error types.

use std::net::SocketAddr;
use thiserror::Error;

use crate::codec::CodecError;
use crate::modules::transport::TransportError;

/// Errors raised by the signing client and server.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The key server could not be reached.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be exchanged.
    #[error("signing protocol error: {0}")]
    Protocol(#[from] CodecError),

    /// The key server closed the connection before answering.
    #[error("key server closed the connection")]
    Closed,

    /// The key server answered with an error.
    #[error("key server refused: {message}")]
    Refused {
        /// Message from the key server.
        message: String,
    },

    /// The key server answered with the wrong message.
    #[error("unexpected response from key server")]
    UnexpectedResponse,

    /// The key supports none of the schemes this proxy knows.
    #[error("no supported signature scheme for key {key_id}")]
    NoSupportedScheme {
        /// The key identifier.
        key_id: String,
    },

    /// A key pair could not be loaded.
    #[error("failed to load key pair {path}: {message}")]
    KeyLoadError {
        /// Path of the file that failed.
        path: String,
        /// Error message.
        message: String,
    },

    /// Failed to bind to the specified address.
    #[error("failed to bind to {address}: {source}")]
    BindError {
        /// The address that failed to bind.
        address: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for signing operations.
pub type SigningResult<T> = Result<T, SigningError>;
