//! Distribution protocol error types.

use std::net::SocketAddr;
use thiserror::Error;

use crate::codec::CodecError;
use crate::modules::certificate::CertificateError;

/// Errors that can occur on either side of the distribution protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The hostname cannot be framed as a single request line.
    #[error("invalid hostname {hostname:?}")]
    InvalidHostname {
        /// The rejected hostname.
        hostname: String,
    },

    /// Sending the request failed.
    #[error("failed to send request: {0}")]
    WriteFailed(#[source] CodecError),

    /// Receiving or decoding the response failed.
    #[error("failed to read response: {0}")]
    ReadFailed(#[source] CodecError),

    /// The peer closed the connection cleanly before answering.
    #[error("connection closed by peer")]
    Closed,

    /// Failed to bind to the specified address.
    #[error("failed to bind to {address}: {source}")]
    BindError {
        /// The address that failed to bind.
        address: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A configured certificate could not be loaded.
    #[error(transparent)]
    Certificate(#[from] CertificateError),
}

/// Result type alias for distribution protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
