//! Connection pool error types.

use thiserror::Error;

/// Errors returned by the connection pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Every backend failed to connect or answer.
    #[error("all {backends} certificate backends are unavailable")]
    AllBackendsUnavailable {
        /// Number of configured backends.
        backends: usize,
    },

    /// The hostname cannot be sent as a request.
    #[error("invalid hostname {hostname:?}")]
    InvalidHostname {
        /// The rejected hostname.
        hostname: String,
    },
}

/// Result type alias for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
