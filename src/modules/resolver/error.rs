//! Resolver error types.

use thiserror::Error;

use crate::modules::certificate::CertificateError;
use crate::modules::key_pool::PoolError;
use crate::modules::signing::SigningError;

/// Why a hostname could not be resolved to a certificate.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The client did not send a server name.
    #[error("client sent no server name")]
    MissingServerName,

    /// The hostname is not configured.
    #[error("hostname {hostname} is not authorized")]
    NotAuthorized {
        /// The requested hostname.
        hostname: String,
    },

    /// The backends answered that they hold no certificate.
    #[error("no certificate for {hostname}")]
    NoSuchCertificate {
        /// The requested hostname.
        hostname: String,
    },

    /// The distribution backends could not be used.
    #[error("certificate backends unavailable for {hostname}: {source}")]
    UpstreamUnavailable {
        /// The requested hostname.
        hostname: String,
        /// The pool failure.
        #[source]
        source: PoolError,
    },

    /// The key server refused or failed the binding.
    #[error("signing binding failed for {hostname}: {source}")]
    SigningBindingFailed {
        /// The requested hostname.
        hostname: String,
        /// The signing failure.
        #[source]
        source: SigningError,
    },

    /// The served leaf certificate could not be parsed.
    #[error("invalid certificate for {hostname}: {source}")]
    InvalidCertificate {
        /// The requested hostname.
        hostname: String,
        /// The parse failure.
        #[source]
        source: CertificateError,
    },
}

/// Result type alias for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
