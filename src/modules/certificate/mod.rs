//! Certificate Record
//!
//! The unit that is loaded by the key server, transmitted by the distribution
//! protocol and consumed by the proxy's resolver. Only the chain travels over
//! the wire; the parsed leaf is derived on demand and the signing capability
//! is attached on the proxy side by binding it into a rustls `CertifiedKey`.

mod error;
mod record;

pub use error::{CertificateError, CertificateResult};
pub use record::{key_id_for_spki, CertificateRecord, LeafCertificate};
