//! Signing protocol messages.

use serde::{Deserialize, Serialize};
use tokio_rustls::rustls::{SignatureAlgorithm, SignatureScheme};

use crate::codec::base64_bytes;

/// Schemes that may be negotiated for a remote key, in preference order.
pub const SUPPORTED_SCHEMES: &[SignatureScheme] = &[
    SignatureScheme::ECDSA_NISTP256_SHA256,
    SignatureScheme::ECDSA_NISTP384_SHA384,
    SignatureScheme::ECDSA_NISTP521_SHA512,
    SignatureScheme::ED25519,
    SignatureScheme::RSA_PSS_SHA256,
    SignatureScheme::RSA_PSS_SHA384,
    SignatureScheme::RSA_PSS_SHA512,
    SignatureScheme::RSA_PKCS1_SHA256,
    SignatureScheme::RSA_PKCS1_SHA384,
    SignatureScheme::RSA_PKCS1_SHA512,
];

/// Request sent by the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum SigningRequest {
    /// Ask whether the server holds `key_id` and which schemes it signs with.
    Bind {
        /// Key identifier.
        key_id: String,
    },

    /// Sign `payload` with `key_id` under `scheme`.
    Sign {
        /// Key identifier.
        key_id: String,
        /// Scheme name.
        scheme: String,
        /// Bytes to sign.
        #[serde(with = "base64_bytes")]
        payload: Vec<u8>,
    },
}

/// Response sent by the key server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum SigningResponse {
    /// The key is held; these schemes are available.
    Bound {
        /// Scheme names.
        schemes: Vec<String>,
    },

    /// The signature.
    Signature {
        /// Signature bytes.
        #[serde(with = "base64_bytes")]
        signature: Vec<u8>,
    },

    /// The request failed.
    Error {
        /// What went wrong.
        message: String,
    },
}

/// Wire name of a scheme.
#[must_use]
pub fn scheme_name(scheme: SignatureScheme) -> String {
    format!("{scheme:?}")
}

/// Parse a wire name back into a supported scheme.
#[must_use]
pub fn parse_scheme(name: &str) -> Option<SignatureScheme> {
    SUPPORTED_SCHEMES
        .iter()
        .copied()
        .find(|s| scheme_name(*s) == name)
}

/// Key algorithm implied by a scheme.
pub(crate) fn algorithm_for(scheme: SignatureScheme) -> SignatureAlgorithm {
    match scheme {
        SignatureScheme::ECDSA_NISTP256_SHA256
        | SignatureScheme::ECDSA_NISTP384_SHA384
        | SignatureScheme::ECDSA_NISTP521_SHA512 => SignatureAlgorithm::ECDSA,
        SignatureScheme::ED25519 => SignatureAlgorithm::ED25519,
        _ => SignatureAlgorithm::RSA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_names_round_trip() {
        for scheme in SUPPORTED_SCHEMES {
            assert_eq!(parse_scheme(&scheme_name(*scheme)), Some(*scheme));
        }
        assert_eq!(scheme_name(SignatureScheme::ED25519), "ED25519");
        assert!(parse_scheme("RSA_PKCS1_SHA1").is_none());
    }

    #[test]
    fn test_request_wire_form() {
        let json = serde_json::to_string(&SigningRequest::Bind {
            key_id: "ab".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"op":"bind","key_id":"ab"}"#);

        let sign: SigningRequest =
            serde_json::from_str(r#"{"op":"sign","key_id":"ab","scheme":"ED25519","payload":"AAE="}"#)
                .unwrap();
        assert_eq!(
            sign,
            SigningRequest::Sign {
                key_id: "ab".to_string(),
                scheme: "ED25519".to_string(),
                payload: vec![0, 1],
            }
        );
    }

    #[test]
    fn test_response_rejects_unknown_op() {
        assert!(serde_json::from_str::<SigningResponse>(r#"{"op":"private_key"}"#).is_err());
    }

    #[test]
    fn test_algorithm_for_scheme() {
        assert_eq!(
            algorithm_for(SignatureScheme::ECDSA_NISTP384_SHA384),
            SignatureAlgorithm::ECDSA
        );
        assert_eq!(
            algorithm_for(SignatureScheme::RSA_PSS_SHA256),
            SignatureAlgorithm::RSA
        );
    }
}
