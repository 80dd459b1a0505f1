//! Remote signing
//!
//! Private keys live only on the key server. The proxy binds a leaf
//! certificate to the key server that holds its key, learns which signature
//! schemes that key supports, and hands rustls a [`RemoteSigningKey`] whose
//! signatures are produced remotely during each handshake.
//!
//! Messages are single JSON lines:
//!
//! - `{"op":"bind","key_id":".."}` → `{"op":"bound","schemes":[..]}`
//! - `{"op":"sign","key_id":"..","scheme":"..","payload":".."}` →
//!   `{"op":"signature","signature":".."}`
//! - any failure → `{"op":"error","message":".."}`

mod client;
mod config;
mod error;
mod protocol;
mod server;
mod service;

pub use client::{KeylessClient, RemoteSigningKey};
pub use config::{KeyPairConfig, SigningServerConfig};
pub use error::{SigningError, SigningResult};
pub use protocol::{parse_scheme, scheme_name, SigningRequest, SigningResponse, SUPPORTED_SCHEMES};
pub use server::SigningServer;
pub use service::SigningService;
