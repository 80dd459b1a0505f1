//! Certificate Distribution Protocol
//!
//! Both halves of the protocol the proxy uses to fetch certificate chains from
//! a key server:
//!
//! - Request: one newline-terminated line holding the hostname.
//! - Response: one JSON line `{"chain":["<base64 DER>", ...]}`. An empty chain
//!   means "not found". Private keys never cross this protocol.
//!
//! Connections are persistent; many request/response pairs flow over one
//! connection until either side closes it.
//!
//! The server half only talks to peers whose source address is on its
//! allow-list. Everybody else is disconnected before a single byte is written.

mod allow_list;
mod client;
mod config;
mod error;
mod server;
mod store;

pub use allow_list::AllowList;
pub use client::DistributionClient;
pub use config::DistributionServerConfig;
pub use error::{ProtocolError, ProtocolResult};
pub use server::{DistributionServer, ServerStats};
pub use store::CertificateStore;
