//! Session Cache
//!
//! Process-wide TLS resumption state for the outbound client that reaches the
//! signing service. [`SessionCache`] is the opaque `get`/`put` store;
//! [`SessionStore`] plugs it into rustls so every new connection to a key
//! server can resume instead of running a full handshake.

mod cache;
mod store;

pub use cache::SessionCache;
pub use store::{ServerSessions, SessionStore};
