//! Key-Server Connection Pool
//!
//! A fixed set of long-lived connections to redundant certificate
//! distribution backends, one slot per configured address. Lookups go to the
//! first live slot; empty slots are dialed on demand. A stale connection is
//! redialed once; a slot whose fresh connection fails is cleared and skipped
//! for the rest of the request while the scan restarts from the first slot.

mod config;
mod error;
mod pool;

pub use config::PoolConfig;
pub use error::{PoolError, PoolResult};
pub use pool::{CertificateSource, KeyServerPool, SlotStats};
