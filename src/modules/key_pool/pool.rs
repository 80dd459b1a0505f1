//! Fixed-slot connection pool with linear failover.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use super::config::PoolConfig;
use super::error::{PoolError, PoolResult};
use crate::modules::certificate::CertificateRecord;
use crate::modules::distribution::{DistributionClient, ProtocolError};
use crate::modules::transport::{Dial, TlsDialer, TransportResult};

/// Anything that can fetch the certificate chain for a hostname.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Fetch the chain for `hostname`. An empty record means "not found".
    async fn send(&self, hostname: &str) -> PoolResult<CertificateRecord>;
}

/// Statistics for one pool slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotStats {
    /// Connections established.
    pub connects: u64,

    /// Failed connection attempts.
    pub connect_failures: u64,

    /// Requests answered.
    pub requests: u64,

    /// Connections discarded after a request failure.
    pub discarded: u64,
}

#[derive(Debug, Default)]
struct SlotCounters {
    connects: AtomicU64,
    connect_failures: AtomicU64,
    requests: AtomicU64,
    discarded: AtomicU64,
}

impl SlotCounters {
    fn snapshot(&self) -> SlotStats {
        SlotStats {
            connects: self.connects.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// One pool position. Always targets the same address; only the connection
/// comes and goes.
struct Slot<S> {
    address: String,
    client: Mutex<Option<DistributionClient<S>>>,
    counters: SlotCounters,
}

/// Outcome of one request on one slot.
enum Attempt {
    Answered(CertificateRecord),
    Unreachable,
    Failed,
}

/// Pool of distribution connections, one slot per backend.
pub struct KeyServerPool<D: Dial = TlsDialer> {
    dialer: D,
    slots: Vec<Slot<D::Stream>>,
}

impl<D: Dial> std::fmt::Debug for KeyServerPool<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyServerPool")
            .field("backends", &self.addresses().collect::<Vec<_>>())
            .finish()
    }
}

impl KeyServerPool<TlsDialer> {
    /// Create a pool from configuration. No connection is opened until the
    /// first request.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured server name is invalid.
    pub fn from_config(config: &PoolConfig, dialer: TlsDialer) -> TransportResult<Self> {
        let dialer = match &config.server_name {
            Some(name) => dialer.with_server_name(name)?,
            None => dialer,
        };
        Ok(Self::new(dialer, config.backends.iter().cloned()))
    }
}

impl<D: Dial> KeyServerPool<D> {
    /// Create a pool with one empty slot per address.
    pub fn new(dialer: D, addresses: impl IntoIterator<Item = String>) -> Self {
        let slots = addresses
            .into_iter()
            .map(|address| Slot {
                address,
                client: Mutex::new(None),
                counters: SlotCounters::default(),
            })
            .collect();

        Self { dialer, slots }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check whether the pool has no backends.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Backend addresses in slot order.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.address.as_str())
    }

    /// Check whether slot `index` holds a connection.
    pub async fn is_connected(&self, index: usize) -> bool {
        match self.slots.get(index) {
            Some(slot) => slot.client.lock().await.is_some(),
            None => false,
        }
    }

    /// Statistics for slot `index`.
    #[must_use]
    pub fn slot_stats(&self, index: usize) -> Option<SlotStats> {
        self.slots.get(index).map(|s| s.counters.snapshot())
    }

    /// Request the chain for `hostname` from the first working backend.
    ///
    /// Each scan walks the slots in order, dialing empty ones and reusing
    /// live ones. A reused connection that fails is replaced once, since it
    /// may simply be stale. A fresh connection that fails exhausts its slot
    /// for this request; the slot is cleared and the scan starts over from
    /// the first slot, skipping exhausted ones. A fresh connection closed
    /// cleanly before answering yields an empty record.
    ///
    /// A request cancelled midway leaves its slot empty, never holding a
    /// connection with an unread response.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AllBackendsUnavailable`] once every slot is
    /// unreachable or exhausted, and [`PoolError::InvalidHostname`] for a
    /// hostname that cannot be framed.
    pub async fn send(&self, hostname: &str) -> PoolResult<CertificateRecord> {
        let mut exhausted = vec![false; self.slots.len()];

        'scan: loop {
            for (index, slot) in self.slots.iter().enumerate() {
                if exhausted[index] {
                    continue;
                }
                match self.attempt(index, slot, hostname).await? {
                    Attempt::Answered(record) => return Ok(record),
                    Attempt::Unreachable => {},
                    Attempt::Failed => {
                        exhausted[index] = true;
                        continue 'scan;
                    },
                }
            }
            break;
        }

        warn!(hostname = %hostname, backends = self.slots.len(), "All certificate backends unavailable");
        Err(PoolError::AllBackendsUnavailable {
            backends: self.slots.len(),
        })
    }

    async fn attempt(
        &self,
        index: usize,
        slot: &Slot<D::Stream>,
        hostname: &str,
    ) -> PoolResult<Attempt> {
        let mut guard = slot.client.lock().await;
        let mut reused = guard.is_some();

        loop {
            // Out of the slot while in flight: dropping this future drops
            // the connection with it.
            let mut client = match guard.take() {
                Some(client) => {
                    trace!(slot = index, backend = %slot.address, "Reusing backend connection");
                    client
                },
                None => match self.dialer.dial(&slot.address).await {
                    Ok(stream) => {
                        slot.counters.connects.fetch_add(1, Ordering::Relaxed);
                        debug!(slot = index, backend = %slot.address, "Connected to certificate backend");
                        DistributionClient::new(stream)
                    },
                    Err(e) => {
                        slot.counters.connect_failures.fetch_add(1, Ordering::Relaxed);
                        debug!(slot = index, backend = %slot.address, error = %e, "Certificate backend unreachable");
                        return Ok(Attempt::Unreachable);
                    },
                },
            };

            let error = match client.request(hostname).await {
                Ok(record) => {
                    slot.counters.requests.fetch_add(1, Ordering::Relaxed);
                    *guard = Some(client);
                    return Ok(Attempt::Answered(record));
                },
                Err(ProtocolError::InvalidHostname { hostname }) => {
                    // Rejected before anything was written.
                    *guard = Some(client);
                    return Err(PoolError::InvalidHostname { hostname });
                },
                Err(e) => e,
            };

            slot.counters.discarded.fetch_add(1, Ordering::Relaxed);

            if reused {
                debug!(slot = index, backend = %slot.address, error = %error, "Stale backend connection, redialing");
                reused = false;
                continue;
            }

            return Ok(match error {
                ProtocolError::Closed => {
                    debug!(slot = index, backend = %slot.address, "Certificate backend closed connection");
                    Attempt::Answered(CertificateRecord::empty())
                },
                e => {
                    warn!(slot = index, backend = %slot.address, error = %e, "Discarding backend connection");
                    Attempt::Failed
                },
            });
        }
    }
}

#[async_trait]
impl<D: Dial> CertificateSource for KeyServerPool<D> {
    async fn send(&self, hostname: &str) -> PoolResult<CertificateRecord> {
        KeyServerPool::send(self, hostname).await
    }
}
