//! Source-address allow-list.

use std::collections::HashSet;
use std::net::IpAddr;

/// A static set of peer addresses permitted to connect.
///
/// Addresses are compared in canonical form, so an IPv4 peer that arrives as
/// an IPv4-mapped IPv6 address on a dual-stack socket still matches its IPv4
/// entry.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    addresses: HashSet<IpAddr>,
}

impl AllowList {
    /// Build an allow-list from addresses.
    pub fn new(addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            addresses: addresses.into_iter().map(|a| a.to_canonical()).collect(),
        }
    }

    /// Check whether `addr` may connect.
    #[must_use]
    pub fn is_allowed(&self, addr: IpAddr) -> bool {
        self.addresses.contains(&addr.to_canonical())
    }

    /// Number of permitted addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Check whether nobody is permitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl FromIterator<IpAddr> for AllowList {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        Self::new(iter)
    }
}
