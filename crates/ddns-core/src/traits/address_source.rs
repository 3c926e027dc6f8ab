// # Address Source Trait
//
// Defines the interface for enumerating the host's candidate addresses.
//
// ## Implementations
//
// - Interface table (`getifaddrs`): `ddns-ip-local` crate
// - Tests: static candidate lists
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::AddressSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* AddressSource implementation */;
//
//     let candidates = source.enumerate().await?;
//     for candidate in candidates.iter() {
//         println!("{} {}", candidate.family(), candidate);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Address family of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Families in the order a reconciliation pass visits them
    pub const ORDERED: [AddressFamily; 2] = [AddressFamily::Ipv4, AddressFamily::Ipv6];

    /// Family of an address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "ipv4",
            AddressFamily::Ipv6 => "ipv6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A local address eligible for reachability testing
///
/// Immutable once created; the family always matches the address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CandidateAddress {
    family: AddressFamily,
    address: IpAddr,
}

impl CandidateAddress {
    /// Create a candidate, deriving the family from the address
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are stored as IPv4.
    pub fn new(address: IpAddr) -> Self {
        let address = normalize(address);
        Self {
            family: AddressFamily::of(&address),
            address,
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }
}

impl From<IpAddr> for CandidateAddress {
    fn from(address: IpAddr) -> Self {
        Self::new(address)
    }
}

impl fmt::Display for CandidateAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.address.fmt(f)
    }
}

/// Candidates of one enumeration, split by family
///
/// Each family keeps enumeration order. Duplicate addresses are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    ipv4: Vec<CandidateAddress>,
    ipv6: Vec<CandidateAddress>,
}

impl CandidateSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an address to its family's list
    ///
    /// Returns `false` if the address was already present.
    pub fn push(&mut self, address: IpAddr) -> bool {
        let candidate = CandidateAddress::new(address);
        let list = match candidate.family() {
            AddressFamily::Ipv4 => &mut self.ipv4,
            AddressFamily::Ipv6 => &mut self.ipv6,
        };
        if list.contains(&candidate) {
            return false;
        }
        list.push(candidate);
        true
    }

    /// Candidates of one family, in enumeration order
    pub fn get(&self, family: AddressFamily) -> &[CandidateAddress] {
        match family {
            AddressFamily::Ipv4 => &self.ipv4,
            AddressFamily::Ipv6 => &self.ipv6,
        }
    }

    /// All candidates, IPv4 first, each family in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = &CandidateAddress> {
        AddressFamily::ORDERED
            .into_iter()
            .flat_map(move |family| self.get(family).iter())
    }

    /// Drop every candidate of the given family
    pub fn clear_family(&mut self, family: AddressFamily) {
        match family {
            AddressFamily::Ipv4 => self.ipv4.clear(),
            AddressFamily::Ipv6 => self.ipv6.clear(),
        }
    }

    pub fn len(&self) -> usize {
        self.ipv4.len() + self.ipv6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }
}

impl FromIterator<IpAddr> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        let mut set = CandidateSet::new();
        for address in iter {
            set.push(address);
        }
        set
    }
}

/// Unwrap IPv4-mapped IPv6 addresses
pub fn normalize(address: IpAddr) -> IpAddr {
    match address {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}

/// Global unicast test
///
/// Anything that is not unspecified, loopback, multicast, link-local unicast
/// or (IPv4) the limited broadcast address. Private ranges count as global
/// unicast.
pub fn is_global_unicast(address: &IpAddr) -> bool {
    match normalize(*address) {
        IpAddr::V4(v4) => is_global_unicast_v4(&v4),
        IpAddr::V6(v6) => is_global_unicast_v6(&v6),
    }
}

fn is_global_unicast_v4(ip: &Ipv4Addr) -> bool {
    !ip.is_broadcast()
        && !ip.is_unspecified()
        && !ip.is_loopback()
        && !ip.is_multicast()
        && !ip.is_link_local()
}

fn is_global_unicast_v6(ip: &Ipv6Addr) -> bool {
    !ip.is_unspecified() && !ip.is_loopback() && !ip.is_multicast() && !is_link_local_v6(ip)
}

/// fe80::/10
fn is_link_local_v6(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}

/// Candidate filter applied to every address found on an eligible interface
///
/// IPv4: global unicast and not loopback. IPv6: global unicast, not loopback,
/// not link-local unicast.
pub fn is_candidate_address(address: &IpAddr) -> bool {
    match normalize(*address) {
        IpAddr::V4(v4) => !v4.is_loopback() && is_global_unicast_v4(&v4),
        IpAddr::V6(v6) => {
            !v6.is_loopback() && !is_link_local_v6(&v6) && is_global_unicast_v6(&v6)
        }
    }
}

/// Trait for address source implementations
///
/// An address source reads local state only. It lists the host's candidate
/// addresses once per call and keeps nothing between calls.
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Read platform interface state (getifaddrs, netlink, sysfs)
///
/// ## Forbidden Capabilities
/// - ❌ Probe reachability (use `ReachabilityCapability`)
/// - ❌ Talk to the DNS provider (use `DnsProvider`)
/// - ❌ Cache results across passes
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// List candidate addresses
    ///
    /// # Returns
    ///
    /// - `Ok(CandidateSet)`: Candidates split by family (possibly empty)
    /// - `Err(Error::Enumeration)`: The interface listing could not be obtained
    async fn enumerate(&self) -> Result<CandidateSet, crate::Error>;

    /// Source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
