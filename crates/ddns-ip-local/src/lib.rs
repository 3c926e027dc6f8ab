// # Local Address Source
//
// This crate lists the host's candidate addresses from the OS interface
// table (`getifaddrs`).
//
// ## Selection Rules
//
// 1. Interfaces that are down or flagged loopback are skipped entirely
// 2. Every address on a remaining interface is run through
//    `is_candidate_address` (no loopback, no link-local, global unicast)
// 3. Optional restrictions: one family (`IpVersion`) and one interface name
// 4. Duplicates reported by several entries are listed once
//
// Private ranges are kept; whether they are reachable is the prober's call.
//
// ## Platform Support
//
// Unix only. Elsewhere `enumerate()` fails with `Error::Enumeration`.

use ddns_core::config::IpVersion;
use ddns_core::traits::{AddressFamily, AddressSource, CandidateSet, is_candidate_address};
use ddns_core::{DdnsConfig, Result};
use std::net::IpAddr;
use tracing::{debug, trace};

/// One row of the interface table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceEntry {
    pub name: String,
    pub up: bool,
    pub loopback: bool,
    pub address: Option<IpAddr>,
}

/// Interface-table address source
#[derive(Debug, Clone, Default)]
pub struct LocalAddressSource {
    interface: Option<String>,
    version: IpVersion,
}

impl LocalAddressSource {
    /// Create a source considering every interface and both families
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source from the reconciler configuration
    pub fn from_config(config: &DdnsConfig) -> Self {
        Self {
            interface: config.interface.clone(),
            version: config.ip_version,
        }
    }

    /// Only consider addresses of this interface
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Only consider these families
    pub fn with_version(mut self, version: IpVersion) -> Self {
        self.version = version;
        self
    }

    /// Apply the selection rules to raw interface rows
    pub fn select<I>(&self, entries: I) -> CandidateSet
    where
        I: IntoIterator<Item = InterfaceEntry>,
    {
        let mut set = CandidateSet::new();

        for entry in entries {
            if !entry.up || entry.loopback {
                trace!("Skipping interface {} (down or loopback)", entry.name);
                continue;
            }
            if self
                .interface
                .as_ref()
                .is_some_and(|wanted| *wanted != entry.name)
            {
                continue;
            }
            let Some(address) = entry.address else {
                continue;
            };
            if !is_candidate_address(&address) {
                continue;
            }
            if !self.version.includes(AddressFamily::of(&address)) {
                continue;
            }
            if set.push(address) {
                debug!("Candidate {} on {}", address, entry.name);
            }
        }

        set
    }
}

#[async_trait::async_trait]
impl AddressSource for LocalAddressSource {
    async fn enumerate(&self) -> Result<CandidateSet> {
        let entries = tokio::task::spawn_blocking(platform::interface_entries)
            .await
            .map_err(|e| ddns_core::Error::enumeration(format!("enumeration task failed: {}", e)))??;

        Ok(self.select(entries))
    }

    fn source_name(&self) -> &'static str {
        "getifaddrs"
    }
}

#[cfg(unix)]
mod platform {
    use super::InterfaceEntry;
    use ddns_core::{Error, Result};
    use nix::ifaddrs::getifaddrs;
    use nix::net::if_::InterfaceFlags;
    use std::net::{IpAddr, SocketAddrV4, SocketAddrV6};

    pub fn interface_entries() -> Result<Vec<InterfaceEntry>> {
        let addrs = getifaddrs()
            .map_err(|e| Error::enumeration(format!("getifaddrs failed: {}", e)))?;

        Ok(addrs
            .map(|ifaddr| {
                let address = ifaddr.address.as_ref().and_then(|storage| {
                    if let Some(sin) = storage.as_sockaddr_in() {
                        Some(IpAddr::V4(*SocketAddrV4::from(*sin).ip()))
                    } else {
                        storage
                            .as_sockaddr_in6()
                            .map(|sin6| IpAddr::V6(*SocketAddrV6::from(*sin6).ip()))
                    }
                });

                InterfaceEntry {
                    name: ifaddr.interface_name,
                    up: ifaddr.flags.contains(InterfaceFlags::IFF_UP),
                    loopback: ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK),
                    address,
                }
            })
            .collect())
    }
}

#[cfg(not(unix))]
mod platform {
    use super::InterfaceEntry;
    use ddns_core::{Error, Result};

    pub fn interface_entries() -> Result<Vec<InterfaceEntry>> {
        Err(Error::enumeration(
            "Interface enumeration is only supported on Unix",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, up: bool, loopback: bool, address: &str) -> InterfaceEntry {
        InterfaceEntry {
            name: name.to_string(),
            up,
            loopback,
            address: Some(address.parse().unwrap()),
        }
    }

    fn table() -> Vec<InterfaceEntry> {
        vec![
            entry("lo", true, true, "127.0.0.1"),
            entry("lo", true, true, "::1"),
            entry("eth0", true, false, "203.0.113.5"),
            entry("eth0", true, false, "fe80::1"),
            entry("eth0", true, false, "2001:db8::5"),
            entry("eth1", false, false, "198.51.100.7"),
            entry("wlan0", true, false, "192.168.1.10"),
            entry("wlan0", true, false, "169.254.3.3"),
            entry("eth0:1", true, false, "203.0.113.5"),
        ]
    }

    fn rendered(set: &CandidateSet) -> Vec<String> {
        set.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_select_skips_down_loopback_and_link_local() {
        let set = LocalAddressSource::new().select(table());
        assert_eq!(
            rendered(&set),
            vec!["203.0.113.5", "192.168.1.10", "2001:db8::5"]
        );
    }

    #[test]
    fn test_select_single_interface() {
        let set = LocalAddressSource::new()
            .with_interface("wlan0")
            .select(table());
        assert_eq!(rendered(&set), vec!["192.168.1.10"]);
    }

    #[test]
    fn test_select_single_family() {
        let set = LocalAddressSource::new()
            .with_version(IpVersion::V6)
            .select(table());
        assert_eq!(rendered(&set), vec!["2001:db8::5"]);
    }

    #[test]
    fn test_select_ignores_rows_without_address() {
        let rows = vec![InterfaceEntry {
            name: "eth0".to_string(),
            up: true,
            loopback: false,
            address: None,
        }];
        assert!(LocalAddressSource::new().select(rows).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_live_enumeration_has_no_loopback_or_link_local() {
        let set = LocalAddressSource::new()
            .enumerate()
            .await
            .expect("getifaddrs succeeds");

        for candidate in set.iter() {
            let address = candidate.address();
            assert!(!address.is_loopback(), "{} is loopback", address);
            assert!(is_candidate_address(&address), "{} filtered", address);
        }
    }
}
