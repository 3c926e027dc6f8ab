// # Reachability Capability Trait
//
// Defines the boundary to the external reachability test.
//
// The capability answers one question: can a host at the vantage point open
// a connection to this candidate address? How it finds out is its own
// business (native library, subprocess, network RPC).
//
// ## Implementations
//
// - TCP call-back probe: `ddns-probe-tcp` crate
//
// ## Lifecycle
//
// ```text
// init() ──► test(candidate, vantage, timeout) ──► cleanup()
// ```
//
// The lifecycle is driven by `Prober` once per probe call; a capability is
// never asked to keep anything alive between calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

use super::address_source::CandidateAddress;

/// Externally reachable host the probe originates from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VantagePoint {
    /// Hostname or IP address
    pub address: String,
    /// TCP port
    pub port: u16,
}

impl VantagePoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for VantagePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.address.parse::<Ipv6Addr>().is_ok() {
            write!(f, "[{}]:{}", self.address, self.port)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}

/// Status of one candidate after probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Reachable,
    Unreachable,
    ProbeError,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProbeStatus::Reachable => "reachable",
            ProbeStatus::Unreachable => "unreachable",
            ProbeStatus::ProbeError => "probe error",
        })
    }
}

/// Result of probing one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReachabilityOutcome {
    pub candidate: CandidateAddress,
    pub status: ProbeStatus,
    /// Optional diagnostic
    pub detail: Option<String>,
}

impl ReachabilityOutcome {
    pub fn reachable(candidate: CandidateAddress) -> Self {
        Self {
            candidate,
            status: ProbeStatus::Reachable,
            detail: None,
        }
    }

    pub fn unreachable(candidate: CandidateAddress) -> Self {
        Self {
            candidate,
            status: ProbeStatus::Unreachable,
            detail: None,
        }
    }

    pub fn error(candidate: CandidateAddress, detail: impl Into<String>) -> Self {
        Self {
            candidate,
            status: ProbeStatus::ProbeError,
            detail: Some(detail.into()),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.status == ProbeStatus::Reachable
    }
}

/// Trait for reachability capability implementations
///
/// # Trust Level: Untrusted
///
/// The capability may open sockets, call a foreign library or spawn a helper
/// process for the duration of one `test()` call.
///
/// ## Forbidden Capabilities
/// - ❌ Retry (owned by whoever wraps `Reconciler::run()`)
/// - ❌ Keep sockets or handles open after `cleanup()`
/// - ❌ Talk to the DNS provider
///
/// `test()` may take as long as it likes; `Prober` bounds every call and
/// reports an overrun as `ProbeStatus::ProbeError`.
#[async_trait]
pub trait ReachabilityCapability: Send + Sync {
    /// Prepare the capability for a single test
    ///
    /// An error here marks the candidate as `ProbeError` and skips `test()`
    /// and `cleanup()`.
    async fn init(&self) -> Result<(), crate::Error> {
        Ok(())
    }

    /// Ask whether `candidate` is reachable from `vantage`
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: reachable
    /// - `Ok(false)`: definitively not reachable
    /// - `Err(Error)`: no answer could be obtained
    async fn test(
        &self,
        candidate: IpAddr,
        vantage: &VantagePoint,
        timeout: Duration,
    ) -> Result<bool, crate::Error>;

    /// Release whatever `init()` acquired
    async fn cleanup(&self) {}

    /// Capability name (for logging/debugging)
    fn capability_name(&self) -> &'static str;
}
