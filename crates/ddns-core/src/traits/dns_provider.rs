// # DNS Provider Trait
//
// Defines the interface to the remote record store.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::traits::{DnsProvider, RecordPayload, RecordType};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let existing = provider.find_record(RecordType::A, "home.example.com").await?;
//     let payload = RecordPayload::new(
//         RecordType::A,
//         "home.example.com",
//         std::net::IpAddr::from([203, 0, 113, 5]),
//     );
//     match existing {
//         Some(record) => provider.update_record(&record.id, &payload).await?,
//         None => provider.create_record(&payload).await?,
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use super::address_source::AddressFamily;

/// TTL used for every record this system writes (seconds)
pub const RECORD_TTL: u32 = 120;

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Record type holding addresses of the given family
    pub fn for_family(family: AddressFamily) -> Self {
        match family {
            AddressFamily::Ipv4 => RecordType::A,
            AddressFamily::Ipv6 => RecordType::Aaaa,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The provider's current state for the target name and type
///
/// A transient read: fetched fresh on every pass, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Provider-assigned identifier
    pub id: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Fully-qualified record name
    pub name: String,
    /// Current address value
    pub content: String,
}

impl RemoteRecord {
    /// Whether the record already points at `address`
    ///
    /// Content that parses as an address is compared as an address, anything
    /// else as text.
    pub fn points_to(&self, address: &IpAddr) -> bool {
        match self.content.trim().parse::<IpAddr>() {
            Ok(current) => current == *address,
            Err(_) => self.content == address.to_string(),
        }
    }
}

/// Body of a create or update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordPayload {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

impl RecordPayload {
    /// Payload for a raw address record: fixed short TTL, no proxying
    pub fn new(record_type: RecordType, name: impl Into<String>, address: IpAddr) -> Self {
        Self {
            record_type,
            name: name.into(),
            content: address.to_string(),
            ttl: RECORD_TTL,
            proxied: false,
        }
    }
}

/// Trait for DNS provider implementations
///
/// This trait exposes the three raw operations on a single record. The
/// decision between them (unchanged, create, update) is made by
/// `RecordStoreClient`, never by the provider.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads
/// - ❌ Implement retry logic or backoff
/// - ❌ Cache records beyond a single request
/// - ❌ Decide whether a write is needed (owned by `RecordStoreClient`)
///
/// **Correct approach on failure**: return an error. A caller wanting retries
/// wraps the whole reconciliation pass.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up the current record of `record_type` for `name`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(RemoteRecord))`: The first matching record
    /// - `Ok(None)`: The provider reported success with zero matches
    /// - `Err(Error::Lookup)`: Transport failure or malformed response
    async fn find_record(
        &self,
        record_type: RecordType,
        name: &str,
    ) -> Result<Option<RemoteRecord>, crate::Error>;

    /// Create a new record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The provider's response carried an explicit success flag
    /// - `Err(Error)`: Anything else
    async fn create_record(&self, payload: &RecordPayload) -> Result<(), crate::Error>;

    /// Replace the record identified by `record_id`
    ///
    /// Same success rule as [`DnsProvider::create_record`].
    async fn update_record(
        &self,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
