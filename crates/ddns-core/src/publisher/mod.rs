//! Record store client
//!
//! Owns the decision of what to write for the managed record:
//!
//! ```text
//!             ┌──► Unchanged ─────────────► (no write)
//! Fetched ────┼──► ToCreate ──► POST ──┬──► Created
//!             └──► ToUpdate ──► PUT  ──┼──► Updated
//!                                      └──► Failed
//! ```
//!
//! The current record is fetched fresh on every publish; nothing is cached.
//! Lookup errors and write failures both end in [`PublishOutcome::Failed`],
//! which the reconciler treats as "try the next candidate".

use std::fmt;
use std::net::IpAddr;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::traits::{AddressFamily, DnsProvider, RecordPayload, RecordType, RemoteRecord};

/// Derive the fully-qualified record name
///
/// An empty label selects the zone apex. Every lookup and write goes through
/// this one function.
pub fn record_fqdn(label: &str, domain: &str) -> String {
    if label.is_empty() {
        domain.to_string()
    } else {
        format!("{}.{}", label, domain)
    }
}

/// Terminal state of one publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublishOutcome {
    /// The record already held the address; nothing was written
    Unchanged,
    /// No record existed; one was created
    Created,
    /// The record held another address and was updated
    Updated {
        /// Content before the update
        previous: String,
    },
    /// Lookup or write did not succeed
    Failed {
        /// Human-readable reason
        reason: String,
    },
}

impl PublishOutcome {
    /// `Unchanged`, `Created` and `Updated` are all success
    pub fn is_success(&self) -> bool {
        !matches!(self, PublishOutcome::Failed { .. })
    }

    fn failed(reason: impl Into<String>) -> Self {
        PublishOutcome::Failed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishOutcome::Unchanged => f.write_str("unchanged"),
            PublishOutcome::Created => f.write_str("created"),
            PublishOutcome::Updated { previous } => write!(f, "updated (was {})", previous),
            PublishOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Intermediate state between fetch and write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishPlan {
    Unchanged,
    ToCreate,
    ToUpdate(RemoteRecord),
}

impl PublishPlan {
    /// Decide what to do given the freshly fetched record
    pub fn decide(existing: Option<RemoteRecord>, address: &IpAddr) -> Self {
        match existing {
            Some(record) if record.points_to(address) => PublishPlan::Unchanged,
            Some(record) => PublishPlan::ToUpdate(record),
            None => PublishPlan::ToCreate,
        }
    }
}

/// Client for the single managed record
pub struct RecordStoreClient {
    provider: Box<dyn DnsProvider>,
    record_name: String,
}

impl RecordStoreClient {
    /// Create a client for `label` inside `domain`
    pub fn new(provider: Box<dyn DnsProvider>, label: &str, domain: &str) -> Self {
        Self {
            provider,
            record_name: record_fqdn(label, domain),
        }
    }

    /// Fully-qualified name of the managed record
    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Fetch the current record for `family`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(RemoteRecord))`: the first matching record
    /// - `Ok(None)`: the provider has no such record
    /// - `Err(Error::Lookup)`: transport failure or malformed response
    pub async fn fetch_record(&self, family: AddressFamily) -> Result<Option<RemoteRecord>> {
        let record_type = RecordType::for_family(family);
        debug!("Fetching {} record for {}", record_type, self.record_name);

        self.provider
            .find_record(record_type, &self.record_name)
            .await
            .map_err(|e| match e {
                Error::Lookup(_) => e,
                other => Error::lookup(other.to_string()),
            })
    }

    /// Make the record for `family` point at `address`
    pub async fn publish(&self, family: AddressFamily, address: IpAddr) -> PublishOutcome {
        if AddressFamily::of(&address) != family {
            return PublishOutcome::failed(format!(
                "address {} is not an {} address",
                address, family
            ));
        }
        let record_type = RecordType::for_family(family);

        let existing = match self.fetch_record(family).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!("Lookup of {} {} failed: {}", record_type, self.record_name, e);
                return PublishOutcome::failed(e.to_string());
            }
        };

        let payload = RecordPayload::new(record_type, self.record_name.clone(), address);

        match PublishPlan::decide(existing, &address) {
            PublishPlan::Unchanged => {
                info!(
                    "{} record {} already points to {}",
                    record_type, self.record_name, address
                );
                PublishOutcome::Unchanged
            }
            PublishPlan::ToCreate => {
                info!(
                    "Creating {} record {} -> {}",
                    record_type, self.record_name, address
                );
                match self.provider.create_record(&payload).await {
                    Ok(()) => PublishOutcome::Created,
                    Err(e) => {
                        warn!("Create of {} failed: {}", self.record_name, e);
                        PublishOutcome::failed(e.to_string())
                    }
                }
            }
            PublishPlan::ToUpdate(record) => {
                info!(
                    "Updating {} record {} -> {} (was: {})",
                    record_type, self.record_name, address, record.content
                );
                match self.provider.update_record(&record.id, &payload).await {
                    Ok(()) => PublishOutcome::Updated {
                        previous: record.content,
                    },
                    Err(e) => {
                        warn!("Update of {} failed: {}", self.record_name, e);
                        PublishOutcome::failed(e.to_string())
                    }
                }
            }
        }
    }
}

impl fmt::Debug for RecordStoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStoreClient")
            .field("provider", &self.provider_name())
            .field("record_name", &self.record_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fqdn() {
        assert_eq!(record_fqdn("home", "example.com"), "home.example.com");
        assert_eq!(record_fqdn("", "example.com"), "example.com");
        assert_eq!(record_fqdn("a.b", "example.com"), "a.b.example.com");
    }

    #[test]
    fn test_plan() {
        let address: IpAddr = "203.0.113.5".parse().unwrap();
        let record = |content: &str| RemoteRecord {
            id: "rec-1".to_string(),
            record_type: RecordType::A,
            name: "home.example.com".to_string(),
            content: content.to_string(),
        };

        assert_eq!(PublishPlan::decide(None, &address), PublishPlan::ToCreate);
        assert_eq!(
            PublishPlan::decide(Some(record("203.0.113.5")), &address),
            PublishPlan::Unchanged
        );
        assert_eq!(
            PublishPlan::decide(Some(record("198.51.100.7")), &address),
            PublishPlan::ToUpdate(record("198.51.100.7"))
        );
    }

    #[test]
    fn test_outcome_success() {
        assert!(PublishOutcome::Unchanged.is_success());
        assert!(PublishOutcome::Created.is_success());
        assert!(
            PublishOutcome::Updated {
                previous: "198.51.100.7".to_string()
            }
            .is_success()
        );
        assert!(!PublishOutcome::failed("nope").is_success());
    }
}
