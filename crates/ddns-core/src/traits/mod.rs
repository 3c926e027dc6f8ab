//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressSource`]: Enumerate candidate local addresses
//! - [`ReachabilityCapability`]: Test whether a candidate is reachable from outside
//! - [`DnsProvider`]: Read and write the record at the DNS provider

pub mod address_source;
pub mod dns_provider;
pub mod reachability;

pub use address_source::{
    AddressFamily, AddressSource, CandidateAddress, CandidateSet, is_candidate_address,
    is_global_unicast,
};
pub use dns_provider::{DnsProvider, RECORD_TTL, RecordPayload, RecordType, RemoteRecord};
pub use reachability::{ProbeStatus, ReachabilityCapability, ReachabilityOutcome, VantagePoint};
