//! Test doubles and common utilities for reconciler contract tests
//!
//! Every double is `Clone` and shares its counters across clones, so a test
//! can hand one copy to the reconciler and keep another for assertions.

#![allow(dead_code)]

use ddns_core::config::DdnsConfig;
use ddns_core::error::{Error, Result};
use ddns_core::traits::{
    AddressSource, CandidateSet, DnsProvider, ReachabilityCapability, RecordPayload, RecordType,
    RemoteRecord, VantagePoint,
};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid IP literal")
}

/// An address source returning a fixed list (or a fixed failure)
#[derive(Clone)]
pub struct StaticAddressSource {
    addresses: Vec<IpAddr>,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl StaticAddressSource {
    pub fn new(addresses: &[&str]) -> Self {
        Self {
            addresses: addresses.iter().map(|a| ip(a)).collect(),
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            addresses: Vec::new(),
            failure: Some(message.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressSource for StaticAddressSource {
    async fn enumerate(&self) -> Result<CandidateSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(Error::enumeration(message.clone())),
            None => Ok(self.addresses.iter().copied().collect()),
        }
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// Scripted answer of [`ScriptedCapability`] for one address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Reachable,
    Unreachable,
    Error,
    /// Never answers
    Hang,
}

/// A reachability capability with per-address answers
///
/// Addresses without a scripted answer are unreachable.
#[derive(Clone)]
pub struct ScriptedCapability {
    answers: Arc<HashMap<IpAddr, Answer>>,
    fail_init: bool,
    hang_init: bool,
    hang_cleanup: bool,
    init_calls: Arc<AtomicUsize>,
    cleanup_calls: Arc<AtomicUsize>,
    tested: Arc<Mutex<Vec<IpAddr>>>,
}

impl ScriptedCapability {
    pub fn new(answers: &[(&str, Answer)]) -> Self {
        Self {
            answers: Arc::new(answers.iter().map(|(a, answer)| (ip(a), *answer)).collect()),
            fail_init: false,
            hang_init: false,
            hang_cleanup: false,
            init_calls: Arc::new(AtomicUsize::new(0)),
            cleanup_calls: Arc::new(AtomicUsize::new(0)),
            tested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every address reachable
    pub fn all_reachable(addresses: &[&str]) -> Self {
        let answers: Vec<(&str, Answer)> =
            addresses.iter().map(|a| (*a, Answer::Reachable)).collect();
        Self::new(&answers)
    }

    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Self::new(&[])
        }
    }

    /// `init()` never returns
    pub fn hanging_init() -> Self {
        Self {
            hang_init: true,
            ..Self::new(&[])
        }
    }

    /// `cleanup()` never returns
    pub fn with_hanging_cleanup(self) -> Self {
        Self {
            hang_cleanup: true,
            ..self
        }
    }

    pub fn init_count(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn cleanup_count(&self) -> usize {
        self.cleanup_calls.load(Ordering::SeqCst)
    }

    /// Addresses passed to `test()`, in call order
    pub fn tested(&self) -> Vec<IpAddr> {
        self.tested.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ReachabilityCapability for ScriptedCapability {
    async fn init(&self) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(Error::probe_init("capability library unavailable"));
        }
        if self.hang_init {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn test(
        &self,
        candidate: IpAddr,
        _vantage: &VantagePoint,
        _timeout: Duration,
    ) -> Result<bool> {
        self.tested.lock().unwrap().push(candidate);
        match self.answers.get(&candidate).copied().unwrap_or(Answer::Unreachable) {
            Answer::Reachable => Ok(true),
            Answer::Unreachable => Ok(false),
            Answer::Error => Err(Error::probe("vantage point refused the request")),
            Answer::Hang => {
                std::future::pending::<()>().await;
                Ok(false)
            }
        }
    }

    async fn cleanup(&self) {
        self.cleanup_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_cleanup {
            std::future::pending::<()>().await;
        }
    }

    fn capability_name(&self) -> &'static str {
        "scripted"
    }
}

/// An in-memory DNS provider that tracks calls
#[derive(Clone)]
pub struct MockDnsProvider {
    records: Arc<Mutex<Vec<RemoteRecord>>>,
    failing_writes: Arc<Mutex<HashSet<String>>>,
    fail_lookup: bool,
    lookup_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            failing_writes: Arc::new(Mutex::new(HashSet::new())),
            fail_lookup: false,
            lookup_calls: Arc::new(AtomicUsize::new(0)),
            create_calls: Arc::new(AtomicUsize::new(0)),
            update_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Provider whose lookups always fail
    pub fn failing_lookup() -> Self {
        Self {
            fail_lookup: true,
            ..Self::new()
        }
    }

    /// Seed an existing record
    pub fn with_record(self, record_type: RecordType, name: &str, content: &str) -> Self {
        {
            let mut records = self.records.lock().unwrap();
            let id = format!("rec-{}", records.len() + 1);
            records.push(RemoteRecord {
                id,
                record_type,
                name: name.to_string(),
                content: content.to_string(),
            });
        }
        self
    }

    /// Reject every write whose content is `address`
    pub fn reject_writes_of(self, address: &str) -> Self {
        self.failing_writes
            .lock()
            .unwrap()
            .insert(address.to_string());
        self
    }

    pub fn lookup_count(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.create_count() + self.update_count()
    }

    /// Current content of the record, if any
    pub fn content_of(&self, record_type: RecordType, name: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.record_type == record_type && r.name == name)
            .map(|r| r.content.clone())
    }

    fn check_write(&self, payload: &RecordPayload) -> Result<()> {
        if self.failing_writes.lock().unwrap().contains(&payload.content) {
            return Err(Error::publish(format!(
                "provider rejected content {}",
                payload.content
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn find_record(
        &self,
        record_type: RecordType,
        name: &str,
    ) -> Result<Option<RemoteRecord>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup {
            return Err(Error::lookup("provider unreachable"));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.record_type == record_type && r.name == name)
            .cloned())
    }

    async fn create_record(&self, payload: &RecordPayload) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write(payload)?;

        let mut records = self.records.lock().unwrap();
        let id = format!("rec-{}", records.len() + 1);
        records.push(RemoteRecord {
            id,
            record_type: payload.record_type,
            name: payload.name.clone(),
            content: payload.content.clone(),
        });
        Ok(())
    }

    async fn update_record(&self, record_id: &str, payload: &RecordPayload) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write(payload)?;

        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.id == record_id) {
            Some(record) => {
                record.content = payload.content.clone();
                Ok(())
            }
            None => Err(Error::publish(format!("no record with id {}", record_id))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Helper to create a minimal valid DdnsConfig for testing
///
/// Manages `<record_name>.example.com`.
pub fn minimal_config(record_name: &str) -> DdnsConfig {
    DdnsConfig {
        api_token: "test-token".to_string(),
        zone_id: "zone-1".to_string(),
        domain: "example.com".to_string(),
        record_name: record_name.to_string(),
        server_ip: "198.51.100.1".to_string(),
        server_port: 8066,
        timeout_secs: 1,
        ..DdnsConfig::default()
    }
}
