//! Reconciler
//!
//! The Reconciler is responsible for one reconciliation pass:
//! - Enumerating candidate addresses via AddressSource
//! - Probing each candidate via Prober
//! - Publishing the first reachable candidate via RecordStoreClient
//! - Producing a structured ReconciliationResult
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │ AddressSource │─── CandidateSet ───┐
//! └───────────────┘                    │
//!                                      ▼
//!                              ┌──────────────┐
//!                              │  Reconciler  │
//!                              └──────────────┘
//!                                      │
//!         ┌────────────────────────────┼────────────────────────────┐
//!         │                            │                            │
//!         ▼                            ▼                            ▼
//! ┌─────────────┐           ┌───────────────────┐          ┌─────────────┐
//! │   Prober    │           │ RecordStoreClient │          │   Events    │
//! │ (per cand.) │           │ (first reachable) │          │  (notify)   │
//! └─────────────┘           └───────────────────┘          └─────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! 1. Enumerate candidates (failure ends the pass as `Failed`)
//! 2. Probe every candidate, IPv4 first, in enumeration order
//! 3. Walk the reachable candidates in the same order and publish
//! 4. First successful publish wins; a failed publish moves on to the next
//! 5. Report

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{DdnsConfig, IpVersion};
use crate::error::Result;
use crate::probe::Prober;
use crate::publisher::{PublishOutcome, RecordStoreClient};
use crate::traits::{
    AddressFamily, AddressSource, CandidateAddress, DnsProvider, ProbeStatus,
    ReachabilityCapability, ReachabilityOutcome, RecordType, VantagePoint,
};

/// Default capacity of the optional event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Final action of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    /// The record already held the published address
    NoOp,
    /// The record was created
    Created,
    /// The record was updated
    Updated,
    /// Nothing usable was published
    Failed,
}

impl ReconcileAction {
    fn from_outcome(outcome: &PublishOutcome) -> Self {
        match outcome {
            PublishOutcome::Unchanged => ReconcileAction::NoOp,
            PublishOutcome::Created => ReconcileAction::Created,
            PublishOutcome::Updated { .. } => ReconcileAction::Updated,
            PublishOutcome::Failed { .. } => ReconcileAction::Failed,
        }
    }
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReconcileAction::NoOp => "no-op",
            ReconcileAction::Created => "created",
            ReconcileAction::Updated => "updated",
            ReconcileAction::Failed => "failed",
        })
    }
}

/// One publish attempt of a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishAttempt {
    pub candidate: CandidateAddress,
    pub outcome: PublishOutcome,
}

/// Outcome of one reconciliation pass
///
/// Immutable once produced. `probes` and `attempts` record partial progress
/// so a failed pass still shows which candidates were tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub action: ReconcileAction,
    pub published: Option<CandidateAddress>,
    pub message: String,
    pub probes: Vec<ReachabilityOutcome>,
    pub attempts: Vec<PublishAttempt>,
}

impl ReconciliationResult {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            action: ReconcileAction::Failed,
            published: None,
            message: message.into(),
            probes: Vec::new(),
            attempts: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.action != ReconcileAction::Failed
    }

    /// Published address as text, empty when nothing was published
    pub fn published_address(&self) -> String {
        self.published
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Candidates with the given probe status, in probe order
    pub fn candidates_with(&self, status: ProbeStatus) -> Vec<&CandidateAddress> {
        self.probes
            .iter()
            .filter(|p| p.status == status)
            .map(|p| &p.candidate)
            .collect()
    }
}

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Pass started with this many candidates
    PassStarted { candidates: usize },

    /// One candidate was probed
    CandidateProbed(ReachabilityOutcome),

    /// One reachable candidate was handed to the record store
    PublishAttempted {
        candidate: CandidateAddress,
        outcome: PublishOutcome,
    },

    /// Pass finished
    PassFinished { action: ReconcileAction },
}

/// Probe results split by status, each in probe order
#[derive(Debug, Default)]
struct ProbeBuckets {
    success: Vec<CandidateAddress>,
    fail: Vec<CandidateAddress>,
    error: Vec<CandidateAddress>,
}

impl ProbeBuckets {
    fn from_outcomes(outcomes: &[ReachabilityOutcome]) -> Self {
        let mut buckets = ProbeBuckets::default();
        for outcome in outcomes {
            let bucket = match outcome.status {
                ProbeStatus::Reachable => &mut buckets.success,
                ProbeStatus::Unreachable => &mut buckets.fail,
                ProbeStatus::ProbeError => &mut buckets.error,
            };
            bucket.push(outcome.candidate.clone());
        }
        buckets
    }
}

/// Reconciliation pass orchestrator
///
/// Holds only read-only configuration and its collaborators; every pass
/// re-enumerates, re-probes and re-fetches the remote record.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Optionally attach an event channel with [`Reconciler::with_events()`]
/// 3. Call [`Reconciler::run()`] once per pass
pub struct Reconciler {
    /// Candidate enumeration
    source: Box<dyn AddressSource>,

    /// Reachability probing
    prober: Prober,

    /// Managed record
    store: RecordStoreClient,

    /// Probe origin
    vantage: VantagePoint,

    /// Per-probe timeout
    probe_timeout: Duration,

    /// Families to consider
    ip_version: IpVersion,

    /// Event sender for external monitoring
    event_tx: Option<mpsc::Sender<ReconcileEvent>>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `source`: Address source implementation
    /// - `capability`: Reachability capability implementation
    /// - `provider`: DNS provider implementation
    /// - `config`: Validated before use
    pub fn new(
        source: Box<dyn AddressSource>,
        capability: Box<dyn ReachabilityCapability>,
        provider: Box<dyn DnsProvider>,
        config: &DdnsConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            source,
            prober: Prober::new(capability),
            store: RecordStoreClient::new(provider, &config.record_name, &config.domain),
            vantage: config.vantage_point(),
            probe_timeout: config.probe_timeout(),
            ip_version: config.ip_version,
            event_tx: None,
        })
    }

    /// Replace the prober (e.g. to change its grace period)
    pub fn with_prober(mut self, prober: Prober) -> Self {
        self.prober = prober;
        self
    }

    /// Attach a bounded event channel
    ///
    /// When the channel is full, events are dropped with a warning; a pass
    /// never waits on its observer.
    pub fn with_events(mut self, capacity: usize) -> (Self, mpsc::Receiver<ReconcileEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.event_tx = Some(tx);
        (self, rx)
    }

    /// Fully-qualified name of the managed record
    pub fn record_name(&self) -> &str {
        self.store.record_name()
    }

    /// Run one reconciliation pass
    pub async fn run(&self) -> ReconciliationResult {
        let result = self.run_pass().await;

        match result.action {
            ReconcileAction::Failed => error!("Reconciliation failed: {}", result.message),
            action => info!("Reconciliation finished ({}): {}", action, result.message),
        }
        self.emit_event(ReconcileEvent::PassFinished {
            action: result.action,
        });

        result
    }

    async fn run_pass(&self) -> ReconciliationResult {
        // Step 1: enumerate
        let mut candidates = match self.source.enumerate().await {
            Ok(candidates) => candidates,
            Err(e) => {
                return ReconciliationResult::failed(format!(
                    "failed to enumerate local addresses: {}",
                    e
                ));
            }
        };
        for family in AddressFamily::ORDERED {
            if !self.ip_version.includes(family) {
                candidates.clear_family(family);
            }
        }

        info!(
            "Found {} candidate address(es) via {} ({} IPv4, {} IPv6)",
            candidates.len(),
            self.source.source_name(),
            candidates.get(AddressFamily::Ipv4).len(),
            candidates.get(AddressFamily::Ipv6).len()
        );
        self.emit_event(ReconcileEvent::PassStarted {
            candidates: candidates.len(),
        });

        if candidates.is_empty() {
            return ReconciliationResult::failed(
                "no candidate addresses found on local interfaces",
            );
        }

        // Steps 2-3: probe in family order, then enumeration order
        let mut probes = Vec::with_capacity(candidates.len());
        for candidate in candidates.iter() {
            let outcome = self
                .prober
                .probe(candidate, &self.vantage, self.probe_timeout)
                .await;
            self.emit_event(ReconcileEvent::CandidateProbed(outcome.clone()));
            probes.push(outcome);
        }

        let buckets = ProbeBuckets::from_outcomes(&probes);
        info!(
            "Probe summary: {} reachable, {} unreachable, {} errored",
            buckets.success.len(),
            buckets.fail.len(),
            buckets.error.len()
        );
        for candidate in &buckets.error {
            debug!("Candidate {} could not be probed", candidate);
        }

        if buckets.success.is_empty() {
            let mut result = ReconciliationResult::failed(format!(
                "no publicly reachable address detected ({} probed: {} unreachable, {} errored)",
                probes.len(),
                buckets.fail.len(),
                buckets.error.len()
            ));
            result.probes = probes;
            return result;
        }

        // Step 4: first reachable-and-publishable address wins
        let mut attempts = Vec::new();
        for candidate in buckets.success {
            let outcome = self
                .store
                .publish(candidate.family(), candidate.address())
                .await;
            self.emit_event(ReconcileEvent::PublishAttempted {
                candidate: candidate.clone(),
                outcome: outcome.clone(),
            });

            if outcome.is_success() {
                let action = ReconcileAction::from_outcome(&outcome);
                let message = self.success_message(&candidate, &outcome);
                attempts.push(PublishAttempt { candidate: candidate.clone(), outcome });
                return ReconciliationResult {
                    action,
                    published: Some(candidate),
                    message,
                    probes,
                    attempts,
                };
            }

            warn!(
                "Publishing {} failed, trying next reachable candidate: {}",
                candidate, outcome
            );
            attempts.push(PublishAttempt { candidate, outcome });
        }

        // Step 5: nothing usable
        let detail = attempts
            .iter()
            .map(|a| format!("{}: {}", a.candidate, a.outcome))
            .collect::<Vec<_>>()
            .join("; ");
        let mut result = ReconciliationResult::failed(format!(
            "no usable address: every reachable candidate failed to publish ({})",
            detail
        ));
        result.probes = probes;
        result.attempts = attempts;
        result
    }

    fn success_message(&self, candidate: &CandidateAddress, outcome: &PublishOutcome) -> String {
        let record_type = RecordType::for_family(candidate.family());
        let name = self.store.record_name();
        match outcome {
            PublishOutcome::Unchanged => format!(
                "{} record {} already points to {}",
                record_type, name, candidate
            ),
            PublishOutcome::Created => {
                format!("created {} record {} -> {}", record_type, name, candidate)
            }
            PublishOutcome::Updated { previous } => format!(
                "updated {} record {} -> {} (was {})",
                record_type, name, candidate, previous
            ),
            PublishOutcome::Failed { reason } => reason.clone(),
        }
    }

    /// Emit a reconciler event
    fn emit_event(&self, event: ReconcileEvent) {
        let Some(tx) = &self.event_tx else {
            return;
        };
        // Send event, logging warning if channel is full (backpressure)
        if tx.try_send(event).is_err() {
            warn!("Event channel full or closed, dropping reconciler event");
        }
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("source", &self.source.source_name())
            .field("prober", &self.prober)
            .field("store", &self.store)
            .field("vantage", &self.vantage)
            .field("probe_timeout", &self.probe_timeout)
            .field("ip_version", &self.ip_version)
            .finish()
    }
}
