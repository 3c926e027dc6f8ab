//! Reachability prober
//!
//! Wraps a [`ReachabilityCapability`] and drives its lifecycle for exactly one
//! candidate per call:
//!
//! ```text
//! init ──► test ──► cleanup
//!   │        │
//!   └─ error / deadline ──► ProbeError
//! ```
//!
//! Init and test share one deadline of `timeout + grace`. Cleanup runs
//! under its own bound of `grace` so a stuck teardown cannot hold the pass.
//!
//! Nothing is shared between calls, so a capability that misbehaves on one
//! candidate cannot poison the next one. The prober never retries.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::traits::{CandidateAddress, ReachabilityCapability, ReachabilityOutcome, VantagePoint};

/// Extra time granted on top of the caller's timeout before a probe is
/// abandoned
///
/// The capability receives the caller's timeout and is expected to answer
/// within it; the grace covers its own connection set-up and teardown.
pub const DEFAULT_PROBE_GRACE: Duration = Duration::from_millis(500);

/// Per-call adapter around a reachability capability
pub struct Prober {
    capability: Box<dyn ReachabilityCapability>,
    grace: Duration,
}

impl Prober {
    /// Create a prober with the default grace period
    pub fn new(capability: Box<dyn ReachabilityCapability>) -> Self {
        Self {
            capability,
            grace: DEFAULT_PROBE_GRACE,
        }
    }

    /// Override the grace period
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Name of the wrapped capability
    pub fn capability_name(&self) -> &'static str {
        self.capability.capability_name()
    }

    /// Probe one candidate
    ///
    /// Always yields exactly one outcome. Initialization failures, capability
    /// errors and overruns of `timeout` plus grace become
    /// [`ProbeStatus::ProbeError`](crate::traits::ProbeStatus::ProbeError).
    pub async fn probe(
        &self,
        candidate: &CandidateAddress,
        vantage: &VantagePoint,
        timeout: Duration,
    ) -> ReachabilityOutcome {
        debug!(
            "Probing {} ({}) from {} via {}",
            candidate,
            candidate.family(),
            vantage,
            self.capability_name()
        );

        let bound = timeout.saturating_add(self.grace);
        let deadline = Instant::now() + bound;

        match tokio::time::timeout_at(deadline, self.capability.init()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Probe capability failed to initialize for {}: {}", candidate, e);
                return ReachabilityOutcome::error(candidate.clone(), e.to_string());
            }
            Err(_) => {
                warn!(
                    "Probe capability did not initialize for {} within {:?}",
                    candidate, bound
                );
                return ReachabilityOutcome::error(
                    candidate.clone(),
                    format!("probe initialization timed out after {:?}", bound),
                );
            }
        }

        let answer = tokio::time::timeout_at(
            deadline,
            self.capability.test(candidate.address(), vantage, timeout),
        )
        .await;

        if tokio::time::timeout(self.grace, self.capability.cleanup())
            .await
            .is_err()
        {
            warn!(
                "Probe capability cleanup for {} abandoned after {:?}",
                candidate, self.grace
            );
        }

        match answer {
            Ok(Ok(true)) => {
                debug!("{} is reachable from {}", candidate, vantage);
                ReachabilityOutcome::reachable(candidate.clone())
            }
            Ok(Ok(false)) => {
                debug!("{} is not reachable from {}", candidate, vantage);
                ReachabilityOutcome::unreachable(candidate.clone())
            }
            Ok(Err(e)) => {
                warn!("Probe of {} failed: {}", candidate, e);
                ReachabilityOutcome::error(candidate.clone(), e.to_string())
            }
            Err(_) => {
                warn!("Probe of {} timed out after {:?}", candidate, bound);
                ReachabilityOutcome::error(
                    candidate.clone(),
                    format!("probe timed out after {:?}", bound),
                )
            }
        }
    }
}

impl std::fmt::Debug for Prober {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prober")
            .field("capability", &self.capability_name())
            .field("grace", &self.grace)
            .finish()
    }
}
