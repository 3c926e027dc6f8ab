// # ddns-core
//
// Core library for the reachability-checked DDNS reconciler.
//
// ## Architecture Overview
//
// This library keeps one DNS record pointed at the host's externally
// reachable address:
// - **AddressSource**: Trait for enumerating candidate local addresses
// - **ReachabilityCapability**: Trait for the external reachability test
// - **DnsProvider**: Trait for reading and writing the record via provider APIs
// - **Prober**: Drives one capability lifecycle per candidate, bounded in time
// - **RecordStoreClient**: Decides between no-op, create and update
// - **Reconciler**: Orchestrates one enumerate → probe → publish → report pass
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **First Success Wins**: The first reachable, publishable address ends the pass
// 3. **Fresh Reads**: The remote record is fetched on every pass, never cached
// 4. **Library-First**: All core functionality can be used as a library
// 5. **No Hidden Retries**: Callers wanting retries wrap `Reconciler::run()`

pub mod config;
pub mod engine;
pub mod error;
pub mod probe;
pub mod publisher;
pub mod traits;

// Re-export core types for convenience
pub use config::{DdnsConfig, IpVersion};
pub use engine::{ReconcileAction, ReconcileEvent, ReconciliationResult, Reconciler};
pub use error::{Error, Result};
pub use probe::Prober;
pub use publisher::{PublishOutcome, RecordStoreClient, record_fqdn};
pub use traits::{AddressSource, DnsProvider, ReachabilityCapability};
