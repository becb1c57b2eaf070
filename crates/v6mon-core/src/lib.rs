// # v6mon-core
//
// Core library for dual-WAN IPv6 failover monitoring.
//
// ## Architecture Overview
//
// This library provides the failover-relevant decision logic for a firewall
// appliance with two upstream IPv6 providers:
//
// - **FactSource**: Trait for collecting raw network facts (interfaces,
//   default gateways, reachability probes)
// - **Monitor**: Health-state aggregation and change detection over
//   persisted snapshots
// - **UlaAllocator / MappingEngine**: Delegated-prefix to ULA network
//   mapping with debounced recomputation
// - **SnapshotStore / MappingStateStore**: Traits for durable last-known
//   state, with file (atomic-rename) and memory implementations
// - **PrefixExporter / NptRefresher**: Traits for the external mapping
//   collaborators
//
// ## Design Principles
//
// 1. **Separation of Concerns**: OS command wrapping and script invocation
//    live in implementation crates behind traits
// 2. **Scheduler-Driven**: One synchronous cycle per tick, no internal
//    parallelism; probes are sequential with bounded timeouts
// 3. **Fail Closed**: Probe failures become negative facts, never errors
// 4. **Durable State**: Snapshots are replaced atomically; a crashed cycle
//    leaves the previous state untouched

pub mod config;
pub mod delegation;
pub mod error;
pub mod mapping;
pub mod monitor;
pub mod state;
pub mod status;
pub mod traits;

// Re-export core types for convenience
pub use config::{MappingConfig, MonitorConfig, ProviderLink, UlaSlot};
pub use error::{Error, Result};
pub use mapping::{MappingEngine, MappingOutcome, MappingState, UlaAllocator, UlaMapping};
pub use monitor::{Monitor, MonitorEvent};
pub use state::{FileMappingStore, FileSnapshotStore, MemoryMappingStore, MemorySnapshotStore};
pub use status::{ChangeEvent, MonitoringSnapshot, OverallStatus, StatusSummary};
pub use traits::{FactSource, MappingStateStore, NptRefresher, PrefixExporter, SnapshotStore};
