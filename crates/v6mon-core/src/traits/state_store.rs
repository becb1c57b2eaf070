// # State Store Traits
//
// Defines the interfaces for persisting the last-known monitoring snapshot
// and the last-applied ULA mapping state.
//
// ## Purpose
//
// Both documents are whole-file records: read once at cycle start, replaced
// atomically at cycle end. The previous value exists only to compute the
// change list (snapshot) or the debounce decision (mapping state), so the
// traits are load/store pairs rather than per-record CRUD.
//
// ## Implementations
//
// - File-based JSON: `state::file`
// - In-memory (tests, embedding): `state::memory`

use async_trait::async_trait;

use crate::mapping::MappingState;
use crate::status::MonitoringSnapshot;

/// Durable record of the last monitoring snapshot
///
/// # Contract
///
/// - `load` on a missing backing document returns the documented default
///   state (empty maps, status `unknown`); a corrupt document does the same
///   with a warning logged.
/// - `store` must be atomic: a concurrent reader observes either the old or
///   the new document, never a partial write.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the last persisted snapshot
    async fn load(&self) -> Result<MonitoringSnapshot, crate::Error>;

    /// Atomically replace the persisted snapshot
    async fn store(&self, snapshot: &MonitoringSnapshot) -> Result<(), crate::Error>;
}

/// Durable record of the last mapping run
///
/// Same contract as [`SnapshotStore`]; the default state carries an epoch of
/// zero, no recorded file times, and no mappings.
#[async_trait]
pub trait MappingStateStore: Send + Sync {
    /// Read the last persisted mapping state
    async fn load(&self) -> Result<MappingState, crate::Error>;

    /// Atomically replace the persisted mapping state
    async fn store(&self, state: &MappingState) -> Result<(), crate::Error>;
}
