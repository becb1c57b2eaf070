// # Memory State Stores
//
// In-memory implementations of SnapshotStore and MappingStateStore.
//
// ## Purpose
//
// Nothing survives a restart: the first cycle after a crash starts from the
// documented default state and will re-emit transition events against it.
// Useful for tests and for embedding the monitor where persistence is
// handled elsewhere.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::mapping::MappingState;
use crate::status::MonitoringSnapshot;
use crate::traits::{MappingStateStore, SnapshotStore};

/// In-memory snapshot store
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<RwLock<MonitoringSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, for test assertions
    pub async fn current(&self) -> MonitoringSnapshot {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<MonitoringSnapshot, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn store(&self, snapshot: &MonitoringSnapshot) -> Result<(), Error> {
        *self.inner.write().await = snapshot.clone();
        Ok(())
    }
}

/// In-memory mapping state store
#[derive(Debug, Clone, Default)]
pub struct MemoryMappingStore {
    inner: Arc<RwLock<MappingState>>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, for test assertions
    pub async fn current(&self) -> MappingState {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl MappingStateStore for MemoryMappingStore {
    async fn load(&self) -> Result<MappingState, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn store(&self, state: &MappingState) -> Result<(), Error> {
        *self.inner.write().await = state.clone();
        Ok(())
    }
}
