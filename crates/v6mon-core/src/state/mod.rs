//! State store implementations

pub mod file;
pub mod memory;

pub use file::{FileMappingStore, FileSnapshotStore};
pub use memory::{MemoryMappingStore, MemorySnapshotStore};
