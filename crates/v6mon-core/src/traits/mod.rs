//! Core trait definitions
//!
//! These traits define the seams between the monitor and its collaborators:
//! fact collection, state persistence, and the external mapping tooling.

pub mod fact_source;
pub mod refresher;
pub mod state_store;

pub use fact_source::{FactSource, GatewayRoute, InterfaceFact, InterfaceStatus, ProbeOutcome};
pub use refresher::{NptRefresher, PrefixExporter};
pub use state_store::{MappingStateStore, SnapshotStore};
