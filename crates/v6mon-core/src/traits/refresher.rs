// # External Mapping Collaborators
//
// Defines the interfaces for the two external tools the mapping pipeline
// drives: the dhcp6c-to-JSON prefix exporter and the NPTv6 rule manager.
//
// ## Failure semantics
//
// Both collaborators are optional steps of a mapping pass. The engine logs
// their failures and carries on: a failed export falls back to the
// delegation file as last written, and a failed NPTv6 refresh never
// invalidates the computed mapping or blocks its persistence.

use async_trait::async_trait;

use crate::mapping::UlaMapping;

/// Re-exports dhcp6c delegation data to the JSON documents this system reads
#[async_trait]
pub trait PrefixExporter: Send + Sync {
    /// Run one export
    async fn export(&self) -> Result<(), crate::Error>;

    /// Collaborator name for logs
    fn name(&self) -> &str {
        "prefix-exporter"
    }
}

/// Applies NPTv6 translation rules for a computed mapping
#[async_trait]
pub trait NptRefresher: Send + Sync {
    /// Push the mapping to the rule manager, fire-and-forget
    async fn refresh(&self, mapping: &UlaMapping) -> Result<(), crate::Error>;

    /// Collaborator name for logs
    fn name(&self) -> &str {
        "nptv6-manager"
    }
}
