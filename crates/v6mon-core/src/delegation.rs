//! Delegation input documents
//!
//! Two JSON documents feed the system, both produced by the external
//! dhcp6c exporter:
//!
//! - the per-delegation file (`prefix_delegations` keyed by an opaque id),
//!   consumed by the ULA mapping allocator, and
//! - the per-provider summary (provider name → delegated prefixes),
//!   consumed by the health aggregator for delegation status.
//!
//! Both readers fail soft: a missing or unparseable document degrades to an
//! empty map with a warning, never into the caller's control flow.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One delegated prefix as reported by the exporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRecord {
    /// Delegated prefix in CIDR notation
    pub prefix: String,
    /// WAN interface the delegation arrived on
    #[serde(default = "unknown_interface")]
    pub interface: String,
    /// Exporter-reported status; only `"active"` participates in mapping
    #[serde(default)]
    pub status: String,
}

impl DelegationRecord {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

fn unknown_interface() -> String {
    "unknown".to_string()
}

/// Top-level shape of the per-delegation document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DelegationFile {
    #[serde(default)]
    pub prefix_delegations: BTreeMap<String, DelegationRecord>,
}

/// One provider's entry in the summary document
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderSummary {
    #[serde(default)]
    pub delegated_prefixes: Vec<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Load the active delegations from the per-delegation document
///
/// Entries whose status is anything other than `"active"` are dropped here;
/// downstream code never sees them.
pub async fn read_active_delegations(path: &Path) -> BTreeMap<String, DelegationRecord> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("delegation file not readable ({}): {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    let file: DelegationFile = match serde_json::from_str(&content) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!("could not parse delegation file {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    let active: BTreeMap<String, DelegationRecord> = file
        .prefix_delegations
        .into_iter()
        .filter(|(_, record)| record.is_active())
        .collect();

    tracing::info!("loaded {} active delegations", active.len());
    active
}

/// Load the per-provider summary document
pub async fn read_provider_summary(path: &Path) -> BTreeMap<String, ProviderSummary> {
    if !path.exists() {
        tracing::debug!("delegation summary does not exist: {}", path.display());
        return BTreeMap::new();
    }

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("failed to read delegation summary {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!("could not parse delegation summary {}: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_only_active_delegations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("delegations.json");
        tokio::fs::write(
            &path,
            r#"{
                "prefix_delegations": {
                    "pd-1": {"prefix": "2600:1700:ab::/60", "interface": "igc0", "status": "active"},
                    "pd-2": {"prefix": "2001:558:cd::/60", "interface": "igc1", "status": "expired"}
                }
            }"#,
        )
        .await
        .unwrap();

        let active = read_active_delegations(&path).await;
        assert_eq!(active.len(), 1);
        assert_eq!(active["pd-1"].interface, "igc0");
    }

    #[tokio::test]
    async fn missing_and_corrupt_files_degrade_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(read_active_delegations(&missing).await.is_empty());
        assert!(read_provider_summary(&missing).await.is_empty());

        let corrupt = dir.path().join("corrupt.json");
        tokio::fs::write(&corrupt, "{not json").await.unwrap();
        assert!(read_active_delegations(&corrupt).await.is_empty());
        assert!(read_provider_summary(&corrupt).await.is_empty());
    }

    #[tokio::test]
    async fn provider_summary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        tokio::fs::write(
            &path,
            r#"{
                "att": {"delegated_prefixes": ["2600:1700:ab::/60"], "last_updated": "2026-08-01T10:00:00"},
                "comcast": {"delegated_prefixes": []}
            }"#,
        )
        .await
        .unwrap();

        let summary = read_provider_summary(&path).await;
        assert_eq!(summary.len(), 2);
        assert_eq!(summary["att"].delegated_prefixes.len(), 1);
        assert!(summary["comcast"].delegated_prefixes.is_empty());
        assert!(summary["comcast"].last_updated.is_none());
    }
}
