//! Persisted health-state model
//!
//! A [`MonitoringSnapshot`] is the unit of persisted state: one snapshot is
//! built per cycle and atomically replaces the previous one in the store.
//! The previous snapshot is only kept long enough to compute the change list.
//!
//! All maps are `BTreeMap` so that diffing and serialization are
//! deterministic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Aggregated health classification consumed by failover decision logic
///
/// Derived exclusively by the aggregator's precedence policy; never set
/// independently of the per-entity maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// No data recorded yet
    #[default]
    Unknown,
    /// No usable IPv6 interface; probing was skipped
    NoInterfaces,
    /// Neither a gateway nor an external target answered
    Degraded,
    /// External targets answer but no gateway does
    ConnectivityOnly,
    /// A gateway answers but no external target does
    GatewayOnly,
    /// At least one gateway and one external target answer
    Healthy,
}

impl OverallStatus {
    /// Whether this status is good enough to keep traffic on this WAN
    ///
    /// Gateway reachability is the stronger failover signal, so
    /// `gateway_only` still counts as usable.
    pub fn is_usable(self) -> bool {
        matches!(self, OverallStatus::Healthy | OverallStatus::GatewayOnly)
    }

    /// The wire/JSON name of the status
    pub fn as_str(self) -> &'static str {
        match self {
            OverallStatus::Unknown => "unknown",
            OverallStatus::NoInterfaces => "no_interfaces",
            OverallStatus::Degraded => "degraded",
            OverallStatus::ConnectivityOnly => "connectivity_only",
            OverallStatus::GatewayOnly => "gateway_only",
            OverallStatus::Healthy => "healthy",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted per-interface summary
///
/// Only booleans derived from the raw interface facts are persisted; the raw
/// address list is rebuilt every cycle and never written out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSummary {
    /// Interface was operationally active with at least the status flag set
    pub active: bool,
    /// Number of non-link-local addresses observed
    pub address_count: usize,
    /// Interface MTU, when reported
    pub mtu: Option<u32>,
}

/// Per-gateway reachability record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayHealth {
    /// Interface the default route points out of
    pub interface: String,
    /// Did the gateway answer a probe this cycle
    pub reachable: bool,
    /// Round-trip time in milliseconds, when reachable
    pub rtt_ms: Option<f64>,
    /// When the probe ran
    pub last_check: DateTime<Utc>,
}

/// Per-target connectivity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetHealth {
    /// Did the target answer a probe this cycle
    pub reachable: bool,
    /// When the probe ran
    pub last_check: DateTime<Utc>,
}

/// Derived delegation state for one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationState {
    Active,
    Inactive,
}

/// Per-provider prefix-delegation status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationStatus {
    /// Provider currently holds at least one delegated prefix
    pub has_delegation: bool,
    /// Number of delegated prefixes
    pub prefix_count: usize,
    /// Timestamp reported by the exporter, when present
    pub last_updated: Option<String>,
    /// active ⇔ has_delegation
    pub status: DelegationState,
}

impl DelegationStatus {
    /// Derive the status record from an exporter summary entry
    pub fn from_prefixes(prefixes: &[String], last_updated: Option<String>) -> Self {
        let has_delegation = !prefixes.is_empty();
        Self {
            has_delegation,
            prefix_count: prefixes.len(),
            last_updated,
            status: if has_delegation {
                DelegationState::Active
            } else {
                DelegationState::Inactive
            },
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DelegationState::Active
    }
}

/// One complete monitoring cycle's worth of state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSnapshot {
    /// When the cycle ran; `None` only for the documented default state
    pub timestamp: Option<DateTime<Utc>>,
    /// Interface name → persisted summary
    #[serde(default)]
    pub interfaces: BTreeMap<String, InterfaceSummary>,
    /// Gateway address → reachability record
    #[serde(default)]
    pub gateways: BTreeMap<String, GatewayHealth>,
    /// Target address → connectivity record
    #[serde(default)]
    pub connectivity: BTreeMap<String, TargetHealth>,
    /// Provider name → delegation status
    #[serde(default)]
    pub delegation_status: BTreeMap<String, DelegationStatus>,
    /// Aggregated classification
    #[serde(default)]
    pub overall_status: OverallStatus,
}

impl MonitoringSnapshot {
    /// Whether the snapshot is older than `max_age_secs` (or has no data)
    pub fn is_stale(&self, max_age_secs: u64, now: DateTime<Utc>) -> bool {
        match self.timestamp {
            Some(ts) => now.signed_duration_since(ts) > chrono::Duration::seconds(max_age_secs as i64),
            None => true,
        }
    }

    /// Count of gateways that answered this cycle
    pub fn reachable_gateways(&self) -> usize {
        self.gateways.values().filter(|g| g.reachable).count()
    }

    /// Count of external targets that answered this cycle
    pub fn successful_tests(&self) -> usize {
        self.connectivity.values().filter(|t| t.reachable).count()
    }

    /// Count of providers with an active delegation
    pub fn active_delegations(&self) -> usize {
        self.delegation_status.values().filter(|d| d.is_active()).count()
    }

    /// Count of interfaces recorded as active
    pub fn active_interfaces(&self) -> usize {
        self.interfaces.values().filter(|i| i.active).count()
    }
}

/// A meaningful transition between two consecutive snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Overall classification flipped
    StatusChanged {
        previous: OverallStatus,
        current: OverallStatus,
    },
    /// A gateway became reachable
    GatewayUp { gateway: String },
    /// A gateway stopped answering
    GatewayDown { gateway: String },
    /// A provider's delegation became active
    DelegationActive { provider: String },
    /// A provider's delegation went away
    DelegationInactive { provider: String },
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::StatusChanged { previous, current } => {
                write!(f, "Overall status changed: {previous} -> {current}")
            }
            ChangeEvent::GatewayUp { gateway } => write!(f, "Gateway {gateway}: UP"),
            ChangeEvent::GatewayDown { gateway } => write!(f, "Gateway {gateway}: DOWN"),
            ChangeEvent::DelegationActive { provider } => {
                write!(f, "Delegation {provider}: ACTIVE")
            }
            ChangeEvent::DelegationInactive { provider } => {
                write!(f, "Delegation {provider}: INACTIVE")
            }
        }
    }
}

/// Condensed view of the persisted snapshot for external tools
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatusSummary {
    /// No monitoring data, or data past the staleness threshold
    Unavailable {
        /// "no_data" or "stale"
        status: &'static str,
        message: &'static str,
    },
    /// Fresh data
    Ready {
        status: OverallStatus,
        last_check: DateTime<Utc>,
        /// Active interface count
        interfaces: usize,
        /// Reachable gateway count
        gateways: usize,
        /// Reachable target count
        connectivity: usize,
        /// Active delegation count
        delegations: usize,
    },
}

impl StatusSummary {
    pub fn no_data() -> Self {
        StatusSummary::Unavailable {
            status: "no_data",
            message: "No monitoring data available",
        }
    }

    pub fn stale() -> Self {
        StatusSummary::Unavailable {
            status: "stale",
            message: "Monitoring data is stale",
        }
    }

    /// Whether the summary reports a usable, fresh status
    pub fn is_usable(&self) -> bool {
        matches!(self, StatusSummary::Ready { status, .. } if status.is_usable())
    }
}
