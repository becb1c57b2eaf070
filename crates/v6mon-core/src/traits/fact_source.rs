// # Fact Source Trait
//
// Defines the interface for collecting raw network facts: interfaces,
// default gateways, and reachability probes.
//
// ## Implementations
//
// - Shell-command backed (ifconfig/netstat/ping6): `v6mon-facts-shell` crate
// - Scripted doubles for tests: `tests/common/mod.rs`
//
// ## Failure semantics
//
// Every call fails closed. A timeout, a missing tool, or unparseable output
// resolves to an empty map or an unreachable probe outcome; none of these
// calls returns an error into the aggregator's control flow, and the
// aggregator must not distinguish a timeout from any other failure.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::net::Ipv6Addr;
use std::time::Duration;

/// Operational status of an interface, as reported by the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceStatus {
    Active,
    Unknown,
    /// Any other status string the OS reports (e.g. "no carrier")
    Other(String),
}

impl InterfaceStatus {
    /// Parse the OS status string
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "active" => InterfaceStatus::Active,
            "unknown" | "" => InterfaceStatus::Unknown,
            other => InterfaceStatus::Other(other.to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        *self == InterfaceStatus::Active
    }
}

/// Raw facts for one interface, rebuilt every cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceFact {
    /// Non-link-local addresses (link-local is excluded at collection time)
    pub addresses: Vec<Ipv6Addr>,
    /// Operational status
    pub status: InterfaceStatus,
    /// MTU, when reported
    pub mtu: Option<u32>,
}

impl InterfaceFact {
    /// An interface participates in monitoring when it is active and holds
    /// at least one routable address
    pub fn is_usable(&self) -> bool {
        self.status.is_active() && !self.addresses.is_empty()
    }
}

/// An IPv6 default route
///
/// The gateway address is kept as the OS-reported string: BSD scopes
/// link-local gateways as `fe80::1%igc0`, which is the identity the rest of
/// the system keys on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRoute {
    pub address: String,
    pub interface: String,
}

/// Result of one gateway probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub reachable: bool,
    /// Round-trip time in milliseconds, when reachable
    pub rtt_ms: Option<f64>,
}

impl ProbeOutcome {
    pub fn reachable(rtt_ms: f64) -> Self {
        Self {
            reachable: true,
            rtt_ms: Some(rtt_ms),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            rtt_ms: None,
        }
    }
}

/// Trait for network fact collection
///
/// Implementations must be thread-safe and usable across async tasks. They
/// are observers only: no implementation may make failover decisions, touch
/// the state stores, or retry on its own.
#[async_trait]
pub trait FactSource: Send + Sync {
    /// Interfaces with IPv6 enabled, keyed by name, loopback excluded
    async fn interfaces(&self) -> BTreeMap<String, InterfaceFact>;

    /// The current set of IPv6 default gateways
    async fn default_gateways(&self) -> Vec<GatewayRoute>;

    /// Probe one gateway, bounded by `timeout`
    async fn probe_gateway(&self, gateway: &str, timeout: Duration) -> ProbeOutcome;

    /// Probe one external target, optionally bound to a source interface,
    /// bounded by `timeout`
    async fn probe_target(
        &self,
        target: Ipv6Addr,
        source_interface: Option<&str>,
        timeout: Duration,
    ) -> bool;
}
