//! Configuration types for the monitor
//!
//! The original deployment kept its tables (test targets, ULA networks,
//! provider/interface assignments) as ambient globals. Here they are explicit
//! immutable structures handed to the monitor and the allocator at
//! construction, so alternate tables can be substituted in tests.

use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;
use std::path::PathBuf;

/// Health monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// External IPv6 addresses probed for connectivity
    #[serde(default = "default_test_targets")]
    pub test_targets: Vec<Ipv6Addr>,

    /// Per-provider delegation summary document consumed for delegation status
    #[serde(default = "default_delegation_summary_file")]
    pub delegation_summary_file: PathBuf,

    /// Gateway probe timeout (seconds)
    #[serde(default = "default_gateway_timeout_secs")]
    pub gateway_timeout_secs: u64,

    /// Connectivity probe timeout (seconds)
    #[serde(default = "default_connectivity_timeout_secs")]
    pub connectivity_timeout_secs: u64,

    /// Sleep between cycles in daemon mode (seconds)
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Persisted data older than this is reported as stale (seconds)
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Capacity of the monitor event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl MonitorConfig {
    /// Validate the monitoring configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.test_targets.is_empty() {
            return Err(crate::Error::config("no connectivity test targets configured"));
        }
        if self.gateway_timeout_secs == 0 {
            return Err(crate::Error::config("gateway timeout must be > 0"));
        }
        if self.connectivity_timeout_secs == 0 {
            return Err(crate::Error::config("connectivity timeout must be > 0"));
        }
        if self.check_interval_secs == 0 {
            return Err(crate::Error::config("check interval must be > 0"));
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            test_targets: default_test_targets(),
            delegation_summary_file: default_delegation_summary_file(),
            gateway_timeout_secs: default_gateway_timeout_secs(),
            connectivity_timeout_secs: default_connectivity_timeout_secs(),
            check_interval_secs: default_check_interval_secs(),
            stale_after_secs: default_stale_after_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// One internal ULA network slot
///
/// Slots are bound to delegated prefixes in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UlaSlot {
    /// Internal network name (e.g. "lan")
    pub name: String,
    /// ULA /64 network in CIDR notation
    pub network: String,
}

impl UlaSlot {
    pub fn new(name: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            network: network.into(),
        }
    }
}

/// Binding of an upstream provider to the physical interface carrying its
/// delegations
///
/// The order of `ProviderLink`s in [`MappingConfig::providers`] is the
/// failover preference order: the first provider with any active delegation
/// supplies the whole prefix pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLink {
    /// Provider name (e.g. "att")
    pub name: String,
    /// WAN interface the provider delegates on (e.g. "igc0")
    pub interface: String,
}

impl ProviderLink {
    pub fn new(name: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interface: interface.into(),
        }
    }
}

/// ULA mapping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// The fixed ULA slot table, in binding order
    #[serde(default = "default_ula_slots")]
    pub ula_slots: Vec<UlaSlot>,

    /// Provider preference list, primary first
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderLink>,

    /// Per-delegation JSON document produced by the external exporter
    #[serde(default = "default_delegation_file")]
    pub delegation_file: PathBuf,

    /// Files whose modification times gate mapping recomputation
    #[serde(default = "default_watched_prefix_files")]
    pub watched_prefix_files: Vec<PathBuf>,
}

impl MappingConfig {
    /// Validate the mapping configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ula_slots.is_empty() {
            return Err(crate::Error::config("no ULA network slots configured"));
        }
        if self.providers.is_empty() {
            return Err(crate::Error::config("no providers configured"));
        }
        for slot in &self.ula_slots {
            validate_cidr(&slot.network)?;
        }
        Ok(())
    }

    /// Look up the provider owning `interface`, if any
    pub fn provider_for_interface(&self, interface: &str) -> Option<&ProviderLink> {
        self.providers.iter().find(|p| p.interface == interface)
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            ula_slots: default_ula_slots(),
            providers: default_providers(),
            delegation_file: default_delegation_file(),
            watched_prefix_files: default_watched_prefix_files(),
        }
    }
}

/// Check that `cidr` is an IPv6 network in `addr/len` form
fn validate_cidr(cidr: &str) -> Result<(), crate::Error> {
    let (addr, len) = cidr
        .split_once('/')
        .ok_or_else(|| crate::Error::config(format!("not a CIDR network: {cidr}")))?;
    addr.parse::<Ipv6Addr>()
        .map_err(|_| crate::Error::config(format!("invalid IPv6 network address: {cidr}")))?;
    let len: u8 = len
        .parse()
        .map_err(|_| crate::Error::config(format!("invalid prefix length: {cidr}")))?;
    if len > 128 {
        return Err(crate::Error::config(format!("prefix length out of range: {cidr}")));
    }
    Ok(())
}

fn default_test_targets() -> Vec<Ipv6Addr> {
    vec![
        // Google Public DNS
        "2001:4860:4860::8888".parse().unwrap(),
        "2001:4860:4860::8844".parse().unwrap(),
        // Cloudflare DNS
        "2606:4700:4700::1111".parse().unwrap(),
        // Documentation prefix, never probed live
        "2001:db8::1".parse().unwrap(),
    ]
}

fn default_delegation_summary_file() -> PathBuf {
    PathBuf::from("/var/db/ipv6-ha/dhcp6c-delegations.json")
}

fn default_delegation_file() -> PathBuf {
    PathBuf::from("/var/db/ipv6-ha/dhcp6c-delegations.json")
}

fn default_watched_prefix_files() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/tmp/igc0_prefixv6"),
        PathBuf::from("/tmp/igc1_prefixv6"),
    ]
}

fn default_ula_slots() -> Vec<UlaSlot> {
    vec![
        UlaSlot::new("lan", "fd03:17ac:e938:10::/64"),
        UlaSlot::new("cam", "fd03:17ac:e938:11::/64"),
        UlaSlot::new("wireguard", "fd03:17ac:e938:12::/64"),
        UlaSlot::new("openvpn", "fd03:17ac:e938:13::/64"),
        UlaSlot::new("guest", "fd03:17ac:e938:14::/64"),
        UlaSlot::new("iot", "fd03:17ac:e938:15::/64"),
        UlaSlot::new("testnet", "fd03:17ac:e938:16::/64"),
    ]
}

fn default_providers() -> Vec<ProviderLink> {
    vec![
        ProviderLink::new("att", "igc0"),
        ProviderLink::new("comcast", "igc1"),
    ]
}

fn default_gateway_timeout_secs() -> u64 {
    5
}

fn default_connectivity_timeout_secs() -> u64 {
    3
}

fn default_check_interval_secs() -> u64 {
    30
}

fn default_stale_after_secs() -> u64 {
    300
}

fn default_event_channel_capacity() -> usize {
    1000
}
