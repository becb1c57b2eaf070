//! Test doubles and common utilities for the contract tests
//!
//! The scripted fact source plays back a fixed network picture and counts
//! probe calls, so tests can assert both what the monitor concluded and
//! what it did (or deliberately did not) probe.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::net::Ipv6Addr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use v6mon_core::config::{MappingConfig, MonitorConfig};
use v6mon_core::error::Result;
use v6mon_core::mapping::UlaMapping;
use v6mon_core::traits::{
    FactSource, GatewayRoute, InterfaceFact, InterfaceStatus, NptRefresher, PrefixExporter,
    ProbeOutcome,
};

/// Shared probe counters, cloned out of a source before boxing it
#[derive(Debug, Clone, Default)]
pub struct ProbeCounters {
    gateway: Arc<AtomicUsize>,
    target: Arc<AtomicUsize>,
}

impl ProbeCounters {
    pub fn gateway_probes(&self) -> usize {
        self.gateway.load(Ordering::SeqCst)
    }

    pub fn target_probes(&self) -> usize {
        self.target.load(Ordering::SeqCst)
    }
}

/// A fact source that plays back a scripted network picture
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactSource {
    interfaces: BTreeMap<String, InterfaceFact>,
    gateways: Vec<GatewayRoute>,
    reachable_gateways: HashSet<String>,
    reachable_targets: HashSet<Ipv6Addr>,
    counters: ProbeCounters,
}

impl ScriptedFactSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active interface with one routable address
    pub fn with_active_interface(mut self, name: &str, address: &str) -> Self {
        self.interfaces.insert(
            name.to_string(),
            InterfaceFact {
                addresses: vec![address.parse().unwrap()],
                status: InterfaceStatus::Active,
                mtu: Some(1500),
            },
        );
        self
    }

    /// Add an interface that must not count as usable
    pub fn with_inactive_interface(mut self, name: &str) -> Self {
        self.interfaces.insert(
            name.to_string(),
            InterfaceFact {
                addresses: Vec::new(),
                status: InterfaceStatus::Other("no carrier".to_string()),
                mtu: None,
            },
        );
        self
    }

    /// Add a default gateway and script its probe result
    pub fn with_gateway(mut self, address: &str, interface: &str, reachable: bool) -> Self {
        self.gateways.push(GatewayRoute {
            address: address.to_string(),
            interface: interface.to_string(),
        });
        if reachable {
            self.reachable_gateways.insert(address.to_string());
        }
        self
    }

    /// Script a connectivity target as reachable
    pub fn with_reachable_target(mut self, target: &str) -> Self {
        self.reachable_targets.insert(target.parse().unwrap());
        self
    }

    /// Clone out the probe counters before boxing the source
    pub fn counters(&self) -> ProbeCounters {
        self.counters.clone()
    }
}

#[async_trait]
impl FactSource for ScriptedFactSource {
    async fn interfaces(&self) -> BTreeMap<String, InterfaceFact> {
        self.interfaces.clone()
    }

    async fn default_gateways(&self) -> Vec<GatewayRoute> {
        self.gateways.clone()
    }

    async fn probe_gateway(&self, gateway: &str, _timeout: Duration) -> ProbeOutcome {
        self.counters.gateway.fetch_add(1, Ordering::SeqCst);
        if self.reachable_gateways.contains(gateway) {
            ProbeOutcome::reachable(1.2)
        } else {
            ProbeOutcome::unreachable()
        }
    }

    async fn probe_target(
        &self,
        target: Ipv6Addr,
        _source_interface: Option<&str>,
        _timeout: Duration,
    ) -> bool {
        self.counters.target.fetch_add(1, Ordering::SeqCst);
        self.reachable_targets.contains(&target)
    }
}

/// A prefix exporter that counts invocations and can be scripted to fail
pub struct CountingExporter {
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl CountingExporter {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail: true,
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl PrefixExporter for CountingExporter {
    async fn export(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(v6mon_core::Error::refresher("exporter", "scripted failure"))
        } else {
            Ok(())
        }
    }
}

/// An NPTv6 refresher that records the mappings it was handed
pub struct CountingRefresher {
    calls: Arc<AtomicUsize>,
    fail: bool,
    last_mapping: Arc<std::sync::Mutex<Option<UlaMapping>>>,
}

impl CountingRefresher {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail: false,
            last_mapping: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail: true,
            last_mapping: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn mapping_slot(&self) -> Arc<std::sync::Mutex<Option<UlaMapping>>> {
        Arc::clone(&self.last_mapping)
    }
}

#[async_trait]
impl NptRefresher for CountingRefresher {
    async fn refresh(&self, mapping: &UlaMapping) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_mapping.lock().unwrap() = Some(mapping.clone());
        if self.fail {
            Err(v6mon_core::Error::refresher("nptv6", "scripted failure"))
        } else {
            Ok(())
        }
    }
}

/// Monitoring config pointing at a test-owned delegation summary
pub fn test_monitor_config(summary_file: &Path) -> MonitorConfig {
    MonitorConfig {
        delegation_summary_file: summary_file.to_path_buf(),
        gateway_timeout_secs: 1,
        connectivity_timeout_secs: 1,
        check_interval_secs: 1,
        ..MonitorConfig::default()
    }
}

/// Mapping config pointing at test-owned delegation and watched files
pub fn test_mapping_config(delegation_file: &Path, watched: &[&Path]) -> MappingConfig {
    MappingConfig {
        delegation_file: delegation_file.to_path_buf(),
        watched_prefix_files: watched.iter().map(|p| p.to_path_buf()).collect(),
        ..MappingConfig::default()
    }
}

/// Write a per-delegation document: (id, prefix, interface, status) rows
pub async fn write_delegations(path: &Path, rows: &[(&str, &str, &str, &str)]) {
    let mut delegations = serde_json::Map::new();
    for (id, prefix, interface, status) in rows {
        delegations.insert(
            (*id).to_string(),
            serde_json::json!({
                "prefix": prefix,
                "interface": interface,
                "status": status,
            }),
        );
    }
    let document = serde_json::json!({ "prefix_delegations": delegations });
    tokio::fs::write(path, serde_json::to_string_pretty(&document).unwrap())
        .await
        .unwrap();
}

/// Write a per-provider summary document: (provider, prefixes) rows
pub async fn write_provider_summary(path: &Path, rows: &[(&str, &[&str])]) {
    let mut providers = serde_json::Map::new();
    for (provider, prefixes) in rows {
        providers.insert(
            (*provider).to_string(),
            serde_json::json!({
                "delegated_prefixes": prefixes,
                "last_updated": "2026-08-07T10:00:00",
            }),
        );
    }
    tokio::fs::write(path, serde_json::to_string_pretty(&providers).unwrap())
        .await
        .unwrap();
}
