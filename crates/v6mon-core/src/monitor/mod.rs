//! Core monitoring engine
//!
//! The Monitor is responsible for:
//! - Pulling raw facts from the FactSource once per cycle
//! - Folding them into one MonitoringSnapshot (health-state aggregation)
//! - Diffing the snapshot against the last persisted one (change detection)
//! - Persisting the new snapshot after the diff
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  FactSource  │── interfaces / gateways / probes ──┐
//! └──────────────┘                                    ▼
//!                                            ┌─────────────┐
//!                                            │   Monitor   │
//!                                            └─────────────┘
//!                                                    │
//!                 ┌──────────────────────────────────┼─────────────────┐
//!                 │                                  │                 │
//!                 ▼                                  ▼                 ▼
//!         ┌──────────────┐                  ┌──────────────┐   ┌─────────────┐
//!         │ SnapshotStore│                  │ change list  │   │   Events    │
//!         │ (load/store) │                  │ (diff)       │   │  (notify)   │
//!         └──────────────┘                  └──────────────┘   └─────────────┘
//! ```
//!
//! ## Cycle flow
//!
//! 1. Load the previous snapshot (documented default when absent)
//! 2. Evaluate: probe gateways and targets, derive delegation status
//! 3. Diff against the previous snapshot, log + emit each change
//! 4. Atomically persist the new snapshot
//!
//! Probes run sequentially and fail closed at the FactSource boundary; a
//! failed probe contributes an unreachable record, never an error.

use chrono::Utc;
use std::net::Ipv6Addr;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::delegation;
use crate::status::{
    ChangeEvent, DelegationStatus, GatewayHealth, InterfaceSummary, MonitoringSnapshot,
    OverallStatus, StatusSummary, TargetHealth,
};
use crate::traits::{FactSource, SnapshotStore};
use crate::Result;

/// Events emitted by the Monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Monitoring started
    Started {
        /// Number of configured connectivity targets
        targets: usize,
    },

    /// Overall status flipped
    StatusChanged {
        previous: OverallStatus,
        current: OverallStatus,
    },

    /// A gateway's reachability flipped
    GatewayFlipped { gateway: String, reachable: bool },

    /// A provider's delegation flipped
    DelegationFlipped { provider: String, active: bool },

    /// A cycle finished and its snapshot was persisted
    CycleCompleted {
        status: OverallStatus,
        changes: usize,
    },

    /// Monitoring stopped
    Stopped { reason: String },
}

/// Derive the overall classification from the cycle's probe counts
///
/// The precedence is a policy invariant: gateway and connectivity both
/// working is always `healthy` regardless of counts beyond one, and gateway
/// reachability alone outranks connectivity alone because it is the stronger
/// failover signal.
pub fn classify(reachable_gateways: usize, successful_tests: usize) -> OverallStatus {
    match (reachable_gateways > 0, successful_tests > 0) {
        (true, true) => OverallStatus::Healthy,
        (true, false) => OverallStatus::GatewayOnly,
        (false, true) => OverallStatus::ConnectivityOnly,
        (false, false) => OverallStatus::Degraded,
    }
}

/// Compare two snapshots and list the meaningful transitions
///
/// Rules, applied in order (not mutually exclusive):
/// - one event when the overall status differs,
/// - one event per gateway in `current` whose reachable flag differs from
///   its previous value (absent previous ⇒ false),
/// - one event per provider in `current` whose active flag differs from its
///   previous value (absent previous ⇒ inactive).
///
/// Keys that disappeared entirely are not flagged; they are only ever
/// compared against the implicit default.
pub fn diff(previous: &MonitoringSnapshot, current: &MonitoringSnapshot) -> Vec<ChangeEvent> {
    let mut changes = Vec::new();

    if previous.overall_status != current.overall_status {
        changes.push(ChangeEvent::StatusChanged {
            previous: previous.overall_status,
            current: current.overall_status,
        });
    }

    for (gateway, health) in &current.gateways {
        let was_reachable = previous
            .gateways
            .get(gateway)
            .is_some_and(|g| g.reachable);
        if was_reachable != health.reachable {
            changes.push(if health.reachable {
                ChangeEvent::GatewayUp {
                    gateway: gateway.clone(),
                }
            } else {
                ChangeEvent::GatewayDown {
                    gateway: gateway.clone(),
                }
            });
        }
    }

    for (provider, status) in &current.delegation_status {
        let was_active = previous
            .delegation_status
            .get(provider)
            .is_some_and(DelegationStatus::is_active);
        if was_active != status.is_active() {
            changes.push(if status.is_active() {
                ChangeEvent::DelegationActive {
                    provider: provider.clone(),
                }
            } else {
                ChangeEvent::DelegationInactive {
                    provider: provider.clone(),
                }
            });
        }
    }

    changes
}

/// Addresses under 2001:db8::/32 are reserved for documentation and only
/// appear in the target list for negative testing; they are never probed.
fn is_documentation_address(addr: &Ipv6Addr) -> bool {
    let segments = addr.segments();
    segments[0] == 0x2001 && segments[1] == 0xdb8
}

/// Core monitoring engine
///
/// One Monitor owns its collaborators and is driven by an external
/// scheduler, one cycle at a time; there is no internal parallelism and no
/// locking, so the caller must not run two cycles concurrently.
pub struct Monitor {
    /// Fact source for interfaces, gateways and probes
    facts: Box<dyn FactSource>,

    /// Durable last-known snapshot
    store: Box<dyn SnapshotStore>,

    /// Monitoring configuration
    config: MonitorConfig,

    /// Event sender for external observers
    event_tx: mpsc::Sender<MonitorEvent>,
}

impl Monitor {
    /// Create a new monitor
    ///
    /// Returns the monitor and the receiving end of its event channel.
    pub fn new(
        facts: Box<dyn FactSource>,
        store: Box<dyn SnapshotStore>,
        config: MonitorConfig,
    ) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let monitor = Self {
            facts,
            store,
            config,
            event_tx: tx,
        };

        Ok((monitor, rx))
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Perform one comprehensive check and build the cycle's snapshot
    ///
    /// Does not touch the store; `run_cycle` owns persistence.
    pub async fn evaluate(&self) -> MonitoringSnapshot {
        let check_time = Utc::now();
        let mut snapshot = MonitoringSnapshot {
            timestamp: Some(check_time),
            ..MonitoringSnapshot::default()
        };

        info!("starting IPv6 connectivity check");

        // 1. Interfaces
        let interfaces = self.facts.interfaces().await;
        let mut usable_interfaces = 0usize;
        for (name, fact) in &interfaces {
            if fact.is_usable() {
                usable_interfaces += 1;
            }
            snapshot.interfaces.insert(
                name.clone(),
                InterfaceSummary {
                    active: fact.status.is_active(),
                    address_count: fact.addresses.len(),
                    mtu: fact.mtu,
                },
            );
        }

        if usable_interfaces == 0 {
            // Deliberate short-circuit: with no usable interface every probe
            // would be wasted, so the other maps stay empty this cycle.
            warn!("no active IPv6 interfaces found");
            snapshot.overall_status = OverallStatus::NoInterfaces;
            return snapshot;
        }

        // 2. Gateways
        let gateway_timeout = Duration::from_secs(self.config.gateway_timeout_secs);
        for route in self.facts.default_gateways().await {
            let outcome = self.facts.probe_gateway(&route.address, gateway_timeout).await;
            match outcome.rtt_ms {
                Some(rtt) if outcome.reachable => {
                    debug!("gateway {} reachable (RTT: {:.1}ms)", route.address, rtt);
                }
                _ if outcome.reachable => {
                    debug!("gateway {} reachable", route.address);
                }
                _ => warn!("gateway {} unreachable", route.address),
            }
            snapshot.gateways.insert(
                route.address,
                GatewayHealth {
                    interface: route.interface,
                    reachable: outcome.reachable,
                    rtt_ms: outcome.rtt_ms,
                    last_check: check_time,
                },
            );
        }

        // 3. External connectivity
        let connectivity_timeout = Duration::from_secs(self.config.connectivity_timeout_secs);
        for target in &self.config.test_targets {
            if is_documentation_address(target) {
                continue;
            }
            let reachable = self
                .facts
                .probe_target(*target, None, connectivity_timeout)
                .await;
            if reachable {
                debug!("connectivity test to {target}: SUCCESS");
            } else {
                warn!("connectivity test to {target}: FAILED");
            }
            snapshot
                .connectivity
                .insert(target.to_string(), TargetHealth {
                    reachable,
                    last_check: check_time,
                });
        }

        // 4. Delegation status
        let summary =
            delegation::read_provider_summary(&self.config.delegation_summary_file).await;
        for (provider, entry) in summary {
            snapshot.delegation_status.insert(
                provider,
                DelegationStatus::from_prefixes(&entry.delegated_prefixes, entry.last_updated),
            );
        }

        // 5. Overall status
        snapshot.overall_status =
            classify(snapshot.reachable_gateways(), snapshot.successful_tests());

        info!(
            "IPv6 status: {} (interfaces: {}, gateways: {}/{}, connectivity: {}/{}, delegations: {})",
            snapshot.overall_status,
            usable_interfaces,
            snapshot.reachable_gateways(),
            snapshot.gateways.len(),
            snapshot.successful_tests(),
            snapshot.connectivity.len(),
            snapshot.active_delegations(),
        );

        snapshot
    }

    /// Run one monitoring cycle: evaluate, diff, emit, persist
    pub async fn run_cycle(&self) -> Result<MonitoringSnapshot> {
        let previous = self.store.load().await?;
        let current = self.evaluate().await;

        let changes = diff(&previous, &current);
        for change in &changes {
            info!("IPv6 status change: {change}");
            self.emit_event(match change {
                ChangeEvent::StatusChanged { previous, current } => MonitorEvent::StatusChanged {
                    previous: *previous,
                    current: *current,
                },
                ChangeEvent::GatewayUp { gateway } => MonitorEvent::GatewayFlipped {
                    gateway: gateway.clone(),
                    reachable: true,
                },
                ChangeEvent::GatewayDown { gateway } => MonitorEvent::GatewayFlipped {
                    gateway: gateway.clone(),
                    reachable: false,
                },
                ChangeEvent::DelegationActive { provider } => MonitorEvent::DelegationFlipped {
                    provider: provider.clone(),
                    active: true,
                },
                ChangeEvent::DelegationInactive { provider } => MonitorEvent::DelegationFlipped {
                    provider: provider.clone(),
                    active: false,
                },
            });
        }

        // The new snapshot is committed only at the very end of a successful
        // cycle; any fault above leaves the previous state untouched.
        self.store.store(&current).await?;

        self.emit_event(MonitorEvent::CycleCompleted {
            status: current.overall_status,
            changes: changes.len(),
        });

        Ok(current)
    }

    /// Run cycles forever on the configured interval
    ///
    /// Returns on SIGINT, or with an error on the first failed cycle.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Internal run implementation with an optional shutdown signal
    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit_event(MonitorEvent::Started {
            targets: self.config.test_targets.len(),
        });

        let interval = Duration::from_secs(self.config.check_interval_secs);

        if let Some(mut rx) = shutdown_rx {
            // Test mode: wait for the provided shutdown signal
            loop {
                self.run_cycle().await?;

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = &mut rx => {
                        info!("shutdown signal received");
                        self.emit_event(MonitorEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            // Production mode: wait for SIGINT
            loop {
                self.run_cycle().await?;

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutdown signal received");
                        self.emit_event(MonitorEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Summarize the persisted snapshot for external tools
    ///
    /// Reports `no_data` when nothing was ever persisted and `stale` when the
    /// last cycle is older than the configured threshold.
    pub async fn summary(&self) -> Result<StatusSummary> {
        let snapshot = self.store.load().await?;

        let Some(last_check) = snapshot.timestamp else {
            return Ok(StatusSummary::no_data());
        };

        if snapshot.is_stale(self.config.stale_after_secs, Utc::now()) {
            return Ok(StatusSummary::stale());
        }

        Ok(StatusSummary::Ready {
            status: snapshot.overall_status,
            last_check,
            interfaces: snapshot.active_interfaces(),
            gateways: snapshot.reachable_gateways(),
            connectivity: snapshot.successful_tests(),
            delegations: snapshot.active_delegations(),
        })
    }

    /// Test-only helper to run the loop with a controlled shutdown signal
    ///
    /// Production code should use `run()`, which shuts down on OS signals.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    /// Emit a monitor event
    fn emit_event(&self, event: MonitorEvent) {
        // The channel is lossy on purpose: a slow observer must not stall or
        // grow the cycle.
        if self.event_tx.try_send(event).is_err() {
            warn!("event channel full, dropping event");
        }
    }
}
