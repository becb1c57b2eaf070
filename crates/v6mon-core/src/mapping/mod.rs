//! ULA mapping allocation
//!
//! Maps delegated prefixes onto the fixed internal ULA networks. The
//! allocator applies the provider-preference policy (primary provider's
//! prefixes win outright, the secondary's are used only when the primary has
//! none) and binds slots strictly in declaration order. The surrounding
//! [`MappingEngine`] gates the whole pipeline on watched-file modification
//! times so idle scheduler ticks cost one `stat` per file.
//!
//! ## Pipeline
//!
//! ```text
//! watched files ──mtime──▶ debounce gate ──changed──▶ PrefixExporter
//!                                                         │
//!                                                         ▼
//!      MappingStateStore ◀──persist── UlaAllocator ◀── delegation file
//!                                          │
//!                                          ▼ (non-empty)
//!                                     NptRefresher
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::MappingConfig;
use crate::delegation::{self, DelegationRecord};
use crate::traits::{MappingStateStore, NptRefresher, PrefixExporter};
use crate::Result;

/// Binding of one ULA network to a delegated prefix, with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotBinding {
    /// The delegated prefix backing this slot
    pub external_prefix: String,
    /// Internal network name (slot name)
    pub network_name: String,
    /// Provider the prefix came from
    pub provider: String,
    /// When this binding was created
    pub created: DateTime<Utc>,
}

/// One allocation result: ULA network CIDR → binding
///
/// Bound slots are always a prefix of the configured slot order; slots past
/// the available prefix count are absent, never partially populated out of
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UlaMapping {
    /// Provider whose prefixes were used, `None` for an empty mapping
    pub active_provider: Option<String>,
    /// ULA network CIDR → binding
    pub bindings: BTreeMap<String, SlotBinding>,
}

impl UlaMapping {
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}

/// Persisted state of the mapping pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingState {
    /// Epoch seconds of the last completed run
    #[serde(default)]
    pub last_run: f64,
    /// Watched file path → last observed modification time (epoch seconds)
    #[serde(default)]
    pub last_prefix_times: BTreeMap<String, f64>,
    /// ULA network CIDR → last applied binding
    #[serde(default)]
    pub current_mappings: BTreeMap<String, SlotBinding>,
}

/// Outcome of one mapping pass
#[derive(Debug, Clone, PartialEq)]
pub enum MappingOutcome {
    /// No watched file changed; nothing was recomputed
    Unchanged,
    /// Mapping recomputed and persisted
    Updated(UlaMapping),
    /// Recomputation ran but no provider had an active prefix
    NoPrefixes,
}

/// Assigns delegated prefixes to the fixed ULA slot table
#[derive(Debug, Clone)]
pub struct UlaAllocator {
    config: MappingConfig,
}

impl UlaAllocator {
    pub fn new(config: MappingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Build a fresh mapping from the active delegations
    ///
    /// Delegations on interfaces outside the provider table are ignored.
    /// The first provider in preference order with a non-empty bucket
    /// supplies the entire pool; there is no mixing across providers.
    pub fn allocate(
        &self,
        delegations: &BTreeMap<String, DelegationRecord>,
        now: DateTime<Utc>,
    ) -> UlaMapping {
        let mut buckets: BTreeMap<&str, Vec<&str>> = self
            .config
            .providers
            .iter()
            .map(|p| (p.name.as_str(), Vec::new()))
            .collect();

        for record in delegations.values() {
            if let Some(provider) = self.config.provider_for_interface(&record.interface) {
                if let Some(bucket) = buckets.get_mut(provider.name.as_str()) {
                    bucket.push(record.prefix.as_str());
                }
            }
        }

        for provider in &self.config.providers {
            tracing::info!(
                "available prefixes from {}: {}",
                provider.name,
                buckets.get(provider.name.as_str()).map_or(0, Vec::len)
            );
        }

        let Some((provider, pool)) = self
            .config
            .providers
            .iter()
            .filter_map(|p| {
                let bucket = buckets.remove(p.name.as_str())?;
                (!bucket.is_empty()).then_some((p, bucket))
            })
            .next()
        else {
            tracing::warn!("no active prefixes available for mapping");
            return UlaMapping::default();
        };

        let mut bindings = BTreeMap::new();
        for (i, slot) in self.config.ula_slots.iter().enumerate() {
            match pool.get(i) {
                Some(prefix) => {
                    bindings.insert(
                        slot.network.clone(),
                        SlotBinding {
                            external_prefix: (*prefix).to_string(),
                            network_name: slot.name.clone(),
                            provider: provider.name.clone(),
                            created: now,
                        },
                    );
                }
                None => {
                    tracing::warn!(
                        "no prefix available for ULA network: {} ({})",
                        slot.name,
                        slot.network
                    );
                }
            }
        }

        tracing::info!(
            "created {} ULA mappings using {} prefixes",
            bindings.len(),
            provider.name,
        );

        UlaMapping {
            active_provider: Some(provider.name.clone()),
            bindings,
        }
    }
}

/// Collect the current modification times of the watched files
///
/// A file that does not exist (or cannot be stat'ed) contributes no entry and
/// therefore cannot trigger recomputation.
pub async fn watched_mtimes(paths: &[PathBuf]) -> BTreeMap<String, f64> {
    let mut times = BTreeMap::new();
    for path in paths {
        match tokio::fs::metadata(path).await {
            Ok(meta) => match meta.modified() {
                Ok(modified) => {
                    let secs = modified
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|d| d.as_secs_f64())
                        .unwrap_or(0.0);
                    times.insert(path.display().to_string(), secs);
                }
                Err(e) => {
                    tracing::debug!("no modification time for {}: {}", path.display(), e);
                }
            },
            Err(_) => {
                tracing::debug!("watched file does not exist: {}", path.display());
            }
        }
    }
    times
}

/// Decide whether the mapping pipeline must run
///
/// True iff some watched file has no previous record (first run) or a
/// strictly newer modification time than last recorded.
pub fn should_recompute(current: &BTreeMap<String, f64>, previous: &BTreeMap<String, f64>) -> bool {
    current.iter().any(|(path, mtime)| match previous.get(path) {
        Some(prev) => mtime > prev,
        None => true,
    })
}

/// Drives one debounced mapping pass per scheduler tick
pub struct MappingEngine {
    allocator: UlaAllocator,
    store: Box<dyn MappingStateStore>,
    exporter: Option<Box<dyn PrefixExporter>>,
    refresher: Option<Box<dyn NptRefresher>>,
}

impl MappingEngine {
    pub fn new(
        config: MappingConfig,
        store: Box<dyn MappingStateStore>,
        exporter: Option<Box<dyn PrefixExporter>>,
        refresher: Option<Box<dyn NptRefresher>>,
    ) -> Result<Self> {
        Ok(Self {
            allocator: UlaAllocator::new(config)?,
            store,
            exporter,
            refresher,
        })
    }

    pub fn config(&self) -> &MappingConfig {
        self.allocator.config()
    }

    /// Run one mapping pass
    ///
    /// The refreshed modification-time map is persisted whatever the
    /// outcome, so a file restored to an older timestamp is re-recorded
    /// rather than re-triggering forever.
    pub async fn run_once(&self) -> Result<MappingOutcome> {
        let mut state = self.store.load().await?;

        let current_times = watched_mtimes(&self.config().watched_prefix_files).await;
        let changed = should_recompute(&current_times, &state.last_prefix_times);
        state.last_prefix_times = current_times;

        if !changed {
            tracing::debug!("no prefix file changes detected");
            self.store.store(&state).await?;
            return Ok(MappingOutcome::Unchanged);
        }

        if let Some(exporter) = &self.exporter {
            if let Err(e) = exporter.export().await {
                tracing::warn!(
                    "{} failed, continuing with last exported data: {}",
                    exporter.name(),
                    e
                );
            }
        }

        let delegations =
            delegation::read_active_delegations(&self.config().delegation_file).await;

        let now = Utc::now();
        let mapping = self.allocator.allocate(&delegations, now);

        let outcome = if mapping.is_empty() {
            MappingOutcome::NoPrefixes
        } else {
            if let Some(refresher) = &self.refresher {
                // Fire-and-forget: a failed rule refresh never invalidates
                // the computed mapping or blocks persistence.
                if let Err(e) = refresher.refresh(&mapping).await {
                    tracing::warn!("{} failed, mapping kept: {}", refresher.name(), e);
                }
            }
            MappingOutcome::Updated(mapping.clone())
        };

        state.current_mappings = mapping.bindings;
        state.last_run = now.timestamp() as f64;
        self.store.store(&state).await?;

        Ok(outcome)
    }
}
