// # v6mond - IPv6 failover monitor daemon
//
// The v6mond binary is a THIN integration layer:
// 1. Reads configuration from environment variables
// 2. Initializes logging and the runtime
// 3. Wires the shell fact source, file stores and script collaborators
//    into the core monitor and mapping engine
// 4. Dispatches one of three modes
//
// All monitoring and mapping logic lives in v6mon-core.
//
// ## Modes
//
// - `v6mond check [--json]` — run a single cycle (monitoring + mapping),
//   exit 0 when the overall status is healthy or gateway_only, else 1
// - `v6mond status` — print the persisted status summary as JSON; exits 0
//   only for a fresh, usable status (data older than the staleness
//   threshold reports stale and exits 1)
// - `v6mond daemon` — loop forever on the check interval until
//   SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is via environment variables over built-in defaults:
//
// - `V6MON_STATE_FILE`: monitoring state path
// - `V6MON_MAPPING_STATE_FILE`: mapping state path
// - `V6MON_DELEGATION_FILE`: per-delegation JSON document
// - `V6MON_DELEGATION_SUMMARY_FILE`: per-provider summary document
// - `V6MON_WATCHED_PREFIX_FILES`: comma-separated watched file list
// - `V6MON_CHECK_INTERVAL`: seconds between daemon cycles
// - `V6MON_GATEWAY_TIMEOUT` / `V6MON_CONNECTIVITY_TIMEOUT`: probe timeouts
// - `V6MON_EXPORTER_SCRIPT` / `V6MON_NPTV6_SCRIPT`: collaborator scripts
// - `V6MON_LOG_LEVEL`: trace|debug|info|warn|error
//
// ## Example
//
// ```bash
// export V6MON_STATE_FILE=/var/db/ipv6-ha/connectivity-monitoring.json
// export V6MON_CHECK_INTERVAL=30
// v6mond daemon
// ```

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use v6mon_core::config::{MappingConfig, MonitorConfig};
use v6mon_core::mapping::MappingEngine;
use v6mon_core::monitor::Monitor;
use v6mon_core::state::{FileMappingStore, FileSnapshotStore};
use v6mon_facts_shell::ShellFactSource;
use v6mon_nptv6_shell::{ScriptNptRefresher, ScriptPrefixExporter};

/// Exit codes for the different termination scenarios
///
/// - 0: usable status / clean shutdown
/// - 1: unusable or stale status, or a configuration error
/// - 2: runtime error (unexpected fault; state was not updated)
#[derive(Debug, Clone, Copy)]
enum MonExitCode {
    Usable = 0,
    Unusable = 1,
    RuntimeError = 2,
}

impl From<MonExitCode> for ExitCode {
    fn from(code: MonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// What the process was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Check { json: bool },
    Status,
    Daemon,
}

impl Mode {
    /// Parse the command line; `None` prints usage
    fn from_args() -> Option<Self> {
        let args: Vec<String> = env::args().skip(1).collect();
        let json = args.iter().any(|a| a == "--json");

        match args.iter().find(|a| !a.starts_with("--"))?.as_str() {
            "check" => Some(Mode::Check { json }),
            "status" => Some(Mode::Status),
            "daemon" => Some(Mode::Daemon),
            _ => None,
        }
    }
}

/// Daemon configuration
struct Config {
    state_file: String,
    mapping_state_file: String,
    exporter_script: String,
    nptv6_script: String,
    log_level: String,
    monitor: MonitorConfig,
    mapping: MappingConfig,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mut monitor = MonitorConfig::default();
        let mut mapping = MappingConfig::default();

        if let Ok(path) = env::var("V6MON_DELEGATION_SUMMARY_FILE") {
            monitor.delegation_summary_file = path.into();
        }
        if let Ok(path) = env::var("V6MON_DELEGATION_FILE") {
            mapping.delegation_file = path.into();
        }
        if let Ok(paths) = env::var("V6MON_WATCHED_PREFIX_FILES") {
            mapping.watched_prefix_files = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(Into::into)
                .collect();
        }
        if let Ok(interval) = env::var("V6MON_CHECK_INTERVAL") {
            monitor.check_interval_secs = interval.parse()?;
        }
        if let Ok(timeout) = env::var("V6MON_GATEWAY_TIMEOUT") {
            monitor.gateway_timeout_secs = timeout.parse()?;
        }
        if let Ok(timeout) = env::var("V6MON_CONNECTIVITY_TIMEOUT") {
            monitor.connectivity_timeout_secs = timeout.parse()?;
        }

        Ok(Self {
            state_file: env::var("V6MON_STATE_FILE")
                .unwrap_or_else(|_| "/var/db/ipv6-ha/connectivity-monitoring.json".to_string()),
            mapping_state_file: env::var("V6MON_MAPPING_STATE_FILE")
                .unwrap_or_else(|_| "/var/db/ipv6-ha/ula-mapping-state.json".to_string()),
            exporter_script: env::var("V6MON_EXPORTER_SCRIPT")
                .unwrap_or_else(|_| v6mon_nptv6_shell::DEFAULT_EXPORTER_SCRIPT.to_string()),
            nptv6_script: env::var("V6MON_NPTV6_SCRIPT")
                .unwrap_or_else(|_| v6mon_nptv6_shell::DEFAULT_NPTV6_SCRIPT.to_string()),
            log_level: env::var("V6MON_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            monitor,
            mapping,
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if !(5..=3600).contains(&self.monitor.check_interval_secs) {
            anyhow::bail!(
                "V6MON_CHECK_INTERVAL must be between 5 and 3600 seconds. Got: {}",
                self.monitor.check_interval_secs
            );
        }

        if !(1..=60).contains(&self.monitor.gateway_timeout_secs) {
            anyhow::bail!(
                "V6MON_GATEWAY_TIMEOUT must be between 1 and 60 seconds. Got: {}",
                self.monitor.gateway_timeout_secs
            );
        }

        if !(1..=60).contains(&self.monitor.connectivity_timeout_secs) {
            anyhow::bail!(
                "V6MON_CONNECTIVITY_TIMEOUT must be between 1 and 60 seconds. Got: {}",
                self.monitor.connectivity_timeout_secs
            );
        }

        if self.state_file.is_empty() {
            anyhow::bail!("V6MON_STATE_FILE cannot be empty");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "V6MON_LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                other
            ),
        }

        self.monitor.validate()?;
        self.mapping.validate()?;
        Ok(())
    }
}

fn usage() {
    eprintln!("IPv6 failover connectivity monitor");
    eprintln!("Usage: v6mond <mode> [--json]");
    eprintln!();
    eprintln!("  check      Run a single monitoring + mapping cycle");
    eprintln!("  status     Show the persisted status summary");
    eprintln!("  daemon     Run continuous monitoring");
    eprintln!();
    eprintln!("  --json     With check: print the snapshot as JSON");
}

fn main() -> ExitCode {
    let Some(mode) = Mode::from_args() else {
        usage();
        return MonExitCode::Unusable.into();
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return MonExitCode::Unusable.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {e}");
        return MonExitCode::Unusable.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return MonExitCode::Unusable.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return MonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run(mode, config).await {
            Ok(true) => MonExitCode::Usable,
            Ok(false) => MonExitCode::Unusable,
            Err(e) => {
                error!("v6mond error: {e}");
                MonExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Wire collaborators and dispatch the requested mode
///
/// Returns whether the final status was usable.
async fn run(mode: Mode, config: Config) -> Result<bool> {
    let snapshot_store = FileSnapshotStore::new(&config.state_file).await?;
    let (monitor, mut events) = Monitor::new(
        Box::new(ShellFactSource::new()),
        Box::new(snapshot_store),
        config.monitor.clone(),
    )?;

    // Drain monitor events into debug logs
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::debug!("monitor event: {event:?}");
        }
    });

    let mapping_store = FileMappingStore::new(&config.mapping_state_file).await?;
    let mapping = MappingEngine::new(
        config.mapping.clone(),
        Box::new(mapping_store),
        Some(Box::new(ScriptPrefixExporter::new(&config.exporter_script))),
        Some(Box::new(ScriptNptRefresher::new(&config.nptv6_script))),
    )?;

    match mode {
        Mode::Check { json } => {
            let snapshot = monitor.run_cycle().await?;
            mapping.run_once().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            Ok(snapshot.overall_status.is_usable())
        }

        Mode::Status => {
            let summary = monitor.summary().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(summary.is_usable())
        }

        Mode::Daemon => {
            info!("Starting IPv6 connectivity monitoring daemon");
            run_daemon(&monitor, &mapping).await?;
            Ok(true)
        }
    }
}

/// Daemon loop: one monitoring cycle plus one (debounced) mapping pass per
/// tick, until SIGTERM/SIGINT
async fn run_daemon(monitor: &Monitor, mapping: &MappingEngine) -> Result<()> {
    let interval = Duration::from_secs(monitor.config().check_interval_secs);

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {e}"))?;

    loop {
        monitor.run_cycle().await?;
        mapping.run_once().await?;

        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    return Ok(());
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received SIGINT, shutting down");
                    return Ok(());
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Received SIGINT, shutting down");
                    return Ok(());
                }
            }
        }
    }
}
