// # Shell Fact Source
//
// This crate provides a FactSource backed by the BSD networking tools:
// `ifconfig -f inet6` for interfaces, `netstat -rn -f inet6` for default
// routes, and `ping6` for reachability probes.
//
// ## Failure semantics
//
// Everything fails closed, per the FactSource contract. A tool that is
// missing, exits non-zero, times out, or prints something unparseable
// yields an empty map or an unreachable outcome; the monitor never sees an
// error from this crate. Probes get an outer watchdog of the probe timeout
// plus two seconds so a wedged child process cannot stall the cycle.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::net::Ipv6Addr;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use v6mon_core::traits::{FactSource, GatewayRoute, InterfaceFact, InterfaceStatus, ProbeOutcome};

/// Watchdog slack added on top of a probe's own timeout
const PROBE_WATCHDOG_SLACK: Duration = Duration::from_secs(2);

/// Timeout for the discovery commands (ifconfig, netstat)
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// FactSource backed by ifconfig/netstat/ping6 child processes
#[derive(Debug, Clone, Default)]
pub struct ShellFactSource;

impl ShellFactSource {
    pub fn new() -> Self {
        Self
    }
}

/// Run a discovery command, returning its stdout on success
///
/// Any failure mode (spawn error, non-zero exit, timeout) logs a warning and
/// returns `None`.
async fn run_discovery(program: &str, args: &[&str]) -> Option<String> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(DISCOVERY_TIMEOUT, child).await {
        Ok(Ok(output)) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(Ok(output)) => {
            tracing::warn!("{program} exited with {}", output.status);
            None
        }
        Ok(Err(e)) => {
            tracing::warn!("failed to run {program}: {e}");
            None
        }
        Err(_) => {
            tracing::warn!("timeout running {program}");
            None
        }
    }
}

/// Run one ping6, returning whether it succeeded
async fn run_ping(args: &[&str], watchdog: Duration) -> bool {
    let child = Command::new("ping6")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    match tokio::time::timeout(watchdog, child).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => {
            tracing::debug!("failed to run ping6: {e}");
            false
        }
        Err(_) => {
            tracing::debug!("ping6 watchdog expired");
            false
        }
    }
}

/// Parse `ifconfig -f inet6` output into interface facts
///
/// Interface blocks start at column zero (`igc0: flags=... mtu 1500`);
/// detail lines are indented. Loopback interfaces and link-local addresses
/// are dropped here so the monitor only ever sees routable facts.
fn parse_interfaces(output: &str) -> BTreeMap<String, InterfaceFact> {
    let mut interfaces = BTreeMap::new();
    let mut current: Option<String> = None;

    for raw in output.lines() {
        let indented = raw.starts_with([' ', '\t']);
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if !indented {
            match line.split_once(':') {
                Some((name, _)) if !name.is_empty() && !name.starts_with("lo") => {
                    let fact = InterfaceFact {
                        addresses: Vec::new(),
                        status: InterfaceStatus::Unknown,
                        mtu: token_after(line, "mtu").and_then(|t| t.parse().ok()),
                    };
                    interfaces.insert(name.to_string(), fact);
                    current = Some(name.to_string());
                }
                _ => current = None,
            }
            continue;
        }

        let Some(fact) = current.as_ref().and_then(|name| interfaces.get_mut(name)) else {
            continue;
        };

        if let Some(rest) = line.strip_prefix("inet6 ") {
            let token = rest.split_whitespace().next().unwrap_or("");
            if token.starts_with("fe80:") {
                continue;
            }
            // scoped addresses carry a %zone suffix
            let address = token.split('%').next().unwrap_or(token);
            if let Ok(address) = address.parse::<Ipv6Addr>() {
                fact.addresses.push(address);
            }
        } else if let Some(status) = line.strip_prefix("status:") {
            fact.status = InterfaceStatus::parse(status);
        } else if let Some(mtu) = token_after(line, "mtu") {
            fact.mtu = mtu.parse().ok();
        }
    }

    interfaces
}

/// Parse `netstat -rn -f inet6` output into default routes
fn parse_gateways(output: &str) -> Vec<GatewayRoute> {
    let mut routes = Vec::new();

    for line in output.lines() {
        if !(line.starts_with("default") || line.starts_with("::/0")) {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        let interface = if parts.len() > 3 {
            parts[parts.len() - 1]
        } else {
            "unknown"
        };
        routes.push(GatewayRoute {
            address: parts[1].to_string(),
            interface: interface.to_string(),
        });
    }

    routes
}

/// The whitespace token following `key`, if any
fn token_after<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let mut tokens = line.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == key {
            return tokens.next();
        }
    }
    None
}

#[async_trait]
impl FactSource for ShellFactSource {
    async fn interfaces(&self) -> BTreeMap<String, InterfaceFact> {
        match run_discovery("ifconfig", &["-f", "inet6"]).await {
            Some(output) => parse_interfaces(&output),
            None => BTreeMap::new(),
        }
    }

    async fn default_gateways(&self) -> Vec<GatewayRoute> {
        match run_discovery("netstat", &["-rn", "-f", "inet6"]).await {
            Some(output) => parse_gateways(&output),
            None => Vec::new(),
        }
    }

    async fn probe_gateway(&self, gateway: &str, timeout: Duration) -> ProbeOutcome {
        let wait_ms = timeout.as_millis().to_string();
        let started = Instant::now();
        let success = run_ping(
            &["-c", "1", "-W", &wait_ms, gateway],
            timeout + PROBE_WATCHDOG_SLACK,
        )
        .await;

        if success {
            // wall-clock RTT around the child process
            ProbeOutcome::reachable(started.elapsed().as_secs_f64() * 1000.0)
        } else {
            ProbeOutcome::unreachable()
        }
    }

    async fn probe_target(
        &self,
        target: Ipv6Addr,
        source_interface: Option<&str>,
        timeout: Duration,
    ) -> bool {
        let wait_ms = timeout.as_millis().to_string();
        let target = target.to_string();

        let mut args = vec!["-c", "1", "-W", wait_ms.as_str()];
        if let Some(interface) = source_interface {
            args.push("-S");
            args.push(interface);
        }
        args.push(target.as_str());

        run_ping(&args, timeout + PROBE_WATCHDOG_SLACK).await
    }
}
