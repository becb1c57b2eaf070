// # Script-backed Mapping Collaborators
//
// This crate implements the two external collaborators of the mapping
// pipeline by running their scripts:
//
// - the dhcp6c prefix exporter, which rewrites the delegation JSON
//   documents from dhcp6c's lease state, and
// - the NPTv6 manager, which rebuilds translation rules after a mapping
//   change.
//
// ## Failure semantics
//
// A script that is not installed is a logged no-op: both collaborators are
// optional steps of a mapping pass. A script that runs and fails returns an
// error, which the mapping engine logs and survives.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use v6mon_core::mapping::UlaMapping;
use v6mon_core::traits::{NptRefresher, PrefixExporter};
use v6mon_core::{Error, Result};

/// Default install location of the prefix exporter
pub const DEFAULT_EXPORTER_SCRIPT: &str = "/usr/local/bin/dhcp6c-prefix-json";

/// Default install location of the NPTv6 manager
pub const DEFAULT_NPTV6_SCRIPT: &str = "/usr/local/bin/nptv6-manager";

/// Run one collaborator script
///
/// A missing script is skipped with an info log; a spawn failure or
/// non-zero exit is an error carrying the script's stderr.
async fn run_script(script: &Path, description: &str) -> Result<()> {
    if !script.exists() {
        tracing::info!(
            "{description} script not found, skipping: {}",
            script.display()
        );
        return Ok(());
    }

    tracing::info!("running {description}: {}", script.display());

    let output = Command::new(script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| Error::refresher(description, format!("failed to run: {e}")))?;

    if output.status.success() {
        tracing::debug!("{description} completed successfully");
        if !output.stdout.is_empty() {
            tracing::debug!(
                "{description} stdout: {}",
                String::from_utf8_lossy(&output.stdout).trim()
            );
        }
        Ok(())
    } else {
        Err(Error::refresher(
            description,
            format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ))
    }
}

/// Prefix exporter that runs the dhcp6c-to-JSON script
#[derive(Debug, Clone)]
pub struct ScriptPrefixExporter {
    script: PathBuf,
}

impl ScriptPrefixExporter {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl Default for ScriptPrefixExporter {
    fn default() -> Self {
        Self::new(DEFAULT_EXPORTER_SCRIPT)
    }
}

#[async_trait]
impl PrefixExporter for ScriptPrefixExporter {
    async fn export(&self) -> Result<()> {
        run_script(&self.script, self.name()).await
    }

    fn name(&self) -> &str {
        "prefix JSON updater"
    }
}

/// NPTv6 refresher that runs the rule manager script
#[derive(Debug, Clone)]
pub struct ScriptNptRefresher {
    script: PathBuf,
}

impl ScriptNptRefresher {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl Default for ScriptNptRefresher {
    fn default() -> Self {
        Self::new(DEFAULT_NPTV6_SCRIPT)
    }
}

#[async_trait]
impl NptRefresher for ScriptNptRefresher {
    async fn refresh(&self, mapping: &UlaMapping) -> Result<()> {
        tracing::info!(
            "triggering NPTv6 rule refresh for {} mappings (provider: {})",
            mapping.len(),
            mapping.active_provider.as_deref().unwrap_or("none"),
        );
        run_script(&self.script, self.name()).await
    }

    fn name(&self) -> &str {
        "NPTv6 manager"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    async fn script_with_body(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("collaborator.sh");
        tokio::fs::write(&path, format!("#!/bin/sh\n{body}\n"))
            .await
            .unwrap();
        let mut perms = tokio::fs::metadata(&path).await.unwrap().permissions();
        perms.set_mode(0o755);
        tokio::fs::set_permissions(&path, perms).await.unwrap();
        path
    }

    #[tokio::test]
    async fn missing_script_is_a_skipped_no_op() {
        let exporter = ScriptPrefixExporter::new("/definitely/not/installed");
        assert!(exporter.export().await.is_ok());

        let refresher = ScriptNptRefresher::new("/definitely/not/installed");
        assert!(refresher.refresh(&UlaMapping::default()).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_script_run() {
        let dir = tempfile::tempdir().unwrap();
        let script = script_with_body(dir.path(), "exit 0").await;
        assert!(ScriptPrefixExporter::new(&script).export().await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_script_surfaces_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = script_with_body(dir.path(), "echo boom >&2; exit 3").await;

        let err = ScriptPrefixExporter::new(&script)
            .export()
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("boom"), "unexpected error: {message}");
    }
}
