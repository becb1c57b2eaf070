//! Contract: persisted-state round trips
//!
//! Writing a snapshot and reading it back must preserve the overall status
//! and the key sets of all four maps; writes are atomic; a corrupt document
//! loads as the documented default.

mod common;

use chrono::Utc;
use common::*;
use v6mon_core::monitor::Monitor;
use v6mon_core::state::{FileSnapshotStore, MemorySnapshotStore};
use v6mon_core::status::{OverallStatus, StatusSummary};
use v6mon_core::traits::SnapshotStore;

#[tokio::test]
async fn snapshot_round_trip_preserves_status_and_key_sets() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("connectivity-monitoring.json");
    let summary_path = dir.path().join("summary.json");
    write_provider_summary(&summary_path, &[("att", &["2600:1700:a::/60"][..])]).await;

    let source = ScriptedFactSource::new()
        .with_active_interface("igc0", "2600:1700::1")
        .with_active_interface("igc1", "2001:558::1")
        .with_gateway("fe80::1%igc0", "igc0", true)
        .with_gateway("fe80::1%igc1", "igc1", false)
        .with_reachable_target("2001:4860:4860::8888");

    let store = FileSnapshotStore::new(&state_path).await.unwrap();
    let (monitor, _events) = Monitor::new(
        Box::new(source),
        Box::new(store),
        test_monitor_config(&summary_path),
    )
    .unwrap();

    let written = monitor.run_cycle().await.unwrap();
    assert_eq!(written.overall_status, OverallStatus::Healthy);

    // read back through a fresh store
    let reloaded = FileSnapshotStore::new(&state_path)
        .await
        .unwrap()
        .load()
        .await
        .unwrap();

    assert_eq!(reloaded.overall_status, written.overall_status);
    assert_eq!(
        reloaded.interfaces.keys().collect::<Vec<_>>(),
        written.interfaces.keys().collect::<Vec<_>>()
    );
    assert_eq!(
        reloaded.gateways.keys().collect::<Vec<_>>(),
        written.gateways.keys().collect::<Vec<_>>()
    );
    assert_eq!(
        reloaded.connectivity.keys().collect::<Vec<_>>(),
        written.connectivity.keys().collect::<Vec<_>>()
    );
    assert_eq!(
        reloaded.delegation_status.keys().collect::<Vec<_>>(),
        written.delegation_status.keys().collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn writes_leave_no_temp_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("connectivity-monitoring.json");
    let store = FileSnapshotStore::new(&state_path).await.unwrap();

    let snapshot = v6mon_core::status::MonitoringSnapshot {
        timestamp: Some(Utc::now()),
        overall_status: OverallStatus::Healthy,
        ..Default::default()
    };
    store.store(&snapshot).await.unwrap();

    assert!(state_path.exists());
    assert!(!state_path.with_extension("tmp").exists());
}

#[tokio::test]
async fn corrupt_document_loads_as_the_default_state() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("connectivity-monitoring.json");
    tokio::fs::write(&state_path, b"}{ garbage").await.unwrap();

    let store = FileSnapshotStore::new(&state_path).await.unwrap();
    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.overall_status, OverallStatus::Unknown);
    assert!(loaded.timestamp.is_none());
    assert!(loaded.gateways.is_empty());
}

#[tokio::test]
async fn summary_reports_no_data_then_fresh_counts() {
    let dir = tempfile::tempdir().unwrap();
    let summary_path = dir.path().join("summary.json");
    write_provider_summary(&summary_path, &[("att", &["2600:1700:a::/60"][..])]).await;

    let source = ScriptedFactSource::new()
        .with_active_interface("igc0", "2600:1700::1")
        .with_gateway("fe80::1%igc0", "igc0", true)
        .with_reachable_target("2001:4860:4860::8888");

    let (monitor, _events) = Monitor::new(
        Box::new(source),
        Box::new(MemorySnapshotStore::new()),
        test_monitor_config(&summary_path),
    )
    .unwrap();

    // nothing persisted yet
    assert_eq!(monitor.summary().await.unwrap(), StatusSummary::no_data());
    assert!(!monitor.summary().await.unwrap().is_usable());

    monitor.run_cycle().await.unwrap();

    let summary = monitor.summary().await.unwrap();
    assert!(summary.is_usable());
    match summary {
        StatusSummary::Ready {
            status,
            interfaces,
            gateways,
            connectivity,
            delegations,
            ..
        } => {
            assert_eq!(status, OverallStatus::Healthy);
            assert_eq!(interfaces, 1);
            assert_eq!(gateways, 1);
            assert_eq!(connectivity, 1);
            assert_eq!(delegations, 1);
        }
        other => panic!("expected a ready summary, got {other:?}"),
    }
}

#[tokio::test]
async fn summary_reports_stale_data_past_the_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let summary_path = dir.path().join("summary.json");

    let store = MemorySnapshotStore::new();
    let aged = v6mon_core::status::MonitoringSnapshot {
        timestamp: Some(Utc::now() - chrono::Duration::seconds(600)),
        overall_status: OverallStatus::Healthy,
        ..Default::default()
    };
    store.store(&aged).await.unwrap();

    let (monitor, _events) = Monitor::new(
        Box::new(ScriptedFactSource::new()),
        Box::new(store),
        test_monitor_config(&summary_path),
    )
    .unwrap();

    // healthy but 10 minutes old: stale, not usable
    assert_eq!(monitor.summary().await.unwrap(), StatusSummary::stale());
    assert!(!monitor.summary().await.unwrap().is_usable());
}
