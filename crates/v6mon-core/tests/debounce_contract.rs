//! Contract: modification-time debouncing
//!
//! The mtime gate is the sole trigger for the mapping pipeline: first sight
//! of a watched file recomputes, an unchanged file does not, and the
//! refreshed time map is persisted even on skipped passes.

mod common;

use common::*;
use std::sync::atomic::Ordering;
use v6mon_core::mapping::{MappingEngine, MappingOutcome};
use v6mon_core::state::MemoryMappingStore;

async fn engine_with_exporter(
    delegation_file: &std::path::Path,
    watched: &std::path::Path,
    store: MemoryMappingStore,
) -> (MappingEngine, std::sync::Arc<std::sync::atomic::AtomicUsize>) {
    let exporter = CountingExporter::new();
    let calls = exporter.call_counter();
    let engine = MappingEngine::new(
        test_mapping_config(delegation_file, &[watched]),
        Box::new(store),
        Some(Box::new(exporter)),
        None,
    )
    .unwrap();
    (engine, calls)
}

#[tokio::test]
async fn first_sight_of_a_watched_file_triggers_recomputation() {
    let dir = tempfile::tempdir().unwrap();
    let delegation_file = dir.path().join("delegations.json");
    let watched = dir.path().join("igc0_prefixv6");
    tokio::fs::write(&watched, "2600:1700:aaaa::/60").await.unwrap();
    write_delegations(
        &delegation_file,
        &[("pd-0", "2600:1700:a::/64", "igc0", "active")],
    )
    .await;

    let store = MemoryMappingStore::new();
    let (engine, export_calls) =
        engine_with_exporter(&delegation_file, &watched, store.clone()).await;

    let outcome = engine.run_once().await.unwrap();
    assert!(matches!(outcome, MappingOutcome::Updated(_)));
    assert_eq!(export_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.current().await.last_prefix_times.len(), 1);
}

#[tokio::test]
async fn unchanged_mtime_skips_the_pipeline_but_persists_the_times() {
    let dir = tempfile::tempdir().unwrap();
    let delegation_file = dir.path().join("delegations.json");
    let watched = dir.path().join("igc0_prefixv6");
    tokio::fs::write(&watched, "2600:1700:aaaa::/60").await.unwrap();
    write_delegations(
        &delegation_file,
        &[("pd-0", "2600:1700:a::/64", "igc0", "active")],
    )
    .await;

    let store = MemoryMappingStore::new();
    let (engine, export_calls) =
        engine_with_exporter(&delegation_file, &watched, store.clone()).await;

    assert!(matches!(
        engine.run_once().await.unwrap(),
        MappingOutcome::Updated(_)
    ));
    let times_after_first = store.current().await.last_prefix_times.clone();
    assert_eq!(times_after_first.len(), 1);

    // nothing touched the file: the second pass must not run the exporter
    assert_eq!(engine.run_once().await.unwrap(), MappingOutcome::Unchanged);
    assert_eq!(export_calls.load(Ordering::SeqCst), 1);
    // the (identical) time map was still written back
    assert_eq!(store.current().await.last_prefix_times, times_after_first);
}

#[tokio::test]
async fn strictly_newer_mtime_retriggers() {
    let dir = tempfile::tempdir().unwrap();
    let delegation_file = dir.path().join("delegations.json");
    let watched = dir.path().join("igc0_prefixv6");
    tokio::fs::write(&watched, "2600:1700:aaaa::/60").await.unwrap();
    write_delegations(
        &delegation_file,
        &[("pd-0", "2600:1700:a::/64", "igc0", "active")],
    )
    .await;

    let store = MemoryMappingStore::new();
    let (engine, export_calls) =
        engine_with_exporter(&delegation_file, &watched, store.clone()).await;

    assert!(matches!(
        engine.run_once().await.unwrap(),
        MappingOutcome::Updated(_)
    ));

    // age the recorded time instead of sleeping across an mtime tick
    let mut state = store.current().await;
    for time in state.last_prefix_times.values_mut() {
        *time -= 10.0;
    }
    v6mon_core::traits::MappingStateStore::store(&store, &state)
        .await
        .unwrap();

    assert!(matches!(
        engine.run_once().await.unwrap(),
        MappingOutcome::Updated(_)
    ));
    assert_eq!(export_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn a_missing_watched_file_never_triggers() {
    let dir = tempfile::tempdir().unwrap();
    let delegation_file = dir.path().join("delegations.json");
    let watched = dir.path().join("does-not-exist");
    write_delegations(
        &delegation_file,
        &[("pd-0", "2600:1700:a::/64", "igc0", "active")],
    )
    .await;

    let store = MemoryMappingStore::new();
    let (engine, export_calls) =
        engine_with_exporter(&delegation_file, &watched, store.clone()).await;

    assert_eq!(engine.run_once().await.unwrap(), MappingOutcome::Unchanged);
    assert_eq!(export_calls.load(Ordering::SeqCst), 0);
    assert!(store.current().await.last_prefix_times.is_empty());
}
