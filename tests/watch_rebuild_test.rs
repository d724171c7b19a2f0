//! Filesystem events driving debounced rebuilds, end to end.
//!
//! These tests use the real notify backend against temp directories, so
//! they allow generous settling time rather than asserting tight timings.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tempfile::TempDir;

use appdex::catalog::SnapshotStorage;
use appdex::config::{ProgramSource, Settings};
use appdex::discovery::{AppPathsProvider, AppPathsValue};
use appdex::query::{ScoreMatch, Scorer};
use appdex::service::CatalogService;
use appdex::watcher::{CatalogWatcher, trigger_channel};

struct AnyScorer;

impl Scorer for AnyScorer {
    fn score(&self, _query: &str, _label: &str) -> Option<ScoreMatch> {
        Some(ScoreMatch {
            score: 1,
            positions: Vec::new(),
        })
    }
}

/// Counts rebuilds: the enumerator consults the provider exactly once per
/// rebuild when the registry source is enabled.
struct RebuildCounter(AtomicUsize);

impl AppPathsProvider for RebuildCounter {
    fn entries(&self) -> Vec<AppPathsValue> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Vec::new()
    }
}

fn watch_settings(custom: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.sources = vec![ProgramSource {
        location: custom.to_path_buf(),
        enabled: true,
    }];
    settings.enable_registry_source = true;
    settings.enable_start_menu_source = false;
    settings.enable_path_source = false;
    settings
}

async fn wait_for<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

#[tokio::test]
async fn created_file_shows_up_after_one_debounced_rebuild() {
    let custom = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();

    let counter = Arc::new(RebuildCounter(AtomicUsize::new(0)));
    let service = Arc::new(
        CatalogService::new(
            watch_settings(custom.path()),
            SnapshotStorage::new(storage.path()),
            Arc::new(AnyScorer),
        )
        .with_app_paths(counter.clone()),
    );

    service.rebuild().await;
    assert_eq!(service.catalog().len(), 0);
    let baseline = counter.0.load(Ordering::SeqCst);

    let _watcher = service.start_watching().unwrap();

    fs::write(custom.path().join("fresh.exe"), b"").unwrap();

    let appeared = wait_for(
        || service.catalog().entries.iter().any(|e| e.display_name == "fresh"),
        Duration::from_secs(5),
    )
    .await;
    assert!(appeared, "created file never reached the catalog");
    assert!(counter.0.load(Ordering::SeqCst) > baseline);
}

#[tokio::test]
async fn event_burst_coalesces_into_one_rebuild() {
    let custom = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();

    let counter = Arc::new(RebuildCounter(AtomicUsize::new(0)));
    let service = Arc::new(
        CatalogService::new(
            watch_settings(custom.path()),
            SnapshotStorage::new(storage.path()),
            Arc::new(AnyScorer),
        )
        .with_app_paths(counter.clone()),
    );

    service.rebuild().await;
    let baseline = counter.0.load(Ordering::SeqCst);

    let _watcher = service.start_watching().unwrap();

    // An install-like burst: several files created well inside one grace
    // window.
    for i in 0..6 {
        fs::write(custom.path().join(format!("burst{i}.exe")), b"").unwrap();
    }

    let settled = wait_for(|| service.catalog().len() == 6, Duration::from_secs(5)).await;
    assert!(settled, "burst files never reached the catalog");

    // Give a hypothetical second rebuild time to happen, then confirm the
    // burst produced exactly one.
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(counter.0.load(Ordering::SeqCst), baseline + 1);
}

#[tokio::test]
async fn events_spaced_past_the_grace_window_rebuild_separately() {
    let custom = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();

    let counter = Arc::new(RebuildCounter(AtomicUsize::new(0)));
    let service = Arc::new(
        CatalogService::new(
            watch_settings(custom.path()),
            SnapshotStorage::new(storage.path()),
            Arc::new(AnyScorer),
        )
        .with_app_paths(counter.clone()),
    );

    service.rebuild().await;
    let baseline = counter.0.load(Ordering::SeqCst);

    let _watcher = service.start_watching().unwrap();

    fs::write(custom.path().join("first.exe"), b"").unwrap();
    assert!(
        wait_for(
            || counter.0.load(Ordering::SeqCst) == baseline + 1,
            Duration::from_secs(5)
        )
        .await
    );

    // Past the grace window: a fresh trigger, a fresh rebuild.
    tokio::time::sleep(Duration::from_millis(700)).await;
    fs::write(custom.path().join("second.exe"), b"").unwrap();

    assert!(
        wait_for(
            || counter.0.load(Ordering::SeqCst) == baseline + 2,
            Duration::from_secs(5)
        )
        .await
    );
    assert!(
        wait_for(|| service.catalog().len() == 2, Duration::from_secs(5)).await,
        "both files should be cataloged"
    );
}

#[tokio::test]
async fn watcher_skips_missing_directories() {
    let existing = TempDir::new().unwrap();

    let mut settings = Settings::default();
    settings.enable_start_menu_source = false;
    settings.sources = vec![
        ProgramSource {
            location: existing.path().to_path_buf(),
            enabled: true,
        },
        ProgramSource {
            location: "/no/such/place".into(),
            enabled: true,
        },
        ProgramSource {
            location: existing.path().to_path_buf(),
            enabled: false,
        },
    ];

    let (trigger, _signals) = trigger_channel();
    let mut watcher = CatalogWatcher::new(trigger).unwrap();
    watcher.watch_sources(&settings);

    assert_eq!(watcher.watched(), &[existing.path().to_path_buf()]);
}
