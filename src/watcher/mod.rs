//! Filesystem watcher that drives debounced catalog rebuilds.
//!
//! # Architecture
//!
//! ```text
//! notify callbacks (create/delete)
//!       |  non-blocking try_send
//!       v
//! single-slot trigger channel
//!       |
//!       v
//! consumer task: recv -> sleep grace -> drain -> one full rebuild
//! ```
//!
//! Installers and uninstallers touch many files in quick succession; the
//! grace window folds each burst into a single scan.

mod error;
mod trigger;

pub use error::WatchError;
pub use trigger::{RebuildTrigger, trigger_channel};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::Settings;

/// Grace window between the first event of a burst and the rebuild it
/// triggers.
pub const REBUILD_GRACE: Duration = Duration::from_millis(500);

/// Watches program directories and fires the rebuild trigger on
/// create/delete events. Dropping the watcher stops all notifications.
pub struct CatalogWatcher {
    watcher: notify::RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl CatalogWatcher {
    pub fn new(trigger: RebuildTrigger) -> Result<Self, WatchError> {
        // The callback runs on notify's thread: no I/O, just the
        // non-blocking trigger write.
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if matches!(event.kind, EventKind::Create(_) | EventKind::Remove(_)) {
                    trigger.notify();
                }
            }
        })?;

        Ok(Self {
            watcher,
            watched: Vec::new(),
        })
    }

    /// Watch one directory tree.
    pub fn watch(&mut self, dir: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.watched.push(dir.to_path_buf());
        Ok(())
    }

    /// Watch every directory the settings designate: the start-menu folders
    /// when that source is enabled, plus each enabled custom source.
    /// Missing directories are skipped; individual watch failures are
    /// logged and do not abort the rest.
    pub fn watch_sources(&mut self, settings: &Settings) {
        let mut dirs = Vec::new();
        if settings.enable_start_menu_source {
            dirs.extend(settings.start_menu_dirs());
        }
        dirs.extend(
            settings
                .sources
                .iter()
                .filter(|s| s.enabled)
                .map(|s| s.location.clone()),
        );

        for dir in dirs.into_iter().filter(|d| d.is_dir()) {
            match self.watch(&dir) {
                Ok(()) => crate::debug_event!("watcher", "watching", "{}", dir.display()),
                Err(e) => tracing::warn!("[watcher] {e}"),
            }
        }
    }

    /// Directories currently being watched.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

/// Consume trigger signals: wait for one, sleep out the grace window, drain
/// whatever accumulated meanwhile, then run exactly one rebuild. Ends when
/// every trigger handle is gone.
pub async fn drive_rebuilds<F, Fut>(mut signals: mpsc::Receiver<()>, grace: Duration, mut rebuild: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    while signals.recv().await.is_some() {
        tokio::time::sleep(grace).await;
        while signals.try_recv().is_ok() {}
        rebuild().await;
    }
}
