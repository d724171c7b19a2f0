//! The catalog service: rebuild pipeline, query boundary and host actions.
//!
//! This is the only owner of process-wide mutable state (the published
//! snapshot and the query cache), both of which are replaced wholesale
//! rather than mutated in place. Rebuilds may race; each completes and
//! publishes independently and the last publish wins, since every catalog is
//! derived from the current state of disk and registry anyway.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::catalog::{Catalog, CatalogStore, ProgramEntry, SnapshotStorage, dedup_by_path};
use crate::catalog::persistence::PersistError;
use crate::config::{DisabledEntry, Settings};
use crate::discovery::providers::{
    AppPathsProvider, ExecutableMetadata, FsLinkResolver, LinkResolver, NoAppPaths, NoMetadata,
};
use crate::discovery::{SourceEnumerator, TargetResolver};
use crate::query::{QueryCache, QueryEngine, QueryError, QueryOptions, RankedResult, Scorer};
use crate::watcher::{CatalogWatcher, REBUILD_GRACE, WatchError, drive_rebuilds, trigger_channel};

/// Coordinates discovery, the published catalog and the query cache.
///
/// Construction wires the default platform collaborators; hosts and tests
/// swap them through the `with_*` builders before first use.
pub struct CatalogService {
    settings: RwLock<Settings>,
    store: CatalogStore,
    cache: QueryCache,
    engine: QueryEngine,
    storage: SnapshotStorage,
    links: Arc<dyn LinkResolver>,
    metadata: Arc<dyn ExecutableMetadata>,
    app_paths: Arc<dyn AppPathsProvider>,
}

impl CatalogService {
    pub fn new(settings: Settings, storage: SnapshotStorage, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            settings: RwLock::new(settings),
            store: CatalogStore::default(),
            cache: QueryCache::new(),
            engine: QueryEngine::new(scorer),
            storage,
            links: Arc::new(FsLinkResolver),
            metadata: Arc::new(NoMetadata),
            app_paths: Arc::new(NoAppPaths),
        }
    }

    pub fn with_link_resolver(mut self, links: Arc<dyn LinkResolver>) -> Self {
        self.links = links;
        self
    }

    pub fn with_executable_metadata(mut self, metadata: Arc<dyn ExecutableMetadata>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_app_paths(mut self, app_paths: Arc<dyn AppPathsProvider>) -> Self {
        self.app_paths = app_paths;
        self
    }

    /// Publish the persisted snapshot and schedule the first rebuild.
    ///
    /// With nothing usable persisted the rebuild runs to completion before
    /// returning, so the first query never sees an empty catalog; otherwise
    /// the stale-but-useful snapshot serves queries while a fresh scan runs
    /// in the background.
    pub async fn bootstrap(self: &Arc<Self>) {
        let persisted = self.storage.load_or_default();
        let start_empty = persisted.is_empty();
        crate::log_event!("catalog", "preloaded", "{} programs", persisted.len());
        self.store.publish(persisted);

        if start_empty {
            self.rebuild().await;
        } else {
            let service = Arc::clone(self);
            tokio::spawn(async move {
                service.rebuild().await;
            });
        }
    }

    /// One full rebuild: enumerate, resolve, dedup, filter, publish,
    /// invalidate.
    ///
    /// A rebuild that dies keeps the previous catalog in release builds and
    /// propagates in debug builds to surface the bug.
    pub async fn rebuild(self: &Arc<Self>) {
        let service = Arc::clone(self);
        match tokio::task::spawn_blocking(move || service.rebuild_catalog()).await {
            Ok(catalog) => self.publish(catalog),
            Err(err) => {
                if cfg!(debug_assertions) && err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
                tracing::error!("catalog rebuild failed, keeping previous catalog: {err}");
            }
        }
    }

    fn publish(&self, catalog: Catalog) {
        let count = catalog.len();
        self.store.publish(catalog);
        self.cache.invalidate_all();
        self.settings.write().last_index_time = Some(Utc::now());
        crate::log_event!("catalog", "published", "{count} programs");
    }

    /// Scan every source and assemble the next catalog. Runs on the blocking
    /// pool; per-source fan-out is rayon's.
    fn rebuild_catalog(&self) -> Catalog {
        let settings = self.settings.read().clone();
        let enumerator = SourceEnumerator::new(&settings);
        let resolver =
            TargetResolver::new(self.links.as_ref(), self.metadata.as_ref(), &settings.protocols);

        // Custom sources are kept as discovered; only the auto-indexed
        // sources go through path-based dedup.
        let custom = resolve_all(&resolver, &enumerator.custom_sources());

        let mut auto: Vec<ProgramEntry> = Vec::new();
        if settings.enable_registry_source {
            let registry = resolve_all(&resolver, &enumerator.app_paths(self.app_paths.as_ref()));
            // Registry candidates that failed to resolve never reach
            // grouping; the other auto sources keep theirs until the end.
            auto.extend(registry.into_iter().filter(|e| e.valid));
        }
        if settings.enable_start_menu_source {
            auto.extend(resolve_all(&resolver, &enumerator.start_menu()));
        }
        if settings.enable_path_source {
            auto.extend(resolve_all(&resolver, &enumerator.search_path()));
        }

        let mut entries = custom;
        entries.extend(dedup_by_path(auto));

        // Validity filtering last, then one more grouping pass across both
        // families so the published catalog never carries a duplicate
        // identity without distinct descriptions.
        let entries: Vec<ProgramEntry> = entries.into_iter().filter(|e| e.valid).collect();
        Catalog::new(dedup_by_path(entries))
    }

    /// Ranked results for `query`, served from cache when possible.
    pub async fn query(
        self: &Arc<Self>,
        query: &str,
        cancel: CancellationToken,
    ) -> Result<Arc<Vec<RankedResult>>, QueryError> {
        let service = Arc::clone(self);
        let query = query.to_owned();
        match tokio::task::spawn_blocking(move || service.query_blocking(&query, &cancel)).await {
            Ok(result) => result,
            Err(err) => {
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
                Err(QueryError::Cancelled)
            }
        }
    }

    /// Synchronous query path: cache lookup, then a scoring fan-out against
    /// the snapshot captured at call start. A concurrent publish cannot
    /// corrupt an in-flight query; it serves the snapshot it captured.
    pub fn query_blocking(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<RankedResult>>, QueryError> {
        let snapshot = self.store.current();
        let options = {
            let settings = self.settings.read();
            QueryOptions {
                enable_description: settings.enable_description,
                hide_apps_path: settings.hide_apps_path,
            }
        };

        self.cache
            .get_or_compute(query, || self.engine.run(&snapshot, query, options, cancel))
    }

    /// Switch a program off: record it in settings, republish the current
    /// snapshot without it enabled, and schedule a rebuild so discovery
    /// skips it from now on.
    ///
    /// Returns false when the identifier is unknown or already disabled.
    pub fn disable(self: &Arc<Self>, unique_identifier: &str) -> bool {
        let key = unique_identifier.to_lowercase();
        if self.settings.read().is_disabled(&key) {
            return false;
        }

        let current = self.store.current();
        let Some(entry) = current.entries.iter().find(|e| e.unique_identifier() == key) else {
            return false;
        };

        self.settings.write().disabled.push(DisabledEntry {
            unique_identifier: key.clone(),
            name: entry.display_name.clone(),
            location: entry.parent_directory.clone(),
        });

        let entries = current
            .entries
            .iter()
            .cloned()
            .map(|mut e| {
                if e.unique_identifier() == key {
                    e.enabled = false;
                }
                e
            })
            .collect();
        self.store.publish(Catalog::new(entries));
        self.cache.invalidate_all();

        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.rebuild().await;
        });
        true
    }

    /// Full re-index on demand.
    pub async fn reload(self: &Arc<Self>) {
        self.rebuild().await;
    }

    /// Persist the current snapshot.
    pub fn save(&self) -> Result<(), PersistError> {
        self.storage.save(&self.store.current())
    }

    /// Wire filesystem watching and spawn the debounce consumer. The
    /// returned watcher must be kept alive; dropping it stops notifications.
    pub fn start_watching(self: &Arc<Self>) -> Result<CatalogWatcher, WatchError> {
        let (trigger, signals) = trigger_channel();
        let mut watcher = CatalogWatcher::new(trigger)?;
        watcher.watch_sources(&self.settings.read());

        let service = Arc::clone(self);
        tokio::spawn(async move {
            drive_rebuilds(signals, REBUILD_GRACE, move || {
                let service = Arc::clone(&service);
                async move {
                    service.rebuild().await;
                }
            })
            .await;
        });

        crate::log_event!("watcher", "started");
        Ok(watcher)
    }

    /// The live snapshot.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.store.current()
    }

    /// A copy of the current settings.
    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    /// The result cache, exposed for hosts that surface cache statistics.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}

fn resolve_all(resolver: &TargetResolver<'_>, paths: &[PathBuf]) -> Vec<ProgramEntry> {
    paths.par_iter().map(|path| resolver.resolve(path)).collect()
}
