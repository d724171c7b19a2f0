pub mod catalog;
pub mod config;
pub mod discovery;
pub mod logging;
pub mod query;
pub mod service;
pub mod watcher;

pub use catalog::{Catalog, CatalogStore, EntryKind, LaunchAction, ProgramEntry, SnapshotStorage};
pub use config::{DisabledEntry, ProgramSource, Settings};
pub use discovery::{SourceEnumerator, TargetResolver};
pub use query::{QueryCache, QueryEngine, QueryError, RankedResult, ScoreMatch, Scorer};
pub use service::CatalogService;
pub use watcher::{CatalogWatcher, RebuildTrigger, WatchError};
