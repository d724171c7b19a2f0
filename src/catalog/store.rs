//! Atomically published catalog snapshots.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::entry::ProgramEntry;

/// An immutable, timestamped catalog. Built by a full rebuild, never mutated
/// in place, superseded wholesale by the next publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub entries: Vec<ProgramEntry>,
    pub built_at: DateTime<Utc>,
}

impl Catalog {
    pub fn new(entries: Vec<ProgramEntry>) -> Self {
        Self {
            entries,
            built_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Holds the current snapshot reference.
///
/// `publish` swaps the reference atomically; readers that captured the
/// previous `Arc` keep using it to completion. The lock guards only the
/// pointer swap, never the snapshot contents.
#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogStore {
    pub fn new(initial: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// The live snapshot. Never a partially built one.
    pub fn current(&self) -> Arc<Catalog> {
        self.current.read().clone()
    }

    /// Replace the snapshot wholesale.
    pub fn publish(&self, next: Catalog) {
        *self.current.write() = Arc::new(next);
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new(Catalog::empty())
    }
}
