//! Load-or-default and save of the catalog snapshot blob.
//!
//! The blob is a plain JSON dump of the catalog; format versioning is a
//! non-goal. A missing or unreadable blob falls back to an empty catalog,
//! which the first rebuild replaces.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use super::store::Catalog;

const SNAPSHOT_FILE: &str = "catalog.json";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot write snapshot to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Manages the persisted catalog snapshot under a base directory.
#[derive(Debug, Clone)]
pub struct SnapshotStorage {
    base_path: PathBuf,
}

impl SnapshotStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn snapshot_path(&self) -> PathBuf {
        self.base_path.join(SNAPSHOT_FILE)
    }

    /// Check if a persisted snapshot exists
    pub fn exists(&self) -> bool {
        self.snapshot_path().is_file()
    }

    /// Load the persisted snapshot, falling back to an empty catalog when
    /// the blob is missing or unreadable.
    pub fn load_or_default(&self) -> Catalog {
        let path = self.snapshot_path();
        let Ok(bytes) = fs::read(&path) else {
            return Catalog::empty();
        };

        match serde_json::from_slice(&bytes) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!(
                    "discarding unreadable catalog snapshot {}: {e}",
                    path.display()
                );
                Catalog::empty()
            }
        }
    }

    /// Persist the given snapshot, creating the base directory if needed.
    #[must_use = "Save errors should be handled to ensure data is persisted"]
    pub fn save(&self, catalog: &Catalog) -> Result<(), PersistError> {
        fs::create_dir_all(&self.base_path).map_err(|source| PersistError::Write {
            path: self.base_path.clone(),
            source,
        })?;

        let bytes = serde_json::to_vec(catalog)?;
        let path = self.snapshot_path();
        fs::write(&path, bytes).map_err(|source| PersistError::Write { path, source })
    }
}
