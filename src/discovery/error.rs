//! Error types for discovery collaborators.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the discovery seams. Most discovery failures are
/// deliberately swallowed or downgraded to invalid entries; these variants
/// cover what gets logged or reported instead.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("cannot resolve link target for {path}: {reason}")]
    LinkResolution { path: PathBuf, reason: String },

    #[error("registry value under {subkey} is unreadable: {reason}")]
    RegistryValue { subkey: String, reason: String },

    #[error("cannot start {target}: {source}")]
    Spawn {
        target: String,
        #[source]
        source: std::io::Error,
    },
}
